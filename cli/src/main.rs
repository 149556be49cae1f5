//! eportal-mcp: MCP server for the TuxCare ePortal admin API.
//!
//! Two subcommands:
//! - `eportal-mcp stdio`: STDIO transport for Claude Desktop and other STDIO-based MCP clients
//! - `eportal-mcp serve`: Streamable HTTP MCP server

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::http::Request;
use axum::response::IntoResponse;
use clap::{Args, Parser, Subcommand, ValueEnum};
use eportal_mcp::{AuthKind, AuthSection, EPortalMcpServer, PortalClient, PortalConfig};
use rmcp::ServiceExt;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt as TowerServiceExt;
use tracing_subscriber::EnvFilter;

/// eportal-mcp: TuxCare ePortal MCP server.
#[derive(Parser)]
#[command(
    name = "eportal-mcp",
    version,
    about = "TuxCare ePortal MCP server for ePortal API integration"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP over stdin/stdout
    Stdio {
        #[command(flatten)]
        connection: ConnectionArgs,
    },
    /// Start a Streamable HTTP MCP server at /mcp
    Serve {
        #[command(flatten)]
        connection: ConnectionArgs,
        /// HTTP port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum AuthTypeArg {
    Basic,
    #[value(name = "api_key")]
    ApiKey,
}

/// ePortal location and credentials, from a config file or flags.
#[derive(Args)]
struct ConnectionArgs {
    /// Path to a JSON or TOML config file (takes precedence over the flags below)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// ePortal URL
    #[arg(short, long)]
    url: Option<String>,
    /// Authentication type
    #[arg(short = 'a', long, value_enum, default_value = "basic")]
    auth_type: AuthTypeArg,
    /// Username for basic auth
    #[arg(long)]
    username: Option<String>,
    /// Password for basic auth
    #[arg(long, env = "EPORTAL_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    /// API key for api_key auth
    #[arg(long, env = "EPORTAL_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    /// Custom header name for the API key [default: X-Api-Key]
    #[arg(long)]
    header_name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the STDIO transport.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cancel = CancellationToken::new();

    // Ctrl-C cancels the root token
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutting down ePortal MCP server...");
        cancel_for_signal.cancel();
    });

    match cli.command {
        Commands::Stdio { connection } => {
            let server = build_server(connection).await?;
            run_stdio(server, cancel).await?;
        }
        Commands::Serve {
            connection,
            port,
            host,
        } => {
            let server = build_server(connection).await?;
            run_serve(server, host, port, cancel).await?;
        }
    }

    Ok(())
}

/// Resolve config, build the ePortal client, and wrap it in the MCP handler.
async fn build_server(connection: ConnectionArgs) -> Result<EPortalMcpServer> {
    let config = resolve_config(connection).await?;
    let client = PortalClient::from_config(&config).context("Failed to configure ePortal client")?;
    Ok(EPortalMcpServer::from_client(client))
}

/// Config file if given, otherwise a config assembled from flags.
async fn resolve_config(connection: ConnectionArgs) -> Result<PortalConfig> {
    if let Some(path) = connection.config {
        return PortalConfig::load(&path)
            .await
            .with_context(|| format!("Error loading config file {:?}", path));
    }

    let eportal_url = connection
        .url
        .context("ePortal URL is required. Use --url or provide a config file.")?;

    let kind = match connection.auth_type {
        AuthTypeArg::Basic => AuthKind::Basic,
        AuthTypeArg::ApiKey => AuthKind::ApiKey,
    };

    let config = PortalConfig {
        eportal_url,
        auth: AuthSection {
            kind,
            username: connection.username,
            password: connection.password,
            api_key: connection.api_key,
            header_name: connection.header_name,
        },
    };
    config.validate()?;
    Ok(config)
}

/// Serve MCP over stdin/stdout using rmcp's serve_with_ct.
async fn run_stdio(server: EPortalMcpServer, cancel: CancellationToken) -> Result<()> {
    let transport = (tokio::io::stdin(), tokio::io::stdout());
    let running = server
        .serve_with_ct(transport, cancel.clone())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize stdio transport: {:?}", e))?;

    tracing::info!("ePortal MCP stdio transport initialized, waiting for messages");

    tokio::select! {
        result = running.waiting() => {
            match result {
                Ok(reason) => {
                    tracing::info!(?reason, "stdio transport completed");
                }
                Err(e) => {
                    tracing::error!(error = %e, "stdio transport error");
                    return Err(anyhow::anyhow!("stdio transport error: {}", e));
                }
            }
        }
        _ = cancel.cancelled() => {
            tracing::info!("stdio transport cancelled");
        }
    }

    Ok(())
}

/// Serve MCP over Streamable HTTP with axum.
async fn run_serve(
    server: EPortalMcpServer,
    host: String,
    port: u16,
    cancel: CancellationToken,
) -> Result<()> {
    let session_manager = Arc::new(LocalSessionManager::default());
    let http_config = StreamableHttpServerConfig {
        cancellation_token: cancel.clone(),
        ..Default::default()
    };
    let mcp_service = StreamableHttpService::new(
        move || Ok(server.clone()),
        session_manager,
        http_config,
    );

    let app = Router::new().fallback(move |req: Request<axum::body::Body>| {
        let svc = mcp_service.clone();
        async move {
            match svc.oneshot(req).await {
                Ok(response) => response.into_response(),
                Err(never) => match never {},
            }
        }
    });

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!(host = %host, port = %port, "ePortal MCP HTTP server listening");
    tracing::info!("Connect your MCP client to http://{}:{}/mcp", host, port);

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .context("HTTP server error")?;

    tracing::info!("ePortal MCP HTTP server stopped");
    Ok(())
}
