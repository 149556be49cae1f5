//! Server tools: list, register, unregister (single and bulk), and tagging.

use futures::future::BoxFuture;
use serde::Deserialize;

use crate::client::PortalClient;
use crate::model::{HostSelector, ServerListFilters};
use crate::tools::schema::{ArgType, ArgumentSchema, ValidatedArgs};
use crate::tools::{ToolDefinition, pretty_json};

const NON_NEGATIVE: ArgType = ArgType::Integer {
    min: Some(0),
    max: None,
};

pub(crate) fn tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "list_servers",
            title: "List Servers",
            description: "List servers with optional filtering by hostname, IP, service ID, feed, key, age, update status, and tags",
            schema: ArgumentSchema::new()
                .optional("hostname", ArgType::String, "Filter by hostname")
                .optional("ip", ArgType::String, "Filter by IP address")
                .optional("service_id", ArgType::String, "Filter by service ID")
                .optional("feed", ArgType::String, "Filter by feed name")
                .optional("key", ArgType::String, "Filter by registration key")
                .optional("registered_age", ArgType::Number, "Registered at least this many days ago")
                .optional("checkin_age", ArgType::Number, "Last check-in at least this many days ago")
                .optional("updated_age", ArgType::Number, "Last update at least this many days ago")
                .optional("is_updated", ArgType::Bool, "Filter by whether the server is up to date")
                .optional(
                    "limit",
                    ArgType::Integer {
                        min: Some(1),
                        max: Some(1000),
                    },
                    "Maximum number of servers to return (1-1000)",
                )
                .optional("offset", NON_NEGATIVE, "Number of servers to skip")
                .optional("only_count", ArgType::Bool, "Return only the number of matching servers")
                .optional("tag", ArgType::String, "Filter by tag"),
            handler: list_servers,
        },
        ToolDefinition {
            name: "register_host",
            title: "Register Host",
            description: "Register a new host with the specified key and optional hostname",
            schema: ArgumentSchema::new()
                .required("key", ArgType::String, "Registration key")
                .optional("hostname", ArgType::String, "Hostname to register the server under"),
            handler: register_host,
        },
        ToolDefinition {
            name: "unregister_host",
            title: "Unregister Host",
            description: "Unregister a host by hostname, IP address, or server ID",
            schema: ArgumentSchema::new()
                .optional("hostname", ArgType::String, "Hostname of the server")
                .optional("ip", ArgType::String, "IP address of the server")
                .optional("server_id", ArgType::String, "Server ID")
                .require_any(
                    &["hostname", "ip", "server_id"],
                    "At least one of hostname, ip, or server_id must be provided",
                ),
            handler: unregister_host,
        },
        ToolDefinition {
            name: "bulk_unregister_hosts",
            title: "Bulk Unregister Hosts",
            description: "Bulk unregister hosts that haven't checked in for specified number of days",
            schema: ArgumentSchema::new().required(
                "checkin_age",
                ArgType::Integer {
                    min: Some(1),
                    max: None,
                },
                "Days since last check-in (at least 1)",
            ),
            handler: bulk_unregister_hosts,
        },
        ToolDefinition {
            name: "set_server_tags",
            title: "Set Server Tags",
            description: "Set tags for a server (semicolon-separated)",
            schema: ArgumentSchema::new()
                .required("server_id", ArgType::String, "Server ID")
                .optional("tags", ArgType::String, "Semicolon-separated tags; omit to clear"),
            handler: set_server_tags,
        },
    ]
}

#[derive(Debug, Deserialize)]
struct RegisterHostArgs {
    key: String,
    hostname: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BulkUnregisterArgs {
    checkin_age: i64,
}

#[derive(Debug, Deserialize)]
struct SetTagsArgs {
    server_id: String,
    tags: Option<String>,
}

fn list_servers(client: &PortalClient, args: ValidatedArgs) -> BoxFuture<'_, crate::Result<String>> {
    Box::pin(async move {
        let filters: ServerListFilters = args.parse()?;
        let response = client.list_servers(&filters).await?;
        if filters.only_count == Some(true) {
            return Ok(format!("Total servers: {}", response["count"]));
        }
        pretty_json(&response)
    })
}

fn register_host(client: &PortalClient, args: ValidatedArgs) -> BoxFuture<'_, crate::Result<String>> {
    Box::pin(async move {
        let args: RegisterHostArgs = args.parse()?;
        let response = client
            .register_host(&args.key, args.hostname.as_deref())
            .await?;
        Ok(format!(
            "Host registered successfully. Server ID: {}",
            response.server_id
        ))
    })
}

fn unregister_host(client: &PortalClient, args: ValidatedArgs) -> BoxFuture<'_, crate::Result<String>> {
    Box::pin(async move {
        let selector: HostSelector = args.parse()?;
        let response = client.unregister_host(&selector).await?;
        if response.result == 0 {
            return Ok("No matching server was found or it was already unregistered".to_string());
        }
        Ok(format!(
            "Successfully unregistered {} server(s)",
            response.result
        ))
    })
}

fn bulk_unregister_hosts(
    client: &PortalClient,
    args: ValidatedArgs,
) -> BoxFuture<'_, crate::Result<String>> {
    Box::pin(async move {
        let args: BulkUnregisterArgs = args.parse()?;
        let response = client.bulk_unregister_hosts(args.checkin_age).await?;
        if response.result == 0 {
            return Ok(format!(
                "No servers found that hadn't checked in for {} days",
                args.checkin_age
            ));
        }
        Ok(format!(
            "Successfully unregistered {} servers that hadn't checked in for {} days",
            response.result, args.checkin_age
        ))
    })
}

fn set_server_tags(client: &PortalClient, args: ValidatedArgs) -> BoxFuture<'_, crate::Result<String>> {
    Box::pin(async move {
        let args: SetTagsArgs = args.parse()?;
        let tags = args.tags.as_deref().filter(|t| !t.is_empty());
        client.set_tags(&args.server_id, tags).await?;
        let action = match tags {
            Some(t) => format!("set to: {}", t),
            None => "cleared".to_string(),
        };
        Ok(format!(
            "Server tags {} for server {}",
            action, args.server_id
        ))
    })
}
