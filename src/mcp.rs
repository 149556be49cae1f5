//! EPortalMcpServer: rmcp ServerHandler backed by the ePortal ToolCatalog.
//!
//! Tool listing and tool calls are delegated to a shared `ToolCatalog`.
//! The catalog is immutable after construction, so clones handed out per
//! Streamable HTTP session share one `Arc` without locking.

use std::sync::Arc;

use rmcp::ErrorData as McpError;
use rmcp::handler::server::ServerHandler;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, ListToolsResult, PaginatedRequestParams,
    ServerCapabilities, ServerInfo,
};
use rmcp::service::{RequestContext, RoleServer};

use crate::client::PortalClient;
use crate::tools::ToolCatalog;

/// Name advertised to MCP clients.
pub const SERVER_NAME: &str = "tuxcare-eportal-mcp";

#[derive(Clone)]
pub struct EPortalMcpServer {
    catalog: Arc<ToolCatalog>,
}

impl EPortalMcpServer {
    pub fn new(catalog: ToolCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }

    /// Convenience constructor: catalog over `client`.
    pub fn from_client(client: PortalClient) -> Self {
        Self::new(ToolCatalog::new(client))
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }
}

impl ServerHandler for EPortalMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: rmcp::model::Implementation {
                name: SERVER_NAME.into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: Some("TuxCare ePortal".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Manage a TuxCare ePortal: servers, feeds, registration keys, patchsets, and users."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.catalog.list_tools(),
            next_cursor: None,
            meta: None,
        })
    }

    /// Tool failures come back as `is_error` results, never as protocol errors.
    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let output = self
            .catalog
            .invoke(request.name.as_ref(), request.arguments)
            .await;
        Ok(output.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::recording::RecordingTransport;

    fn make_server() -> EPortalMcpServer {
        EPortalMcpServer::from_client(PortalClient::new(Arc::new(RecordingTransport::new())))
    }

    #[test]
    fn test_get_info_server_name() {
        let server = make_server();
        let info = server.get_info();
        assert_eq!(info.server_info.name, SERVER_NAME);
        assert!(
            info.capabilities.tools.is_some(),
            "tools capability should be enabled"
        );
        assert!(info.instructions.is_some(), "instructions should be set");
    }

    #[test]
    fn test_clones_share_catalog() {
        let server = make_server();
        let clone = server.clone();
        assert!(Arc::ptr_eq(&server.catalog, &clone.catalog));
        assert_eq!(server.catalog().list_tools().len(), 14);
    }
}
