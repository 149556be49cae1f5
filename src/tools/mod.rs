//! Tool catalog and dispatcher.
//!
//! Each resource group (servers, feeds, keys, patchsets, users) contributes
//! a list of `ToolDefinition`s. `ToolCatalog` composes them once at startup
//! and dispatches calls by a single name lookup. The same `ArgumentSchema`
//! is advertised in `list_tools()` and enforced in `invoke()`.

pub mod feeds;
pub mod keys;
pub mod patchsets;
pub mod schema;
pub mod servers;
pub mod users;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use rmcp::model::{CallToolResult, Content, Tool};
use serde::Serialize;
use serde_json::Value;

use crate::client::PortalClient;
use crate::error::PortalError;
use crate::tools::schema::{ArgumentSchema, JsonObject, ValidatedArgs};

/// Handler invoked with schema-validated arguments; returns the success text.
pub type ToolHandler =
    for<'a> fn(&'a PortalClient, ValidatedArgs) -> BoxFuture<'a, crate::Result<String>>;

/// A named tool: discovery metadata, argument schema, and handler.
pub struct ToolDefinition {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub schema: ArgumentSchema,
    pub handler: ToolHandler,
}

impl ToolDefinition {
    /// Render as an MCP tool descriptor.
    pub fn to_tool(&self) -> Tool {
        let input_schema = match self.schema.to_json_schema() {
            Value::Object(map) => map,
            _ => JsonObject::new(),
        };
        Tool {
            name: self.name.into(),
            title: Some(self.title.to_string()),
            description: Some(self.description.into()),
            input_schema: Arc::new(input_schema),
            output_schema: None,
            annotations: None,
            icons: None,
            meta: None,
        }
    }
}

/// Result envelope of a tool call. Never an `Err`: failures set `is_error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn success(text: impl Into<String>) -> Self {
        ToolOutput {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        ToolOutput {
            text: text.into(),
            is_error: true,
        }
    }
}

impl From<ToolOutput> for CallToolResult {
    fn from(output: ToolOutput) -> Self {
        CallToolResult {
            content: vec![Content::text(output.text)],
            is_error: Some(output.is_error),
            structured_content: None,
            meta: None,
        }
    }
}

/// Registry of every ePortal tool, bound to one `PortalClient`.
pub struct ToolCatalog {
    client: PortalClient,
    tools: Vec<ToolDefinition>,
    index: HashMap<&'static str, usize>,
}

impl ToolCatalog {
    /// Build the catalog from all resource groups.
    pub fn new(client: PortalClient) -> Self {
        let tools: Vec<ToolDefinition> = [
            servers::tools(),
            feeds::tools(),
            keys::tools(),
            patchsets::tools(),
            users::tools(),
        ]
        .into_iter()
        .flatten()
        .collect();

        let index = tools
            .iter()
            .enumerate()
            .map(|(i, tool)| (tool.name, i))
            .collect();

        tracing::debug!(tool_count = tools.len(), "ePortal tool catalog built");

        ToolCatalog {
            client,
            tools,
            index,
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Discovery listing: every tool with its description and input schema.
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.iter().map(ToolDefinition::to_tool).collect()
    }

    /// Validate `arguments`, run the named tool, and wrap the outcome.
    ///
    /// Validation failures short-circuit before any request is sent. Every
    /// error is converted into an `is_error` envelope.
    pub async fn invoke(&self, name: &str, arguments: Option<JsonObject>) -> ToolOutput {
        let Some(tool) = self.get(name) else {
            tracing::warn!(tool = %name, "unknown tool requested");
            return ToolOutput::error(PortalError::UnknownTool(name.to_string()).to_string());
        };

        let start = Instant::now();
        let result = match tool.schema.validate(arguments) {
            Ok(args) => (tool.handler)(&self.client, args).await,
            Err(e) => Err(e),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(text) => {
                tracing::info!(tool = %name, duration_ms, "tool call succeeded");
                ToolOutput::success(text)
            }
            Err(e) => {
                tracing::warn!(tool = %name, duration_ms, error = %e, "tool call failed");
                ToolOutput::error(format!("Error executing tool {}: {}", name, e))
            }
        }
    }
}

/// Pretty-print a response body for list-style tools.
pub(crate) fn pretty_json<T: Serialize>(value: &T) -> crate::Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| PortalError::Decode(e.to_string()))
}
