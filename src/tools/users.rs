//! User tools. Users are read-only from here.

use futures::future::BoxFuture;

use crate::client::PortalClient;
use crate::tools::schema::{ArgumentSchema, ValidatedArgs};
use crate::tools::{ToolDefinition, pretty_json};

pub(crate) fn tools() -> Vec<ToolDefinition> {
    vec![ToolDefinition {
        name: "list_users",
        title: "List Users",
        description: "List all existing users in the ePortal system",
        schema: ArgumentSchema::new(),
        handler: list_users,
    }]
}

fn list_users(client: &PortalClient, _args: ValidatedArgs) -> BoxFuture<'_, crate::Result<String>> {
    Box::pin(async move { pretty_json(&client.list_users().await?) })
}
