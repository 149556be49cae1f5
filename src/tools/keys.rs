//! Registration key tools.

use futures::future::BoxFuture;
use serde::Deserialize;

use crate::client::PortalClient;
use crate::model::KeyUpsert;
use crate::tools::schema::{ArgType, ArgumentSchema, ValidatedArgs};
use crate::tools::{ToolDefinition, pretty_json};

pub(crate) fn tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "list_keys",
            title: "List Keys",
            description: "List all existing registration keys",
            schema: ArgumentSchema::new(),
            handler: list_keys,
        },
        ToolDefinition {
            name: "create_key",
            title: "Create Key",
            description: "Create a new registration key or modify an existing one",
            schema: ArgumentSchema::new()
                .optional("key", ArgType::String, "Key name; generated by the portal when omitted")
                .optional("feed", ArgType::String, "Feed the key is attached to (portal default: main)")
                .optional("note", ArgType::String, "Free-form note")
                .optional(
                    "server_limit",
                    ArgType::Integer {
                        min: Some(0),
                        max: None,
                    },
                    "Maximum number of servers for this key (0 = unlimited)",
                ),
            handler: create_key,
        },
        ToolDefinition {
            name: "delete_key",
            title: "Delete Key",
            description: "Delete an existing registration key",
            schema: ArgumentSchema::new().required("key", ArgType::String, "Key name"),
            handler: delete_key,
        },
    ]
}

#[derive(Debug, Deserialize)]
struct DeleteKeyArgs {
    key: String,
}

fn list_keys(client: &PortalClient, _args: ValidatedArgs) -> BoxFuture<'_, crate::Result<String>> {
    Box::pin(async move { pretty_json(&client.list_keys().await?) })
}

fn create_key(client: &PortalClient, args: ValidatedArgs) -> BoxFuture<'_, crate::Result<String>> {
    Box::pin(async move {
        let key: KeyUpsert = args.parse()?;
        let response = client.create_or_modify_key(&key).await?;
        let result = &response["result"];
        let key_name = key
            .key
            .as_deref()
            .filter(|k| !k.is_empty())
            .or_else(|| result["key"].as_str())
            .unwrap_or_default();
        Ok(format!(
            "Registration key \"{}\" created/modified successfully:\n{}",
            key_name,
            pretty_json(result)?
        ))
    })
}

fn delete_key(client: &PortalClient, args: ValidatedArgs) -> BoxFuture<'_, crate::Result<String>> {
    Box::pin(async move {
        let args: DeleteKeyArgs = args.parse()?;
        let response = client.delete_key(&args.key).await?;
        if response.result == 0 {
            return Ok(format!(
                "Registration key \"{}\" was not found or already deleted",
                args.key
            ));
        }
        Ok(format!(
            "Registration key \"{}\" deleted successfully",
            args.key
        ))
    })
}
