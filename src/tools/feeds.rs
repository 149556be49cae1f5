//! Feed tools. The `main` feed is protected from deletion.

use futures::future::BoxFuture;
use serde::Deserialize;

use crate::client::PortalClient;
use crate::error::PortalError;
use crate::model::FeedUpsert;
use crate::tools::schema::{ArgType, ArgumentSchema, ValidatedArgs};
use crate::tools::{ToolDefinition, pretty_json};

/// The default feed, which the portal requires to exist.
pub const MAIN_FEED: &str = "main";

pub(crate) fn tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "list_feeds",
            title: "List Feeds",
            description: "List all existing feeds",
            schema: ArgumentSchema::new(),
            handler: list_feeds,
        },
        ToolDefinition {
            name: "create_feed",
            title: "Create Feed",
            description: "Create a new feed or modify an existing one",
            schema: ArgumentSchema::new()
                .required("name", ArgType::String, "Feed name")
                .optional("auto", ArgType::Bool, "Automatically download new patches")
                .optional(
                    "deploy_after",
                    ArgType::Integer {
                        min: Some(0),
                        max: None,
                    },
                    "Hours to wait before deploying downloaded patches",
                ),
            handler: create_feed,
        },
        ToolDefinition {
            name: "delete_feed",
            title: "Delete Feed",
            description: "Delete an existing feed (note: 'main' feed cannot be deleted)",
            schema: ArgumentSchema::new().required("name", ArgType::String, "Feed name"),
            handler: delete_feed,
        },
    ]
}

#[derive(Debug, Deserialize)]
struct DeleteFeedArgs {
    name: String,
}

fn list_feeds(client: &PortalClient, _args: ValidatedArgs) -> BoxFuture<'_, crate::Result<String>> {
    Box::pin(async move { pretty_json(&client.list_feeds().await?) })
}

fn create_feed(client: &PortalClient, args: ValidatedArgs) -> BoxFuture<'_, crate::Result<String>> {
    Box::pin(async move {
        let feed: FeedUpsert = args.parse()?;
        let response = client.create_or_modify_feed(&feed).await?;
        Ok(format!(
            "Feed \"{}\" created/modified successfully:\n{}",
            feed.name,
            pretty_json(&response["result"])?
        ))
    })
}

fn delete_feed(client: &PortalClient, args: ValidatedArgs) -> BoxFuture<'_, crate::Result<String>> {
    Box::pin(async move {
        let args: DeleteFeedArgs = args.parse()?;
        if args.name == MAIN_FEED {
            return Err(PortalError::Validation(
                "Cannot delete the \"main\" feed".to_string(),
            ));
        }
        let response = client.delete_feed(&args.name).await?;
        if response.result == 0 {
            return Ok(format!(
                "Feed \"{}\" was not found or already deleted",
                args.name
            ));
        }
        Ok(format!("Feed \"{}\" deleted successfully", args.name))
    })
}
