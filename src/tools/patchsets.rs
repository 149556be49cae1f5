//! Patchset tools: listing and deployment transitions.
//!
//! Transitions are applied by the portal; the success text reports the
//! requested action, not a verified post-state.

use futures::future::BoxFuture;

use crate::client::PortalClient;
use crate::model::{PatchsetAction, PatchsetFilters, PatchsetManageOptions, Product};
use crate::tools::schema::{ArgType, ArgumentSchema, ValidatedArgs};
use crate::tools::{ToolDefinition, pretty_json};

pub(crate) fn tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "list_patchsets",
            title: "List Patchsets",
            description: "List available patchsets for a feed and product",
            schema: ArgumentSchema::new()
                .optional("feed", ArgType::String, "Feed name")
                .optional("product", ArgType::Enum(Product::NAMES), "Patch product"),
            handler: list_patchsets,
        },
        ToolDefinition {
            name: "manage_patchsets",
            title: "Manage Patchsets",
            description: "Perform deployment actions on patchsets",
            schema: ArgumentSchema::new()
                .required("patchset", ArgType::String, "Patchset identifier")
                .required("feed", ArgType::StringOrList, "Feed name or list of feed names")
                .required(
                    "action",
                    ArgType::Enum(PatchsetAction::NAMES),
                    "enable, disable, enable-upto (also enables older), or undeploy-downto (also undeploys newer)",
                )
                .optional("product", ArgType::Enum(Product::NAMES), "Patch product"),
            handler: manage_patchsets,
        },
    ]
}

fn list_patchsets(client: &PortalClient, args: ValidatedArgs) -> BoxFuture<'_, crate::Result<String>> {
    Box::pin(async move {
        let filters: PatchsetFilters = args.parse()?;
        pretty_json(&client.list_patchsets(&filters).await?)
    })
}

fn manage_patchsets(
    client: &PortalClient,
    args: ValidatedArgs,
) -> BoxFuture<'_, crate::Result<String>> {
    Box::pin(async move {
        let options: PatchsetManageOptions = args.parse()?;
        client.manage_patchsets(&options).await?;
        Ok(format!(
            "Patchset \"{}\" {} successfully on feed(s): {}",
            options.patchset,
            options.action.description(),
            options.feeds.join(", ")
        ))
    })
}
