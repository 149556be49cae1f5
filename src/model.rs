//! Wire-facing value types for the ePortal admin API.
//!
//! The portal is the single source of truth. Listing and upsert bodies
//! (servers, feeds, keys, patchsets, users) are passed through as raw JSON
//! so nullable fields and fields added by newer portals survive rendering.
//! Only request shapes and the acknowledgements a handler branches on are
//! typed here.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response of `admin/api/register`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RegisterResponse {
    /// Reported as a string by current portals; numeric ids are accepted too.
    #[serde(deserialize_with = "string_or_number")]
    pub server_id: String,
}

/// Response of delete-style calls: number of rows removed (0 = nothing matched).
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct DeleteResponse {
    #[serde(deserialize_with = "row_count")]
    pub result: u64,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected a string or number, found {}",
            other
        ))),
    }
}

fn row_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let count = match &value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as u64)
        }),
        _ => None,
    };
    count.ok_or_else(|| de::Error::custom(format!("expected a row count, found {}", value)))
}

/// Patch product line a patchset belongs to.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    Kernel,
    User,
    Qemu,
    Db,
}

impl Product {
    pub const NAMES: &'static [&'static str] = &["kernel", "user", "qemu", "db"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Product::Kernel => "kernel",
            Product::User => "user",
            Product::Qemu => "qemu",
            Product::Db => "db",
        }
    }
}

/// Deployment transition requested through `admin/api/patchsets/manage`.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PatchsetAction {
    Enable,
    Disable,
    EnableUpto,
    UndeployDownto,
}

impl PatchsetAction {
    pub const NAMES: &'static [&'static str] =
        &["enable", "disable", "enable-upto", "undeploy-downto"];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatchsetAction::Enable => "enable",
            PatchsetAction::Disable => "disable",
            PatchsetAction::EnableUpto => "enable-upto",
            PatchsetAction::UndeployDownto => "undeploy-downto",
        }
    }

    /// Phrase used in success messages, e.g. `Patchset "x" enabled successfully`.
    pub fn description(&self) -> &'static str {
        match self {
            PatchsetAction::Enable => "enabled",
            PatchsetAction::Disable => "disabled",
            PatchsetAction::EnableUpto => "and all older patchsets enabled",
            PatchsetAction::UndeployDownto => "and all newer patchsets undeployed",
        }
    }
}

/// Filters accepted by `admin/api/servers`. Unset fields are not sent.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ServerListFilters {
    pub hostname: Option<String>,
    pub ip: Option<String>,
    pub service_id: Option<String>,
    pub feed: Option<String>,
    pub key: Option<String>,
    pub registered_age: Option<f64>,
    pub checkin_age: Option<f64>,
    pub updated_age: Option<f64>,
    pub is_updated: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u64>,
    pub only_count: Option<bool>,
    pub tag: Option<String>,
}

impl ServerListFilters {
    /// Query parameters for the defined filters, in declaration order.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        let mut push = |name: &str, value: Option<String>| {
            if let Some(v) = value {
                params.push((name.to_string(), v));
            }
        };
        push("hostname", self.hostname.clone());
        push("ip", self.ip.clone());
        push("service_id", self.service_id.clone());
        push("feed", self.feed.clone());
        push("key", self.key.clone());
        push("registered_age", self.registered_age.map(|v| v.to_string()));
        push("checkin_age", self.checkin_age.map(|v| v.to_string()));
        push("updated_age", self.updated_age.map(|v| v.to_string()));
        push("is_updated", self.is_updated.map(|v| v.to_string()));
        push("limit", self.limit.map(|v| v.to_string()));
        push("offset", self.offset.map(|v| v.to_string()));
        push("only_count", self.only_count.map(|v| v.to_string()));
        push("tag", self.tag.clone());
        params
    }
}

/// Selector for `admin/api/delete_server`; at least one field must be set.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct HostSelector {
    pub hostname: Option<String>,
    pub ip: Option<String>,
    pub server_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FeedUpsert {
    pub name: String,
    pub auto: Option<bool>,
    pub deploy_after: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct KeyUpsert {
    pub key: Option<String>,
    pub feed: Option<String>,
    pub note: Option<String>,
    pub server_limit: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PatchsetFilters {
    pub feed: Option<String>,
    pub product: Option<Product>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PatchsetManageOptions {
    pub patchset: String,
    /// One or more feeds; each is sent as a separate `feed` parameter.
    #[serde(rename = "feed")]
    pub feeds: Vec<String>,
    pub action: PatchsetAction,
    pub product: Option<Product>,
}
