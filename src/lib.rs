//! ePortal MCP: exposes the TuxCare ePortal administrative API as MCP tools.
//!
//! Tool calls are validated against a per-tool argument schema, mapped to a
//! single ePortal HTTP request, and answered with a text result. Every
//! failure (validation, auth, remote error, transport) comes back as an
//! error-flagged result rather than a protocol fault.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod mcp;
pub mod model;
pub mod tools;
pub mod transport;

pub use auth::{AuthConfig, AuthKind, AuthProvider};
pub use client::PortalClient;
pub use config::{AuthSection, PortalConfig, normalize_base_url, parse_env_ref, resolve_secret};
pub use error::{PortalError, Result};
pub use mcp::EPortalMcpServer;
pub use tools::schema::{ArgType, ArgumentSchema, JsonObject};
pub use tools::{ToolCatalog, ToolDefinition, ToolOutput};
pub use transport::{PortalRequest, PortalResponse, PortalTransport, ReqwestTransport};
