//! Error types for ePortal tool dispatch and API calls.

use thiserror::Error;

/// Main error type for ePortal operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortalError {
    /// Tool arguments failed schema or cross-field validation
    #[error("{0}")]
    Validation(String),

    /// Configuration (URL or auth section) is missing required fields or malformed
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Portal answered HTTP 401
    #[error("Authentication failed. Please check your credentials.")]
    Authentication,

    /// Portal answered HTTP 403
    #[error("Access denied. Please check your permissions.")]
    Permission,

    /// Portal response carried a structured `error` field
    #[error("API Error: {0}")]
    RemoteApi(String),

    /// Connection failure, timeout, or unclassified HTTP failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Portal answered 2xx with a body that does not match the expected shape
    #[error("unexpected response from ePortal: {0}")]
    Decode(String),

    /// No tool registered under this name
    #[error("Tool {0} not found")]
    UnknownTool(String),
}

impl PortalError {
    /// Shorthand for a validation failure on a single named argument.
    pub fn invalid_arg(field: &str, reason: impl std::fmt::Display) -> Self {
        PortalError::Validation(format!("{}: {}", field, reason))
    }
}

/// Result type alias for ePortal operations
pub type Result<T> = std::result::Result<T, PortalError>;
