//! Authentication header construction for outbound ePortal requests.
//!
//! Two schemes are supported: HTTP Basic and a static API key carried in a
//! (configurable) request header. Headers are computed once when the
//! provider is built and reused for every call.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;

use crate::error::PortalError;

/// Header used for API key auth when no `headerName` is configured.
pub const DEFAULT_API_KEY_HEADER: &str = "X-Api-Key";

/// Supported authentication schemes.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthKind {
    Basic,
    ApiKey,
}

impl AuthKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthKind::Basic => "basic",
            AuthKind::ApiKey => "api_key",
        }
    }
}

/// Declarative auth configuration, discriminated by `type`.
///
/// Which optional fields are required depends on the type; see
/// [`AuthProvider::new`].
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    #[serde(rename = "type")]
    pub kind: AuthKind,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
    pub header_name: Option<String>,
}

impl AuthConfig {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        AuthConfig {
            kind: AuthKind::Basic,
            username: Some(username.into()),
            password: Some(password.into()),
            api_key: None,
            header_name: None,
        }
    }

    pub fn api_key(api_key: impl Into<String>, header_name: Option<String>) -> Self {
        AuthConfig {
            kind: AuthKind::ApiKey,
            username: None,
            password: None,
            api_key: Some(api_key.into()),
            header_name,
        }
    }

    /// Check that the fields required by the declared type are present and non-empty.
    pub fn validate(&self) -> crate::Result<()> {
        match self.kind {
            AuthKind::Basic => {
                if is_blank(&self.username) || is_blank(&self.password) {
                    return Err(PortalError::Configuration(
                        "Username and password are required for basic authentication".into(),
                    ));
                }
            }
            AuthKind::ApiKey => {
                if is_blank(&self.api_key) {
                    return Err(PortalError::Configuration(
                        "API key is required for API key authentication".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(str::is_empty)
}

/// Validated auth configuration plus the headers it produces.
///
/// Pure: building a provider performs no I/O.
#[derive(Debug, Clone)]
pub struct AuthProvider {
    kind: AuthKind,
    headers: Vec<(String, String)>,
}

impl AuthProvider {
    /// Validate `config` and precompute its request headers.
    ///
    /// Fails with `PortalError::Configuration` when a required field is
    /// missing, or when the custom header name/value is not a legal HTTP header.
    pub fn new(config: &AuthConfig) -> crate::Result<Self> {
        config.validate()?;

        let headers = match config.kind {
            AuthKind::Basic => {
                let username = config.username.as_deref().unwrap_or_default();
                let password = config.password.as_deref().unwrap_or_default();
                let credentials = STANDARD.encode(format!("{}:{}", username, password));
                vec![("Authorization".to_string(), format!("Basic {}", credentials))]
            }
            AuthKind::ApiKey => {
                let name = config
                    .header_name
                    .as_deref()
                    .filter(|n| !n.is_empty())
                    .unwrap_or(DEFAULT_API_KEY_HEADER);
                let key = config.api_key.clone().unwrap_or_default();
                vec![(name.to_string(), key)]
            }
        };

        let provider = AuthProvider {
            kind: config.kind,
            headers,
        };
        // Reject illegal header names/values now rather than on the first request.
        provider.header_map()?;
        Ok(provider)
    }

    pub fn kind(&self) -> AuthKind {
        self.kind
    }

    /// Header name/value pairs to attach to every request, names as configured.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// The same headers as a `reqwest` header map (values marked sensitive).
    pub fn header_map(&self) -> crate::Result<HeaderMap> {
        let mut map = HeaderMap::new();
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                PortalError::Configuration(format!("invalid auth header name '{}': {}", name, e))
            })?;
            let mut header_value = HeaderValue::from_str(value).map_err(|_| {
                PortalError::Configuration(format!(
                    "auth header '{}' contains characters not allowed in HTTP headers",
                    name
                ))
            })?;
            header_value.set_sensitive(true);
            map.insert(header_name, header_value);
        }
        Ok(map)
    }
}
