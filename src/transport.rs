//! HTTP transport seam for the Portal Client.
//!
//! `PortalClient` never talks to `reqwest` directly: it builds a
//! `PortalRequest` and hands it to an injected `PortalTransport`. Production
//! code uses `ReqwestTransport`; tests substitute a recording stub.

use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use reqwest::{Method, Url};

use crate::auth::AuthProvider;
use crate::error::PortalError;

/// Fixed per-request timeout for every outbound call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A single outbound request, relative to the portal base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalRequest {
    pub method: Method,
    /// Path relative to the base URL, e.g. `admin/api/feeds/`.
    pub path: String,
    /// Query parameters in order; repeated names are sent repeatedly.
    pub query: Vec<(String, String)>,
    /// `application/x-www-form-urlencoded` body fields, if any.
    pub form: Option<Vec<(String, String)>>,
}

impl PortalRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        PortalRequest {
            method,
            path: path.into(),
            query: Vec::new(),
            form: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, name: &str, value: impl ToString) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    pub fn query_opt(self, name: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.query(name, v),
            None => self,
        }
    }

    pub fn form_field(mut self, name: &str, value: impl ToString) -> Self {
        self.form
            .get_or_insert_with(Vec::new)
            .push((name.to_string(), value.to_string()));
        self
    }

    pub fn form_field_opt(self, name: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.form_field(name, v),
            None => self,
        }
    }

    /// Start a form body even if no field ends up in it.
    pub fn empty_form(mut self) -> Self {
        self.form.get_or_insert_with(Vec::new);
        self
    }
}

/// Raw response: HTTP status and the body as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalResponse {
    pub status: u16,
    pub body: String,
}

/// Anything that can carry a `PortalRequest` to the portal.
///
/// Implementations must be safe to share across concurrent tool calls.
/// Connection-level failures (DNS, refused, timeout) are reported as
/// `PortalError::Transport`; HTTP error statuses are returned as ordinary
/// responses and classified by the client.
pub trait PortalTransport: Send + Sync {
    fn send(&self, request: PortalRequest) -> BoxFuture<'_, crate::Result<PortalResponse>>;
}

/// Production transport backed by a pooled `reqwest::Client`.
///
/// Auth headers are installed once as client default headers.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestTransport {
    /// Build a transport for `base_url` (already normalized) signing every request with `auth`.
    pub fn new(base_url: Url, auth: &AuthProvider) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .default_headers(auth.header_map()?)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PortalError::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Wrap an existing client. The caller is responsible for auth headers and timeouts.
    pub fn with_client(client: reqwest::Client, base_url: Url) -> Self {
        ReqwestTransport { client, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn resolve(&self, path: &str) -> crate::Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| PortalError::Transport(format!("invalid request path '{}': {}", path, e)))
    }

    async fn execute(&self, request: PortalRequest) -> crate::Result<PortalResponse> {
        let url = self.resolve(&request.path)?;
        let start = Instant::now();

        tracing::debug!(method = %request.method, path = %request.path, "sending ePortal request");

        let mut builder = self.client.request(request.method.clone(), url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(form) = &request.form {
            builder = builder.form(form);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                PortalError::Transport(format!(
                    "request to {} timed out after {}s",
                    request.path,
                    REQUEST_TIMEOUT.as_secs()
                ))
            } else {
                PortalError::Transport(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| PortalError::Transport(format!("failed to read response body: {}", e)))?;

        tracing::info!(
            method = %request.method,
            path = %request.path,
            status = status,
            duration_ms = start.elapsed().as_millis() as u64,
            "ePortal request completed"
        );

        Ok(PortalResponse { status, body })
    }
}

impl PortalTransport for ReqwestTransport {
    fn send(&self, request: PortalRequest) -> BoxFuture<'_, crate::Result<PortalResponse>> {
        Box::pin(self.execute(request))
    }
}
