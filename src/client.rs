//! PortalClient: one async method per ePortal admin API operation.
//!
//! Every method builds a `PortalRequest`, sends it through the injected
//! transport, and classifies the response uniformly:
//! - HTTP 401 → `PortalError::Authentication`
//! - HTTP 403 → `PortalError::Permission`
//! - body with an `error` field → `PortalError::RemoteApi`
//! - any other non-2xx → `PortalError::Transport`
//!
//! Listing and upsert calls hand back the body exactly as the portal sent
//! it. Only the few fields a caller branches on (`server_id`, delete row
//! counts) are decoded into types.
//!
//! The client holds no per-call state and is cheap to clone; clones share
//! the transport (and its connection pool).

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::auth::AuthProvider;
use crate::config::PortalConfig;
use crate::error::PortalError;
use crate::model::{
    DeleteResponse, FeedUpsert, HostSelector, KeyUpsert, PatchsetFilters, PatchsetManageOptions,
    RegisterResponse, ServerListFilters,
};
use crate::transport::{PortalRequest, PortalResponse, PortalTransport, ReqwestTransport};

const SERVERS: &str = "admin/api/servers";
const REGISTER: &str = "admin/api/register";
const DELETE_SERVER: &str = "admin/api/delete_server";
const FEEDS: &str = "admin/api/feeds/";
const KEYS: &str = "admin/api/keys/";
const PATCHSETS: &str = "admin/api/patchsets/";
const PATCHSETS_MANAGE: &str = "admin/api/patchsets/manage";
const USERS: &str = "admin/api/users/";
const SET_TAGS: &str = "admin/api/set_tags";

#[derive(Clone)]
pub struct PortalClient {
    transport: Arc<dyn PortalTransport>,
}

impl PortalClient {
    /// Wrap an explicitly constructed transport.
    pub fn new(transport: Arc<dyn PortalTransport>) -> Self {
        PortalClient { transport }
    }

    /// Build the production client from a validated config.
    pub fn from_config(config: &PortalConfig) -> crate::Result<Self> {
        let auth = AuthProvider::new(&config.auth_config())?;
        let transport = ReqwestTransport::new(config.base_url()?, &auth)?;
        tracing::info!(
            base_url = %transport.base_url(),
            auth_type = auth.kind().as_str(),
            "ePortal client configured"
        );
        Ok(Self::new(Arc::new(transport)))
    }

    // --- Servers ---

    /// Server listing (`count`, `limit`, `offset`, `result`) as returned by the portal.
    pub async fn list_servers(&self, filters: &ServerListFilters) -> crate::Result<Value> {
        let mut request = PortalRequest::get(SERVERS);
        request.query = filters.to_query();
        self.call(request).await
    }

    pub async fn register_host(
        &self,
        key: &str,
        hostname: Option<&str>,
    ) -> crate::Result<RegisterResponse> {
        let request = PortalRequest::post(REGISTER)
            .form_field("key", key)
            .form_field_opt("hostname", hostname.filter(|h| !h.is_empty()));
        self.call(request).await
    }

    /// Remove one server. Fails with `Validation` before any I/O if the selector is empty.
    pub async fn unregister_host(&self, selector: &HostSelector) -> crate::Result<DeleteResponse> {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        let request = PortalRequest::post(DELETE_SERVER)
            .query_opt("hostname", non_empty(&selector.hostname))
            .query_opt("ip", non_empty(&selector.ip))
            .query_opt("server_id", non_empty(&selector.server_id));
        if request.query.is_empty() {
            return Err(PortalError::Validation(
                "At least one of hostname, ip, or server_id must be provided".into(),
            ));
        }
        self.call(request).await
    }

    /// Remove every server that has not checked in for `checkin_age` days.
    pub async fn bulk_unregister_hosts(&self, checkin_age: i64) -> crate::Result<DeleteResponse> {
        if checkin_age < 1 {
            return Err(PortalError::invalid_arg("checkin_age", "must be at least 1"));
        }
        let request = PortalRequest::delete(SERVERS).query("checkin_age", checkin_age);
        self.call(request).await
    }

    /// Set (or, with `None`, clear) the semicolon-delimited tags of a server.
    pub async fn set_tags(&self, server_id: &str, tags: Option<&str>) -> crate::Result<()> {
        let request = PortalRequest::post(SET_TAGS)
            .query("server_id", server_id)
            .query_opt("tags", tags.filter(|t| !t.is_empty()));
        self.acknowledge(request).await
    }

    // --- Feeds ---

    pub async fn list_feeds(&self) -> crate::Result<Value> {
        self.call(PortalRequest::get(FEEDS)).await
    }

    /// Create the feed, or modify it if one with this name exists.
    pub async fn create_or_modify_feed(&self, feed: &FeedUpsert) -> crate::Result<Value> {
        let request = PortalRequest::post(FEEDS)
            .form_field("name", &feed.name)
            .form_field_opt("auto", feed.auto)
            .form_field_opt("deploy_after", feed.deploy_after);
        self.call(request).await
    }

    /// Delete a feed by name. Protecting `main` is the caller's job.
    pub async fn delete_feed(&self, name: &str) -> crate::Result<DeleteResponse> {
        let path = format!("{}{}", FEEDS, urlencoding::encode(name));
        self.call(PortalRequest::delete(path)).await
    }

    // --- Registration keys ---

    pub async fn list_keys(&self) -> crate::Result<Value> {
        self.call(PortalRequest::get(KEYS)).await
    }

    /// Create or modify a key; the portal generates a key name when none is given.
    pub async fn create_or_modify_key(&self, key: &KeyUpsert) -> crate::Result<Value> {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        let request = PortalRequest::post(KEYS)
            .empty_form()
            .form_field_opt("key", non_empty(&key.key))
            .form_field_opt("feed", non_empty(&key.feed))
            .form_field_opt("note", non_empty(&key.note))
            .form_field_opt("server_limit", key.server_limit);
        self.call(request).await
    }

    pub async fn delete_key(&self, key: &str) -> crate::Result<DeleteResponse> {
        let path = format!("{}{}", KEYS, urlencoding::encode(key));
        self.call(PortalRequest::delete(path)).await
    }

    // --- Patchsets ---

    pub async fn list_patchsets(&self, filters: &PatchsetFilters) -> crate::Result<Value> {
        let request = PortalRequest::get(PATCHSETS)
            .query_opt("feed", filters.feed.as_deref().filter(|f| !f.is_empty()))
            .query_opt("product", filters.product.map(|p| p.as_str()));
        self.call(request).await
    }

    /// Request a deployment transition; the portal applies it, we only report the action.
    pub async fn manage_patchsets(&self, options: &PatchsetManageOptions) -> crate::Result<()> {
        let mut request = PortalRequest::post(PATCHSETS_MANAGE).query("patchset", &options.patchset);
        for feed in &options.feeds {
            request = request.query("feed", feed);
        }
        let request = request
            .query("action", options.action.as_str())
            .query_opt("product", options.product.map(|p| p.as_str()));
        self.acknowledge(request).await
    }

    // --- Users ---

    pub async fn list_users(&self) -> crate::Result<Value> {
        self.call(PortalRequest::get(USERS)).await
    }

    /// Send, classify, and decode into `T`. A 2xx body must be JSON.
    async fn call<T: DeserializeOwned>(&self, request: PortalRequest) -> crate::Result<T> {
        let path = request.path.clone();
        let body = self.exchange(request).await?.ok_or_else(|| {
            PortalError::Decode(format!("{}: response body is not JSON", path))
        })?;
        serde_json::from_value(body).map_err(|e| PortalError::Decode(format!("{}: {}", path, e)))
    }

    /// Send and classify, ignoring whatever a successful response carries.
    async fn acknowledge(&self, request: PortalRequest) -> crate::Result<()> {
        self.exchange(request).await.map(|_| ())
    }

    async fn exchange(&self, request: PortalRequest) -> crate::Result<Option<Value>> {
        let method = request.method.clone();
        let path = request.path.clone();

        let response = self.transport.send(request).await.inspect_err(|e| {
            tracing::warn!(%method, %path, error = %e, "ePortal request failed");
        })?;

        classify(response).inspect_err(|e| {
            tracing::warn!(%method, %path, error = %e, "ePortal returned an error");
        })
    }
}

/// Map a raw response to its JSON body (`None` when not JSON) or a classified error.
fn classify(response: PortalResponse) -> crate::Result<Option<Value>> {
    match response.status {
        401 => return Err(PortalError::Authentication),
        403 => return Err(PortalError::Permission),
        _ => {}
    }

    let parsed: Option<Value> = serde_json::from_str(&response.body).ok();

    if let Some(message) = parsed.as_ref().and_then(remote_error_message) {
        return Err(PortalError::RemoteApi(message));
    }

    if !(200..300).contains(&response.status) {
        return Err(PortalError::Transport(format!(
            "HTTP {}: {}",
            response.status,
            truncate(&response.body, 200)
        )));
    }

    if parsed.is_none() && !response.body.trim().is_empty() {
        tracing::debug!(body = %truncate(&response.body, 200), "ePortal response body is not JSON");
    }
    Ok(parsed)
}

fn remote_error_message(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PatchsetAction, Product};
    use crate::transport::recording::RecordingTransport;
    use reqwest::Method;
    use serde_json::json;

    fn setup() -> (Arc<RecordingTransport>, PortalClient) {
        let transport = Arc::new(RecordingTransport::new());
        let client = PortalClient::new(transport.clone());
        (transport, client)
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_401_is_authentication_error() {
        let (transport, client) = setup();
        transport.push_json(401, json!({"error": "bad creds"}));
        let result = client.list_users().await;
        assert_eq!(result, Err(PortalError::Authentication));
    }

    #[tokio::test]
    async fn test_403_is_permission_error() {
        let (transport, client) = setup();
        transport.push_json(403, json!({}));
        let result = client.list_feeds().await;
        assert_eq!(result, Err(PortalError::Permission));
    }

    #[tokio::test]
    async fn test_error_field_is_remote_api_error() {
        let (transport, client) = setup();
        transport.push_json(400, json!({"error": "Key not found"}));
        let result = client.delete_key("nope").await;
        assert_eq!(result, Err(PortalError::RemoteApi("Key not found".into())));
    }

    #[tokio::test]
    async fn test_error_field_on_success_status_is_remote_api_error() {
        let (transport, client) = setup();
        transport.push_json(200, json!({"error": "Feed is in use"}));
        let result = client.delete_feed("qa").await;
        assert_eq!(result, Err(PortalError::RemoteApi("Feed is in use".into())));
    }

    #[tokio::test]
    async fn test_unclassified_status_is_transport_error() {
        let (transport, client) = setup();
        transport.push(Ok(PortalResponse {
            status: 502,
            body: "<html>Bad Gateway</html>".into(),
        }));
        let result = client.list_users().await;
        assert!(matches!(result, Err(PortalError::Transport(msg)) if msg.starts_with("HTTP 502")));
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let (transport, client) = setup();
        transport.push(Err(PortalError::Transport("connection refused".into())));
        let result = client.list_keys().await;
        assert_eq!(result, Err(PortalError::Transport("connection refused".into())));
    }

    #[tokio::test]
    async fn test_non_json_success_is_decode_error() {
        let (transport, client) = setup();
        transport.push(Ok(PortalResponse {
            status: 200,
            body: "OK".into(),
        }));
        let result = client.list_users().await;
        assert!(matches!(result, Err(PortalError::Decode(_))));
    }

    #[tokio::test]
    async fn test_list_servers_sends_only_defined_filters() {
        let (transport, client) = setup();
        transport.push_json(200, json!({"count": 0, "limit": 10, "offset": 0, "result": []}));
        let filters = ServerListFilters {
            hostname: Some("web-1".into()),
            limit: Some(10),
            ..Default::default()
        };
        client.list_servers(&filters).await.unwrap();

        let request = transport.last_request();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.path, "admin/api/servers");
        assert_eq!(request.query, pairs(&[("hostname", "web-1"), ("limit", "10")]));
        assert_eq!(request.form, None);
    }

    #[tokio::test]
    async fn test_register_host_uses_form_body() {
        let (transport, client) = setup();
        transport.push_json(200, json!({"server_id": "srv-9"}));
        let response = client.register_host("reg-key", Some("web-9")).await.unwrap();
        assert_eq!(response.server_id, "srv-9");

        let request = transport.last_request();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "admin/api/register");
        assert_eq!(
            request.form,
            Some(pairs(&[("key", "reg-key"), ("hostname", "web-9")]))
        );
        assert!(request.query.is_empty());
    }

    #[tokio::test]
    async fn test_unregister_host_requires_a_selector() {
        let (transport, client) = setup();
        let selector = HostSelector {
            hostname: Some(String::new()),
            ..Default::default()
        };
        let result = client.unregister_host(&selector).await;
        assert!(matches!(result, Err(PortalError::Validation(_))));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unregister_host_uses_query_params() {
        let (transport, client) = setup();
        let selector = HostSelector {
            ip: Some("10.0.0.1".into()),
            server_id: Some("srv-1".into()),
            ..Default::default()
        };
        let response = client.unregister_host(&selector).await.unwrap();
        assert_eq!(response.result, 1);

        let request = transport.last_request();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "admin/api/delete_server");
        assert_eq!(request.query, pairs(&[("ip", "10.0.0.1"), ("server_id", "srv-1")]));
        assert_eq!(request.form, None);
    }

    #[tokio::test]
    async fn test_bulk_unregister_rejects_zero_age() {
        let (transport, client) = setup();
        let result = client.bulk_unregister_hosts(0).await;
        assert!(matches!(result, Err(PortalError::Validation(_))));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_create_feed_form_fields() {
        let (transport, client) = setup();
        transport.push_json(
            200,
            json!({"result": {"name": "qa", "auto": true, "deploy_after": 24}}),
        );
        let feed = FeedUpsert {
            name: "qa".into(),
            auto: Some(true),
            deploy_after: Some(24),
        };
        let response = client.create_or_modify_feed(&feed).await.unwrap();
        assert_eq!(response["result"]["deploy_after"], 24);

        let request = transport.last_request();
        assert_eq!(request.path, "admin/api/feeds/");
        assert_eq!(
            request.form,
            Some(pairs(&[("name", "qa"), ("auto", "true"), ("deploy_after", "24")]))
        );
    }

    #[tokio::test]
    async fn test_delete_feed_encodes_path_segment() {
        let (transport, client) = setup();
        client.delete_feed("qa team").await.unwrap();
        let request = transport.last_request();
        assert_eq!(request.method, Method::DELETE);
        assert_eq!(request.path, "admin/api/feeds/qa%20team");
    }

    #[tokio::test]
    async fn test_create_key_omits_unset_fields() {
        let (transport, client) = setup();
        transport.push_json(
            200,
            json!({"result": {"key": "generated", "feed": "main", "note": null, "server_limit": 0}}),
        );
        let response = client
            .create_or_modify_key(&KeyUpsert {
                note: Some("lab".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(response["result"]["key"], "generated");
        let result = response["result"].as_object().unwrap();
        assert_eq!(result.get("note"), Some(&Value::Null));
        assert_eq!(transport.last_request().form, Some(pairs(&[("note", "lab")])));
    }

    #[tokio::test]
    async fn test_manage_patchsets_repeats_feed() {
        let (transport, client) = setup();
        transport.push_json(200, json!({"result": "ok"}));
        let options = PatchsetManageOptions {
            patchset: "K20240101_01".into(),
            feeds: vec!["a".into(), "b".into()],
            action: PatchsetAction::EnableUpto,
            product: Some(Product::Kernel),
        };
        client.manage_patchsets(&options).await.unwrap();

        let request = transport.last_request();
        assert_eq!(request.path, "admin/api/patchsets/manage");
        assert_eq!(
            request.query,
            pairs(&[
                ("patchset", "K20240101_01"),
                ("feed", "a"),
                ("feed", "b"),
                ("action", "enable-upto"),
                ("product", "kernel"),
            ])
        );
    }

    #[tokio::test]
    async fn test_set_tags_without_tags_clears() {
        let (transport, client) = setup();
        transport.push_json(200, json!({"result": "success"}));
        client.set_tags("srv-1", None).await.unwrap();
        assert_eq!(transport.last_request().query, pairs(&[("server_id", "srv-1")]));
    }

    #[tokio::test]
    async fn test_list_body_is_returned_untouched() {
        let (transport, client) = setup();
        let body = json!({
            "count": 1,
            "result": [{"id": "srv-1", "kcare_version": null, "uptime": 12345.6, "rack": "b7"}]
        });
        transport.push_json(200, body.clone());
        let response = client.list_servers(&ServerListFilters::default()).await.unwrap();
        assert_eq!(response, body);
    }

    #[tokio::test]
    async fn test_register_host_accepts_numeric_server_id() {
        let (transport, client) = setup();
        transport.push_json(200, json!({"server_id": 4711}));
        let response = client.register_host("reg-key", None).await.unwrap();
        assert_eq!(response.server_id, "4711");
    }

    #[tokio::test]
    async fn test_acknowledged_calls_ignore_success_body() {
        let (transport, client) = setup();
        let options = PatchsetManageOptions {
            patchset: "K20240101_01".into(),
            feeds: vec!["main".into()],
            action: PatchsetAction::Enable,
            product: None,
        };

        transport.push_json(200, json!({"status": "ok"}));
        assert_eq!(client.manage_patchsets(&options).await, Ok(()));

        transport.push_json(200, json!({}));
        assert_eq!(client.set_tags("srv-1", Some("a;b")).await, Ok(()));

        transport.push(Ok(PortalResponse {
            status: 204,
            body: String::new(),
        }));
        assert_eq!(client.set_tags("srv-1", None).await, Ok(()));
    }

    #[tokio::test]
    async fn test_acknowledged_calls_still_classify_errors() {
        let (transport, client) = setup();
        transport.push_json(200, json!({"error": "Unknown server"}));
        assert_eq!(
            client.set_tags("srv-404", None).await,
            Err(PortalError::RemoteApi("Unknown server".into()))
        );

        transport.push_json(401, json!({}));
        assert_eq!(
            client.set_tags("srv-1", None).await,
            Err(PortalError::Authentication)
        );
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééé", 2), "éé…");
    }
}
