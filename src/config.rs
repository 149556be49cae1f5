//! ePortal MCP configuration: deserialization, env resolution and validation.

use std::path::Path;

use reqwest::Url;
use serde::Deserialize;

use crate::auth::{AuthConfig, AuthKind};
use crate::error::PortalError;

/// Strip an env var reference to its variable name.
///
/// Accepts `${VAR_NAME}` syntax only. Returns `None` if the value is not a
/// valid env-var reference.
pub fn parse_env_ref(value: &str) -> Option<&str> {
    value.strip_prefix("${").and_then(|s| s.strip_suffix('}'))
}

/// Resolve a secret that may be written as a `${VAR}` reference.
///
/// Literal values pass through unchanged. Unknown variables resolve to the
/// empty string, which auth validation then rejects.
pub fn resolve_secret(value: &str) -> String {
    match parse_env_ref(value) {
        Some(var_name) => std::env::var(var_name).unwrap_or_default(),
        None => value.to_string(),
    }
}

/// Top-level configuration, parsed from JSON or TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct PortalConfig {
    pub eportal_url: String,
    pub auth: AuthSection,
}

/// The `auth` section as written in config files (snake_case keys).
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSection {
    #[serde(rename = "type")]
    pub kind: AuthKind,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
    pub header_name: Option<String>,
}

impl PortalConfig {
    /// Read a config file. `.json` files are parsed as JSON, everything else as TOML.
    ///
    /// Secret references are resolved and the result is validated before returning.
    pub async fn load(path: &Path) -> crate::Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            PortalError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let mut config: PortalConfig = if is_json {
            serde_json::from_str(&content).map_err(|e| {
                PortalError::Configuration(format!("failed to parse {}: {}", path.display(), e))
            })?
        } else {
            toml::from_str(&content).map_err(|e| {
                PortalError::Configuration(format!("failed to parse {}: {}", path.display(), e))
            })?
        };

        config.resolve_secrets();
        config.validate()?;
        Ok(config)
    }

    /// Replace `${VAR}` references in `password` and `api_key` with their values.
    pub fn resolve_secrets(&mut self) {
        for secret in [&mut self.auth.password, &mut self.auth.api_key]
            .into_iter()
            .flatten()
        {
            *secret = resolve_secret(secret);
        }
    }

    /// Validate the config, failing fast before any client is constructed.
    pub fn validate(&self) -> crate::Result<()> {
        self.base_url()?;
        self.auth_config().validate()
    }

    /// Parse `eportal_url` and normalize it to end with a trailing slash.
    pub fn base_url(&self) -> crate::Result<Url> {
        normalize_base_url(&self.eportal_url)
    }

    /// Map the config-file auth section into the Auth Provider's shape.
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            kind: self.auth.kind,
            username: self.auth.username.clone(),
            password: self.auth.password.clone(),
            api_key: self.auth.api_key.clone(),
            header_name: self.auth.header_name.clone(),
        }
    }
}

/// Parse an absolute http(s) URL and ensure its path ends with `/`.
///
/// Request paths are joined relative to this URL, so a missing slash would
/// drop the last path segment of a portal hosted under a prefix.
pub fn normalize_base_url(raw: &str) -> crate::Result<Url> {
    let mut url = Url::parse(raw).map_err(|e| {
        PortalError::Configuration(format!("eportal_url '{}' is not a valid URL: {}", raw, e))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(PortalError::Configuration(format!(
            "eportal_url '{}' must use http or https",
            raw
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse_toml(toml_str: &str) -> PortalConfig {
        toml::from_str(toml_str).expect("valid TOML")
    }

    #[test]
    fn test_parse_env_ref() {
        assert_eq!(parse_env_ref("${FOO}"), Some("FOO"));
        assert_eq!(parse_env_ref("${EPORTAL_API_KEY}"), Some("EPORTAL_API_KEY"));
        assert_eq!(parse_env_ref("$FOO"), None);
        assert_eq!(parse_env_ref("literal"), None);
        assert_eq!(parse_env_ref("${"), None);
    }

    #[test]
    fn test_resolve_secret() {
        // SAFETY: test-only, no concurrent threads depend on this env var.
        unsafe { std::env::set_var("EPORTAL_TEST_SECRET", "hunter2") };
        assert_eq!(resolve_secret("${EPORTAL_TEST_SECRET}"), "hunter2");
        assert_eq!(resolve_secret("plain"), "plain");
        assert_eq!(resolve_secret("${EPORTAL_TEST_SECRET_UNSET}"), "");
        // SAFETY: test-only cleanup.
        unsafe { std::env::remove_var("EPORTAL_TEST_SECRET") };
    }

    #[test]
    fn test_valid_basic_config() {
        let config = parse_toml(
            r#"
            eportal_url = "https://eportal.example.com"

            [auth]
            type = "basic"
            username = "admin"
            password = "pw"
            "#,
        );
        assert!(config.validate().is_ok());
        assert_eq!(config.auth_config().kind, AuthKind::Basic);
    }

    #[test]
    fn test_api_key_section_maps_to_auth_config() {
        let config: PortalConfig = serde_json::from_str(
            r#"{
                "eportal_url": "https://eportal.example.com",
                "auth": {"type": "api_key", "api_key": "k", "header_name": "X-Custom"}
            }"#,
        )
        .unwrap();
        let auth = config.auth_config();
        assert_eq!(auth.api_key.as_deref(), Some("k"));
        assert_eq!(auth.header_name.as_deref(), Some("X-Custom"));
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let config = parse_toml(
            r#"
            eportal_url = "https://eportal.example.com"

            [auth]
            type = "basic"
            username = "admin"
            "#,
        );
        assert!(matches!(
            config.validate(),
            Err(PortalError::Configuration(msg)) if msg.contains("password")
        ));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let config = parse_toml(
            r#"
            eportal_url = "not a url"

            [auth]
            type = "api_key"
            api_key = "k"
            "#,
        );
        assert!(matches!(
            config.validate(),
            Err(PortalError::Configuration(msg)) if msg.contains("not a valid URL")
        ));
    }

    #[test]
    fn test_non_http_scheme_rejected() {
        assert!(matches!(
            normalize_base_url("ftp://eportal.example.com"),
            Err(PortalError::Configuration(_))
        ));
    }

    #[test]
    fn test_base_url_gains_trailing_slash() {
        let url = normalize_base_url("https://eportal.example.com/portal").unwrap();
        assert_eq!(url.as_str(), "https://eportal.example.com/portal/");
        let url = normalize_base_url("https://eportal.example.com/portal/").unwrap();
        assert_eq!(url.as_str(), "https://eportal.example.com/portal/");
        let url = normalize_base_url("http://10.0.0.5:8080").unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.5:8080/");
    }

    #[tokio::test]
    async fn test_load_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"eportal_url": "https://eportal.example.com", "auth": {{"type": "basic", "username": "u", "password": "p"}}}}"#
        )
        .unwrap();
        let config = PortalConfig::load(file.path()).await.unwrap();
        assert_eq!(config.eportal_url, "https://eportal.example.com");
    }

    #[tokio::test]
    async fn test_load_toml_resolves_secret_reference() {
        // SAFETY: test-only, no concurrent threads depend on this env var.
        unsafe { std::env::set_var("EPORTAL_TEST_LOAD_KEY", "from-env") };
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            "eportal_url = \"https://eportal.example.com\"\n\n[auth]\ntype = \"api_key\"\napi_key = \"${{EPORTAL_TEST_LOAD_KEY}}\"\n"
        )
        .unwrap();
        let config = PortalConfig::load(file.path()).await.unwrap();
        assert_eq!(config.auth.api_key.as_deref(), Some("from-env"));
        // SAFETY: test-only cleanup.
        unsafe { std::env::remove_var("EPORTAL_TEST_LOAD_KEY") };
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = PortalConfig::load(Path::new("/nonexistent/eportal.toml")).await;
        assert!(matches!(
            result,
            Err(PortalError::Configuration(msg)) if msg.contains("failed to read")
        ));
    }
}
