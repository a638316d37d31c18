use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TriageError};

pub const DEFAULT_ENDPOINT_URL: &str = "http://localhost:54321/functions/v1/health-chat";
pub const DEFAULT_MAX_PENDING_BYTES: usize = 64 * 1024; // cap on a held partial payload

/// Top-level config (triage.toml + TRIAGE_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriageConfig {
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

/// Where chat exchanges are POSTed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_endpoint_url")]
    pub url: String,
    /// Sent as `Authorization: Bearer <api_key>`. Omitted when unset.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: default_endpoint_url(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Largest undecodable payload the decoder holds while waiting for its
    /// continuation. Larger fragments are dropped.
    #[serde(default = "default_max_pending_bytes")]
    pub max_pending_bytes: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_pending_bytes: DEFAULT_MAX_PENDING_BYTES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Show the medical disclaimer while the conversation is empty.
    #[serde(default = "bool_true")]
    pub show_disclaimer: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_disclaimer: true,
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_endpoint_url() -> String {
    DEFAULT_ENDPOINT_URL.to_string()
}
fn default_max_pending_bytes() -> usize {
    DEFAULT_MAX_PENDING_BYTES
}

impl TriageConfig {
    /// Load config from a TOML file with TRIAGE_* env var overrides.
    ///
    /// Nested keys use a double underscore: `TRIAGE_ENDPOINT__API_KEY`.
    /// A missing file is not an error; defaults fill every field.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: TriageConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("TRIAGE_").split("__"))
            .extract()
            .map_err(|e| TriageError::Config(e.to_string()))?;

        config.validate()?;
        tracing::debug!(path = %path, url = %config.endpoint.url, "config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.endpoint.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(TriageError::InvalidEndpoint {
                url: self.endpoint.url.clone(),
            });
        }
        if self.stream.max_pending_bytes == 0 {
            return Err(TriageError::Config(
                "stream.max_pending_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.triage/triage.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_when_file_missing() {
        Jail::expect_with(|_jail| {
            let config = TriageConfig::load(Some("does-not-exist.toml")).expect("load");
            assert_eq!(config.endpoint.url, DEFAULT_ENDPOINT_URL);
            assert!(config.endpoint.api_key.is_none());
            assert_eq!(config.stream.max_pending_bytes, DEFAULT_MAX_PENDING_BYTES);
            assert!(config.ui.show_disclaimer);
            Ok(())
        });
    }

    #[test]
    fn file_values_are_read() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "triage.toml",
                r#"
                [endpoint]
                url = "https://demo.supabase.co/functions/v1/health-chat"
                api_key = "anon-key"

                [ui]
                show_disclaimer = false
                "#,
            )?;
            let config = TriageConfig::load(Some("triage.toml")).expect("load");
            assert_eq!(
                config.endpoint.url,
                "https://demo.supabase.co/functions/v1/health-chat"
            );
            assert_eq!(config.endpoint.api_key.as_deref(), Some("anon-key"));
            assert!(!config.ui.show_disclaimer);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("triage.toml", "[endpoint]\napi_key = \"from-file\"\n")?;
            jail.set_env("TRIAGE_ENDPOINT__API_KEY", "from-env");
            jail.set_env("TRIAGE_STREAM__MAX_PENDING_BYTES", "1024");
            let config = TriageConfig::load(Some("triage.toml")).expect("load");
            assert_eq!(config.endpoint.api_key.as_deref(), Some("from-env"));
            assert_eq!(config.stream.max_pending_bytes, 1024);
            Ok(())
        });
    }

    #[test]
    fn non_http_url_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("triage.toml", "[endpoint]\nurl = \"ftp://example.com\"\n")?;
            let err = TriageConfig::load(Some("triage.toml")).unwrap_err();
            assert!(matches!(err, TriageError::InvalidEndpoint { .. }));
            Ok(())
        });
    }
}
