use crate::error::ConfigError;
use serde::Deserialize;
use std::time::Duration;

/// Complete Quill configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuillConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub facebook: FacebookConfig,
    #[serde(default)]
    pub x: XConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub automation: AutomationConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public base URL of the site. The OAuth redirect URI is derived from it
    /// and must match the one registered with the provider exactly.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

fn default_port() -> u16 {
    9002
}

fn default_public_base_url() -> String {
    "http://localhost:9002".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            public_base_url: default_public_base_url(),
        }
    }
}

/// Facebook app credentials and Graph API endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct FacebookConfig {
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
    #[serde(default = "default_graph_url")]
    pub graph_url: String,
    #[serde(default = "default_dialog_url")]
    pub dialog_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

fn default_graph_url() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_dialog_url() -> String {
    "https://www.facebook.com".to_string()
}

fn default_api_version() -> String {
    "v20.0".to_string()
}

impl Default for FacebookConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            app_secret: None,
            graph_url: default_graph_url(),
            dialog_url: default_dialog_url(),
            api_version: default_api_version(),
        }
    }
}

/// X (Twitter) API endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct XConfig {
    #[serde(default = "default_x_api_url")]
    pub api_url: String,
}

fn default_x_api_url() -> String {
    "https://api.twitter.com".to_string()
}

impl Default for XConfig {
    fn default() -> Self {
        Self {
            api_url: default_x_api_url(),
        }
    }
}

/// Content Generation Service (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub api_key: Option<String>,
}

fn default_generation_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_generation_base_url(),
            model: default_model(),
            api_key: None,
        }
    }
}

/// Scheduled publishing configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AutomationConfig {
    /// User whose settings and connections the scheduled jobs use
    pub owner_user_id: Option<String>,
    /// Shared secret the external scheduler presents as a bearer token
    pub cron_secret: Option<String>,
}

impl AutomationConfig {
    /// Returns the designated owner, failing if unset or blank.
    pub fn owner(&self) -> Result<&str, ConfigError> {
        match self.owner_user_id.as_deref().map(str::trim) {
            Some(owner) if !owner.is_empty() => Ok(owner),
            _ => Err(ConfigError::Missing("automation.owner_user_id (QUILL_OWNER_USER_ID)")),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Base64-encoded 32-byte key for encrypting access tokens at rest
    pub encryption_key: Option<String>,
}

fn default_database_path() -> String {
    "quill.db".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            encryption_key: None,
        }
    }
}

/// OAuth state configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    #[serde(default = "default_state_ttl")]
    pub state_ttl_seconds: i64,
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
}

fn default_state_ttl() -> i64 {
    600
}

fn default_cleanup_interval() -> u64 {
    60
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            state_ttl_seconds: default_state_ttl(),
            cleanup_interval_seconds: default_cleanup_interval(),
        }
    }
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_timeout() -> u64 {
    15
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Builds the shared outbound client. Every provider call is bounded by the
    /// configured timeout.
    pub fn build_client(&self) -> Result<reqwest::Client, ConfigError> {
        reqwest::Client::builder()
            .timeout(self.timeout())
            .user_agent("quill/0.1")
            .build()
            .map_err(|e| ConfigError::Invalid {
                key: "http",
                message: e.to_string(),
            })
    }
}

/// JSON API configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    /// Bearer token for the settings/connections/posts APIs. None = unrestricted (dev mode).
    pub token: Option<String>,
}

impl QuillConfig {
    /// Overlay environment variables on top of file/default values.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(v) = std::env::var("QUILL_PORT") {
            self.server.port = v.parse().map_err(|_| ConfigError::Invalid {
                key: "QUILL_PORT",
                message: format!("'{}' is not a valid port number", v),
            })?;
        }
        if let Ok(v) = std::env::var("QUILL_PUBLIC_BASE_URL") {
            self.server.public_base_url = v;
        }
        if let Ok(v) = std::env::var("QUILL_FACEBOOK_APP_ID") {
            self.facebook.app_id = Some(v);
        }
        if let Ok(v) = std::env::var("QUILL_FACEBOOK_APP_SECRET") {
            self.facebook.app_secret = Some(v);
        }
        if let Ok(v) = std::env::var("QUILL_LLM_API_KEY") {
            self.generation.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("QUILL_OWNER_USER_ID") {
            self.automation.owner_user_id = Some(v);
        }
        if let Ok(v) = std::env::var("QUILL_CRON_SECRET") {
            self.automation.cron_secret = Some(v);
        }
        if let Ok(v) = std::env::var("QUILL_DATABASE") {
            self.storage.database_path = v;
        }
        if let Ok(v) = std::env::var("QUILL_ENCRYPTION_KEY") {
            self.storage.encryption_key = Some(v);
        }
        if let Ok(v) = std::env::var("QUILL_API_TOKEN") {
            self.api.token = Some(v);
        }

        // The redirect URI is built by appending a path; a trailing slash would
        // produce a different string than the one registered with the provider.
        let trimmed = self.server.public_base_url.trim_end_matches('/').len();
        self.server.public_base_url.truncate(trimmed);

        self.validate()
    }

    /// Reject durations the runtime cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oauth.state_ttl_seconds <= 0 {
            return Err(ConfigError::Invalid {
                key: "oauth.state_ttl_seconds",
                message: format!("must be positive, got {}", self.oauth.state_ttl_seconds),
            });
        }
        if self.oauth.cleanup_interval_seconds == 0 {
            return Err(ConfigError::Invalid {
                key: "oauth.cleanup_interval_seconds",
                message: "must be at least 1".to_string(),
            });
        }
        if self.http.timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                key: "http.timeout_seconds",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &str) -> Result<QuillConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: QuillConfig = toml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = QuillConfig::default();
        assert_eq!(config.server.port, 9002);
        assert_eq!(config.server.public_base_url, "http://localhost:9002");
        assert_eq!(config.facebook.api_version, "v20.0");
        assert_eq!(config.oauth.state_ttl_seconds, 600);
        assert_eq!(config.http.timeout_seconds, 15);
        assert!(config.automation.owner_user_id.is_none());
        assert!(config.api.token.is_none());
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [server]
            port = 8080
            public_base_url = "https://quill.example.com"

            [facebook]
            app_id = "1234"
            app_secret = "shh"

            [automation]
            owner_user_id = "uid-1"
            cron_secret = "cron"

            [oauth]
            state_ttl_seconds = 300

            [http]
            timeout_seconds = 30
        "#;

        let config: QuillConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.facebook.app_id.as_deref(), Some("1234"));
        assert_eq!(config.facebook.graph_url, "https://graph.facebook.com");
        assert_eq!(config.automation.owner().unwrap(), "uid-1");
        assert_eq!(config.oauth.state_ttl_seconds, 300);
        assert_eq!(config.oauth.cleanup_interval_seconds, 60);
        assert_eq!(config.http.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_config() {
        let toml = r#"
            [generation]
            model = "local-model"
        "#;

        let config: QuillConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.generation.model, "local-model");
        assert_eq!(config.generation.base_url, "https://api.openai.com/v1");
        assert_eq!(config.storage.database_path, "quill.db"); // Default
    }

    #[test]
    fn test_owner_missing_or_blank() {
        let mut automation = AutomationConfig::default();
        assert!(matches!(automation.owner(), Err(ConfigError::Missing(_))));

        automation.owner_user_id = Some("   ".to_string());
        assert!(matches!(automation.owner(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_zero_and_negative_durations_rejected() {
        assert!(QuillConfig::default().validate().is_ok());

        let cases = [
            ("[oauth]\ncleanup_interval_seconds = 0", "oauth.cleanup_interval_seconds"),
            ("[oauth]\nstate_ttl_seconds = -5", "oauth.state_ttl_seconds"),
            ("[oauth]\nstate_ttl_seconds = 0", "oauth.state_ttl_seconds"),
            ("[http]\ntimeout_seconds = 0", "http.timeout_seconds"),
        ];
        for (toml, expected_key) in cases {
            let config: QuillConfig = toml::from_str(toml).unwrap();
            match config.validate() {
                Err(ConfigError::Invalid { key, .. }) => assert_eq!(key, expected_key),
                other => panic!("{}: expected Invalid, got {:?}", expected_key, other),
            }
        }
    }

    #[test]
    fn test_load_config_rejects_zero_cleanup_interval() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quill.toml");
        std::fs::write(&path, "[oauth]\ncleanup_interval_seconds = 0\n").unwrap();

        let result = load_config(path.to_str().unwrap());
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                key: "oauth.cleanup_interval_seconds",
                ..
            })
        ));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("/nonexistent/quill.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
