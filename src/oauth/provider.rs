//! Facebook OAuth provider configuration.

use crate::config::FacebookConfig;
use crate::error::ConfigError;

/// Path of the callback route, appended to the public base URL
pub const CALLBACK_PATH: &str = "/api/auth/facebook/callback";

/// Permissions needed to publish to a Page and read its engagement
pub const SCOPES: &[&str] = &["pages_manage_posts", "pages_read_engagement"];

/// Resolved Facebook app configuration
#[derive(Clone, Debug)]
pub struct FacebookProvider {
    pub app_id: String,
    pub app_secret: String,
    /// Base URL of the consent dialog host
    pub dialog_url: String,
    /// Base URL of the Graph API
    pub graph_url: String,
    pub api_version: String,
    /// Redirect URI registered with the app. Sent unchanged in both the consent
    /// request and the code exchange.
    pub redirect_uri: String,
}

impl FacebookProvider {
    /// Resolve the provider from configuration.
    ///
    /// Fails if the app id or secret is missing.
    pub fn from_config(config: &FacebookConfig, public_base_url: &str) -> Result<Self, ConfigError> {
        let app_id = non_blank(config.app_id.as_deref())
            .ok_or(ConfigError::Missing("facebook.app_id (QUILL_FACEBOOK_APP_ID)"))?;
        let app_secret = non_blank(config.app_secret.as_deref())
            .ok_or(ConfigError::Missing("facebook.app_secret (QUILL_FACEBOOK_APP_SECRET)"))?;

        Ok(Self {
            app_id: app_id.to_string(),
            app_secret: app_secret.to_string(),
            dialog_url: config.dialog_url.trim_end_matches('/').to_string(),
            graph_url: config.graph_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            redirect_uri: format!("{}{}", public_base_url.trim_end_matches('/'), CALLBACK_PATH),
        })
    }

    /// Build the consent dialog URL for a given state value
    pub fn build_auth_url(&self, state: &str) -> String {
        let scopes = SCOPES.join(",");
        format!(
            "{}/{}/dialog/oauth?client_id={}&redirect_uri={}&scope={}&response_type=code&state={}",
            self.dialog_url,
            self.api_version,
            urlencoding::encode(&self.app_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&scopes),
            urlencoding::encode(state)
        )
    }

    /// Versioned Graph API URL for a path such as `oauth/access_token`
    pub fn graph_endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.graph_url, self.api_version, path)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
