// HTTP APIs: Facebook connect flow, cron trigger and the dashboard JSON APIs

mod error;
pub mod connect;
pub mod connections;
pub mod cron;
pub mod posts;
pub mod settings;

pub use connect::{create_connect_router, ConnectAppState, STATE_COOKIE};
pub use connections::create_connections_router;
pub use cron::{create_cron_router, CronAppState};
pub use posts::create_posts_router;
pub use settings::create_settings_router;

use crate::auth::verify_bearer;
use crate::config::AutomationConfig;
use crate::credentials::CredentialStore;
use crate::store::DocumentStore;
use axum::http::HeaderMap;
use error::AppError;
use std::sync::Arc;

/// Shared state for the settings, connections and posts APIs.
///
/// The dashboard is single-user: every request acts for the configured
/// automation owner.
#[derive(Clone)]
pub struct DashboardAppState {
    pub documents: Arc<DocumentStore>,
    pub credential_store: Arc<CredentialStore>,
    pub automation: AutomationConfig,
    /// Required bearer token. None = unrestricted (dev mode).
    pub api_token: Option<String>,
}

impl DashboardAppState {
    /// Check the API token (if one is configured) and resolve the owner.
    fn authorize(&self, headers: &HeaderMap) -> Result<String, AppError> {
        if let Some(expected) = &self.api_token {
            verify_bearer(headers, expected)?;
        }
        Ok(self.automation.owner()?.to_string())
    }
}
