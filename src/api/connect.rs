//! Facebook Page connect endpoints.
//!
//! Both endpoints are browser navigations, so every outcome is a redirect.
//! The callback always lands the user back on the post generator page with
//! either `?success=true` or `?error=<message>`.

use crate::config::AutomationConfig;
use crate::credentials::{CredentialStore, ResourceCredential, ResourceType};
use crate::oauth::{ExchangeClient, StateStore};
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Cookie binding the pending CSRF state to the browser session
pub const STATE_COOKIE: &str = "quill_oauth_state";

const COOKIE_PATH: &str = "/api/auth/facebook";

/// Page the callback sends the user back to
const RESULT_PAGE: &str = "/facebook-post-generator";

/// Shared state for the connect flow
#[derive(Clone)]
pub struct ConnectAppState {
    pub state_store: StateStore,
    /// None when the Facebook app id or secret is not configured
    pub exchange: Option<ExchangeClient>,
    pub credential_store: Arc<CredentialStore>,
    pub automation: AutomationConfig,
    pub public_base_url: String,
}

/// OAuth callback query parameters
#[derive(Deserialize)]
pub struct OAuthCallback {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

pub fn create_connect_router(state: ConnectAppState) -> Router {
    Router::new()
        .route("/api/auth/facebook/connect", get(connect))
        .route("/api/auth/facebook/callback", get(callback))
        .with_state(Arc::new(state))
}

/// GET /api/auth/facebook/connect
///
/// Issues a CSRF state, stores it in a short-lived HttpOnly cookie and
/// redirects to the Facebook consent dialog.
async fn connect(State(state): State<Arc<ConnectAppState>>) -> Response {
    let Some(exchange) = &state.exchange else {
        error!("Facebook connect requested but the app id/secret are not configured");
        return result_redirect(
            &state.public_base_url,
            Err("Facebook app is not configured".to_string()),
        )
        .into_response();
    };

    let issued = state.state_store.issue();
    let auth_url = exchange.provider().build_auth_url(&issued.value);
    let cookie = format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path={}; Max-Age={}",
        STATE_COOKIE,
        issued.value,
        COOKIE_PATH,
        state.state_store.ttl().num_seconds()
    );

    info!("Redirecting to Facebook consent dialog");

    (
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Redirect::temporary(&auth_url),
    )
        .into_response()
}

/// GET /api/auth/facebook/callback
///
/// Validates and consumes the CSRF state, runs the token exchange chain and
/// stores the resulting page credential. The state cookie is cleared on every
/// outcome.
async fn callback(
    State(state): State<Arc<ConnectAppState>>,
    headers: HeaderMap,
    Query(callback): Query<OAuthCallback>,
) -> Response {
    let cookie_state = read_cookie(&headers, STATE_COOKIE);
    let outcome = complete_connect(&state, cookie_state.as_deref(), callback).await;

    let clear_cookie = format!(
        "{}=; HttpOnly; Secure; SameSite=Lax; Path={}; Max-Age=0",
        STATE_COOKIE, COOKIE_PATH
    );

    (
        AppendHeaders([(header::SET_COOKIE, clear_cookie)]),
        result_redirect(&state.public_base_url, outcome.map(|_| ())),
    )
        .into_response()
}

async fn complete_connect(
    state: &ConnectAppState,
    cookie_state: Option<&str>,
    callback: OAuthCallback,
) -> Result<ResourceCredential, String> {
    if let Some(error) = callback.error {
        let description = callback.error_description.unwrap_or_else(|| error.clone());
        warn!(error = %error, description = %description, "Facebook authorization was not granted");
        return Err(description);
    }

    let received_state = callback
        .state
        .ok_or_else(|| "Invalid state: missing state parameter".to_string())?;

    state
        .state_store
        .validate_and_consume(cookie_state, &received_state)
        .map_err(|e| {
            warn!(error = %e, "OAuth state validation failed");
            e.to_string()
        })?;

    debug!("CSRF state validated");

    let code = callback
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| "Missing authorization code".to_string())?;

    let exchange = state.exchange.as_ref().ok_or_else(|| {
        error!("Facebook callback received but the app id/secret are not configured");
        "Facebook app is not configured".to_string()
    })?;

    let owner = state.automation.owner().map_err(|e| {
        error!(error = %e, "Cannot store Facebook connection without an owner");
        e.to_string()
    })?;

    let credential = exchange.run(owner, &code).await.map_err(|e| {
        error!(error = %e, "Facebook token exchange failed");
        e.to_string()
    })?;

    state
        .credential_store
        .save(owner, ResourceType::Facebook, &credential)
        .map_err(|e| {
            error!(owner = %owner, error = %e, "Failed to store page credential");
            "Failed to store credentials".to_string()
        })?;

    info!(
        owner = %owner,
        page_id = %credential.resource_id,
        "Facebook Page connected"
    );

    Ok(credential)
}

fn result_redirect(public_base_url: &str, outcome: Result<(), String>) -> Redirect {
    let location = match outcome {
        Ok(()) => format!("{}{}?success=true", public_base_url, RESULT_PAGE),
        Err(message) => format!(
            "{}{}?error={}",
            public_base_url,
            RESULT_PAGE,
            urlencoding::encode(&message)
        ),
    };
    Redirect::to(&location)
}

/// Find a cookie value across all `Cookie` headers
fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}
