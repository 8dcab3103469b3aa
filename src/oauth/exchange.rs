//! OAuth token exchange logic.
//!
//! Drives the Facebook connect chain as an explicit state machine:
//!
//! ```text
//! AwaitingCode ─► ShortLivedToken ─► LongLivedToken ─► ResourceCredentialObtained
//!       │                │                 │
//!       └────────────────┴─────────────────┴──► Err(OAuthError)
//! ```
//!
//! Each transition is a single Graph API call. Nothing is retried: an
//! authorization code is single-use, so a failed chain can only be restarted
//! from the consent screen.

use super::provider::FacebookProvider;
use crate::credentials::ResourceCredential;
use crate::error::{ExchangeStep, OAuthError};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use tracing::debug;

/// An access token returned by one of the exchange steps
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub expires_in: Option<i64>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Position in the exchange chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeState {
    AwaitingCode { code: String },
    ShortLivedToken(AccessToken),
    LongLivedToken(AccessToken),
    ResourceCredentialObtained(ResourceCredential),
}

/// Graph API error payload: `{"error": {"message": ..., "type": ..., "code": ...}}`
#[derive(Deserialize, Debug)]
pub(crate) struct GraphErrorEnvelope {
    pub error: GraphError,
}

#[derive(Deserialize, Debug)]
pub(crate) struct GraphError {
    pub message: String,
}

/// Token endpoint response
#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// `/me/accounts` response
#[derive(Deserialize, Debug)]
struct AccountsResponse {
    #[serde(default)]
    data: Vec<PageAccount>,
}

#[derive(Deserialize, Debug)]
struct PageAccount {
    id: String,
    #[serde(default)]
    name: Option<String>,
    access_token: String,
}

/// Client for the three Graph API calls of the connect flow
#[derive(Clone)]
pub struct ExchangeClient {
    provider: FacebookProvider,
    http_client: reqwest::Client,
}

impl ExchangeClient {
    pub fn new(provider: FacebookProvider, http_client: reqwest::Client) -> Self {
        Self {
            provider,
            http_client,
        }
    }

    pub fn provider(&self) -> &FacebookProvider {
        &self.provider
    }

    /// Exchange the authorization code for a short-lived user token.
    ///
    /// `redirect_uri` must be byte-identical to the one sent to the consent
    /// dialog or the provider rejects the exchange.
    pub async fn exchange_code_for_short_lived_token(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<AccessToken, OAuthError> {
        let url = self.provider.graph_endpoint("oauth/access_token");
        let response: TokenResponse = self
            .get_json(
                ExchangeStep::ShortLivedToken,
                &url,
                &[
                    ("client_id", self.provider.app_id.as_str()),
                    ("client_secret", self.provider.app_secret.as_str()),
                    ("redirect_uri", redirect_uri),
                    ("code", code),
                ],
            )
            .await?;

        Ok(AccessToken {
            value: response.access_token,
            expires_in: response.expires_in,
        })
    }

    /// Trade a short-lived user token for a long-lived one.
    pub async fn exchange_for_long_lived_token(
        &self,
        short_lived: &AccessToken,
    ) -> Result<AccessToken, OAuthError> {
        let url = self.provider.graph_endpoint("oauth/access_token");
        let response: TokenResponse = self
            .get_json(
                ExchangeStep::LongLivedToken,
                &url,
                &[
                    ("grant_type", "fb_exchange_token"),
                    ("client_id", self.provider.app_id.as_str()),
                    ("client_secret", self.provider.app_secret.as_str()),
                    ("fb_exchange_token", short_lived.value.as_str()),
                ],
            )
            .await?;

        Ok(AccessToken {
            value: response.access_token,
            expires_in: response.expires_in,
        })
    }

    /// List the Pages the user manages and take the first one.
    ///
    /// Selection is positional so the outcome is deterministic for a given
    /// provider response.
    pub async fn resolve_resource_credential(
        &self,
        owner_user_id: &str,
        long_lived: &AccessToken,
    ) -> Result<ResourceCredential, OAuthError> {
        let url = self.provider.graph_endpoint("me/accounts");
        let response: AccountsResponse = self
            .get_json(
                ExchangeStep::ResourceListing,
                &url,
                &[("access_token", long_lived.value.as_str())],
            )
            .await?;

        let page_count = response.data.len();
        let page = response
            .data
            .into_iter()
            .next()
            .ok_or(OAuthError::NoResources)?;

        debug!(page_id = %page.id, page_count, "Selected first managed page");

        let now = Utc::now();
        Ok(ResourceCredential {
            owner_user_id: owner_user_id.to_string(),
            resource_id: page.id,
            resource_name: page.name,
            access_token: page.access_token,
            obtained_at: now,
            last_modified: now,
        })
    }

    /// Perform one transition of the exchange chain
    pub async fn advance(
        &self,
        owner_user_id: &str,
        state: ExchangeState,
    ) -> Result<ExchangeState, OAuthError> {
        match state {
            ExchangeState::AwaitingCode { code } => {
                let redirect_uri = self.provider.redirect_uri.as_str();
                let token = self
                    .exchange_code_for_short_lived_token(&code, redirect_uri)
                    .await?;
                Ok(ExchangeState::ShortLivedToken(token))
            }
            ExchangeState::ShortLivedToken(token) => {
                let token = self.exchange_for_long_lived_token(&token).await?;
                Ok(ExchangeState::LongLivedToken(token))
            }
            ExchangeState::LongLivedToken(token) => {
                let credential = self
                    .resolve_resource_credential(owner_user_id, &token)
                    .await?;
                Ok(ExchangeState::ResourceCredentialObtained(credential))
            }
            done @ ExchangeState::ResourceCredentialObtained(_) => Ok(done),
        }
    }

    /// Run the whole chain from an authorization code to a page credential
    pub async fn run(
        &self,
        owner_user_id: &str,
        code: &str,
    ) -> Result<ResourceCredential, OAuthError> {
        let mut state = ExchangeState::AwaitingCode {
            code: code.to_string(),
        };

        loop {
            state = self.advance(owner_user_id, state).await?;
            if let ExchangeState::ResourceCredentialObtained(credential) = state {
                return Ok(credential);
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        step: ExchangeStep,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, OAuthError> {
        debug!(step = %step, url = %url, "Calling Graph API");

        let response = self
            .http_client
            .get(url)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await
            .map_err(|e| OAuthError::Transport {
                step,
                message: e.without_url().to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| OAuthError::Transport {
            step,
            message: e.without_url().to_string(),
        })?;

        if let Ok(envelope) = serde_json::from_str::<GraphErrorEnvelope>(&body) {
            return Err(OAuthError::Exchange {
                step,
                message: envelope.error.message,
            });
        }

        if !status.is_success() {
            return Err(OAuthError::Exchange {
                step,
                message: format!("status {}: {}", status, body),
            });
        }

        serde_json::from_str(&body).map_err(|e| OAuthError::InvalidResponse {
            step,
            message: e.to_string(),
        })
    }
}
