use super::Publisher;
use crate::config::XConfig;
use crate::credentials::ResourceCredential;
use crate::error::PublishError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Serialize)]
struct CreateTweet<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct CreateTweetResponse {
    data: Option<TweetData>,
    #[serde(default)]
    errors: Vec<ApiError>,
    detail: Option<String>,
}

#[derive(Deserialize)]
struct TweetData {
    id: String,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

/// Posts tweets through the X API v2
pub struct XPublisher {
    api_url: String,
    http_client: reqwest::Client,
}

impl XPublisher {
    pub fn new(config: &XConfig, http_client: reqwest::Client) -> Self {
        Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            http_client,
        }
    }
}

#[async_trait]
impl Publisher for XPublisher {
    async fn publish(&self, credential: &ResourceCredential, text: &str) -> Result<String, PublishError> {
        debug!(account = %credential.resource_id, "Posting tweet");

        let response = self
            .http_client
            .post(format!("{}/2/tweets", self.api_url))
            .bearer_auth(&credential.access_token)
            .json(&CreateTweet { text })
            .send()
            .await
            .map_err(|e| PublishError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PublishError::Transport(e.without_url().to_string()))?;

        let parsed = match serde_json::from_str::<CreateTweetResponse>(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(PublishError::Provider(format!("status {}: {}", status, body)));
            }
            Err(e) => return Err(PublishError::Provider(format!("unreadable response: {}", e))),
        };

        if let Some(data) = parsed.data.filter(|_| status.is_success()) {
            return Ok(data.id);
        }

        let message = parsed
            .errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; ");
        let message = match (message.is_empty(), parsed.detail) {
            (false, _) => message,
            (true, Some(detail)) => detail,
            (true, None) => format!("status {}", status),
        };
        Err(PublishError::Provider(message))
    }
}
