use super::Publisher;
use crate::config::FacebookConfig;
use crate::credentials::ResourceCredential;
use crate::error::PublishError;
use crate::oauth::GraphErrorEnvelope;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Serialize)]
struct FeedPost<'a> {
    message: &'a str,
    access_token: &'a str,
}

#[derive(Deserialize)]
struct FeedPostResponse {
    id: String,
}

/// Posts to a Facebook Page feed through the Graph API
pub struct GraphPublisher {
    graph_url: String,
    api_version: String,
    http_client: reqwest::Client,
}

impl GraphPublisher {
    pub fn new(config: &FacebookConfig, http_client: reqwest::Client) -> Self {
        Self {
            graph_url: config.graph_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            http_client,
        }
    }
}

#[async_trait]
impl Publisher for GraphPublisher {
    async fn publish(&self, credential: &ResourceCredential, text: &str) -> Result<String, PublishError> {
        let url = format!(
            "{}/{}/{}/feed",
            self.graph_url, self.api_version, credential.resource_id
        );
        debug!(page_id = %credential.resource_id, "Posting to page feed");

        let response = self
            .http_client
            .post(&url)
            .json(&FeedPost {
                message: text,
                access_token: &credential.access_token,
            })
            .send()
            .await
            .map_err(|e| PublishError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PublishError::Transport(e.without_url().to_string()))?;

        if let Ok(envelope) = serde_json::from_str::<GraphErrorEnvelope>(&body) {
            return Err(PublishError::Provider(envelope.error.message));
        }
        if !status.is_success() {
            return Err(PublishError::Provider(format!("status {}: {}", status, body)));
        }

        let posted: FeedPostResponse = serde_json::from_str(&body)
            .map_err(|e| PublishError::Provider(format!("unreadable response: {}", e)))?;
        Ok(posted.id)
    }
}
