//! OpenAI-compatible chat completions client.

use super::{ContentGenerator, ContentKind, ContentRequest, GeneratedContent};
use crate::config::GenerationConfig;
use crate::error::GenerationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Generates content through a chat completions endpoint with JSON output
pub struct LlmClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    http_client: reqwest::Client,
}

impl LlmClient {
    pub fn from_config(
        config: &GenerationConfig,
        http_client: reqwest::Client,
    ) -> Result<Self, GenerationError> {
        if config.base_url.trim().is_empty() {
            return Err(GenerationError::NotConfigured("generation.base_url is empty".to_string()));
        }
        if config.model.trim().is_empty() {
            return Err(GenerationError::NotConfigured("generation.model is empty".to_string()));
        }

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            http_client,
        })
    }
}

#[async_trait]
impl ContentGenerator for LlmClient {
    async fn generate(&self, request: &ContentRequest) -> Result<GeneratedContent, GenerationError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt(request.kind),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt(request),
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        debug!(kind = %request.kind, model = %self.model, "Requesting generated content");

        let mut builder = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.without_url().to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::Transport(e.without_url().to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("status {}: {}", status, text));
            return Err(GenerationError::Provider(message));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| GenerationError::InvalidOutput(format!("unreadable completion: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationError::InvalidOutput("completion has no content".to_string()))?;

        extract_output(request.kind, &content).map(|text| GeneratedContent { text })
    }
}

fn system_prompt(kind: ContentKind) -> String {
    let role = match kind {
        ContentKind::FacebookPost => "You are an expert social media manager. Write a short, engaging Facebook post.",
        ContentKind::Tweet => "You are an expert social media manager. Write a single tweet of at most 280 characters.",
        ContentKind::BlogDraft => "You are an experienced technical writer. Write a complete blog post draft in Markdown.",
    };
    format!(
        "{} The text must read naturally and meet advertising-network content policies. \
         Respond only with a JSON object of the form {{\"{}\": string}}.",
        role,
        kind.output_field()
    )
}

/// Render the settings as "Field: value" lines
fn user_prompt(request: &ContentRequest) -> String {
    let params = request.settings.to_params();
    let mut lines = Vec::new();
    if let Value::Object(map) = params {
        for (key, value) in map {
            let value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            lines.push(format!("{}: {}", capitalize(&key), value));
        }
    }
    lines.join("\n")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Validate the model output against the expected `{"<field>": string}` shape
fn extract_output(kind: ContentKind, content: &str) -> Result<String, GenerationError> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| GenerationError::InvalidOutput(format!("output is not JSON: {}", e)))?;

    let field = kind.output_field();
    let text = value
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GenerationError::InvalidOutput(format!("missing non-empty '{}' field", field)))?;

    if let Some(max) = kind.max_chars() {
        let count = text.chars().count();
        if count > max {
            return Err(GenerationError::InvalidOutput(format!(
                "{} is {} characters, limit is {}",
                kind, count, max
            )));
        }
    }

    Ok(text.to_string())
}
