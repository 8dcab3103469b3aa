//! Content Generation Service seam.
//!
//! The service is an external collaborator: structured request in, validated
//! text out. [`LlmClient`] talks to an OpenAI-compatible chat completions
//! endpoint; tests substitute their own [`ContentGenerator`].

mod llm;

pub use llm::LlmClient;

use crate::error::GenerationError;
use crate::store::GenerationSettings;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of content a job produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentKind {
    FacebookPost,
    Tweet,
    BlogDraft,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::FacebookPost => "facebook",
            ContentKind::Tweet => "tweet",
            ContentKind::BlogDraft => "blog",
        }
    }

    /// JSON field the generated text is returned in
    pub fn output_field(&self) -> &'static str {
        match self {
            ContentKind::FacebookPost => "post",
            ContentKind::Tweet => "tweet",
            ContentKind::BlogDraft => "draft",
        }
    }

    /// Upper bound on generated length, in characters
    pub fn max_chars(&self) -> Option<usize> {
        match self {
            ContentKind::Tweet => Some(280),
            _ => None,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "facebook" => Ok(ContentKind::FacebookPost),
            "tweet" => Ok(ContentKind::Tweet),
            "blog" => Ok(ContentKind::BlogDraft),
            other => Err(format!("Unknown content kind '{}'", other)),
        }
    }
}

/// A generation request: what to write and with which settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRequest {
    pub kind: ContentKind,
    pub settings: GenerationSettings,
}

/// Validated generator output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedContent {
    pub text: String,
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, request: &ContentRequest) -> Result<GeneratedContent, GenerationError>;
}
