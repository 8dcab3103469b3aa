//! Error taxonomy shared by the connect flow, the stores and the scheduled jobs.
//!
//! Every error here is terminal for the invocation that produced it. Nothing in
//! the crate retries; re-running is up to the user (connect) or the external
//! scheduler (cron).

use crate::credentials::ResourceType;
use std::fmt;

/// CSRF state validation failures. All messages start with "Invalid state" so
/// the UI can match on them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CsrfError {
    #[error("Invalid state: no pending authorization request for this session")]
    MissingState,
    #[error("Invalid state: state parameter does not match this session")]
    Mismatch,
    #[error("Invalid state: authorization request expired")]
    Expired,
}

/// Step of the token exchange chain that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeStep {
    ShortLivedToken,
    LongLivedToken,
    ResourceListing,
}

impl fmt::Display for ExchangeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeStep::ShortLivedToken => write!(f, "code exchange"),
            ExchangeStep::LongLivedToken => write!(f, "long-lived token exchange"),
            ExchangeStep::ResourceListing => write!(f, "page listing"),
        }
    }
}

/// OAuth exchange chain failures. Provider messages are carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OAuthError {
    #[error("{step} failed: {message}")]
    Exchange { step: ExchangeStep, message: String },
    #[error("{step} returned an unreadable response: {message}")]
    InvalidResponse { step: ExchangeStep, message: String },
    #[error("{step} request failed: {message}")]
    Transport { step: ExchangeStep, message: String },
    #[error("No Facebook Pages are managed by this account")]
    NoResources,
}

/// Persistence failures from the credential and document stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("encryption error: {0}")]
    Encryption(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Failures while posting content to a provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    #[error("provider rejected the post: {0}")]
    Provider(String),
    #[error("request to provider failed: {0}")]
    Transport(String),
}

/// Failures from the Content Generation Service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("content generation is not configured: {0}")]
    NotConfigured(String),
    #[error("generation provider error: {0}")]
    Provider(String),
    #[error("generation request failed: {0}")]
    Transport(String),
    #[error("generated output did not match the expected shape: {0}")]
    InvalidOutput(String),
}

/// Missing or invalid configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not configured")]
    Missing(&'static str),
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Scheduled job failures, in the order the orchestrator can hit them.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0} account is not connected")]
    NotConnected(ResourceType),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}
