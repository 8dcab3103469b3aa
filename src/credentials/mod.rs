//! Encrypted storage for connected-account credentials.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       CredentialStore                    │
//! │  - one row per (owner, resource type)    │
//! │  - upsert, last write wins               │
//! └─────────────────────────────────────────┘
//!          ↓ seal               ↑ open
//! ┌─────────────────────────────────────────┐
//! │       TokenCipher (AES-256-GCM)          │
//! └─────────────────────────────────────────┘
//!          ↓                    ↑
//! ┌─────────────────────────────────────────┐
//! │       SQLite                             │
//! └─────────────────────────────────────────┘
//! ```
//!
//! The connect callback is the only writer for Facebook Pages; the
//! connections API writes directly-supplied X tokens. Scheduled jobs only read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

mod encryption;
mod storage;

pub use encryption::{SealedToken, TokenCipher};
pub use storage::CredentialStore;

/// Kind of third-party resource a credential authorizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// A Facebook Page, via a page access token
    Facebook,
    /// An X (Twitter) account, via an OAuth 2.0 user token
    X,
}

impl ResourceType {
    pub const ALL: [ResourceType; 2] = [ResourceType::Facebook, ResourceType::X];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Facebook => "facebook",
            ResourceType::X => "x",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "facebook" => Ok(ResourceType::Facebook),
            "x" | "twitter" => Ok(ResourceType::X),
            other => Err(format!("Unknown resource type '{}'", other)),
        }
    }
}

/// Durable authorization to act for a user against one third-party resource.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCredential {
    pub owner_user_id: String,
    /// Provider identifier of the resource (e.g. page id)
    pub resource_id: String,
    /// Display name reported by the provider, if any
    pub resource_name: Option<String>,
    /// Resource-scoped access token. Never logged.
    pub access_token: String,
    pub obtained_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl fmt::Debug for ResourceCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCredential")
            .field("owner_user_id", &self.owner_user_id)
            .field("resource_id", &self.resource_id)
            .field("resource_name", &self.resource_name)
            .field("access_token", &"<redacted>")
            .field("obtained_at", &self.obtained_at)
            .field("last_modified", &self.last_modified)
            .finish()
    }
}
