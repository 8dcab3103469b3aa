//! Per-user generation settings ("save as automation default").
//!
//! Settings documents are loosely typed JSON. Each field is validated on read
//! and falls back to its default when absent, blank or of the wrong type; a
//! missing document resolves to the full default record.

use super::DocumentStore;
use crate::error::StoreError;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

pub const SETTINGS_COLLECTION: &str = "settings";

const DEFAULT_BLOG_TOPIC: &str = "The impact of AI on modern software development.";
const DEFAULT_BLOG_REQUIREMENTS: &str =
    "Write in a professional, informative tone. Target audience is software developers.";

const DEFAULT_TWEET_NICHE: &str = "Tech & AI";
const DEFAULT_TWEET_TOPIC: &str = "An interesting and little-known fact about Artificial Intelligence.";
const DEFAULT_TWEET_STYLE: &str = "Friendly";
const DEFAULT_TWEET_TONE: &str = "Informative";
const DEFAULT_TWEET_KEYWORDS: &str = "#AI, #TechFact";

/// Which settings document a job reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingsKind {
    Blog,
    Tweet,
}

impl SettingsKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingsKind::Blog => "blog",
            SettingsKind::Tweet => "tweet",
        }
    }

    fn string_fields(&self) -> &'static [&'static str] {
        match self {
            SettingsKind::Blog => &["topic", "requirements"],
            SettingsKind::Tweet => &["niche", "topic", "style", "tone", "keywords"],
        }
    }

    fn bool_fields(&self) -> &'static [&'static str] {
        match self {
            SettingsKind::Blog => &[],
            SettingsKind::Tweet => &["viral"],
        }
    }
}

impl fmt::Display for SettingsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingsKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blog" => Ok(SettingsKind::Blog),
            "tweet" => Ok(SettingsKind::Tweet),
            other => Err(format!("Unknown settings kind '{}'", other)),
        }
    }
}

/// Topic and requirements for blog drafts and Facebook posts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlogSettings {
    pub topic: String,
    pub requirements: String,
}

impl Default for BlogSettings {
    fn default() -> Self {
        Self {
            topic: DEFAULT_BLOG_TOPIC.to_string(),
            requirements: DEFAULT_BLOG_REQUIREMENTS.to_string(),
        }
    }
}

impl BlogSettings {
    fn from_document(doc: &Value) -> Self {
        let defaults = Self::default();
        Self {
            topic: string_field(doc, "topic").unwrap_or(defaults.topic),
            requirements: string_field(doc, "requirements").unwrap_or(defaults.requirements),
        }
    }
}

/// Parameters for tweet generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TweetSettings {
    pub niche: String,
    pub topic: String,
    pub style: String,
    pub tone: String,
    pub viral: bool,
    pub keywords: String,
}

impl Default for TweetSettings {
    fn default() -> Self {
        Self {
            niche: DEFAULT_TWEET_NICHE.to_string(),
            topic: DEFAULT_TWEET_TOPIC.to_string(),
            style: DEFAULT_TWEET_STYLE.to_string(),
            tone: DEFAULT_TWEET_TONE.to_string(),
            viral: true,
            keywords: DEFAULT_TWEET_KEYWORDS.to_string(),
        }
    }
}

impl TweetSettings {
    fn from_document(doc: &Value) -> Self {
        let defaults = Self::default();
        Self {
            niche: string_field(doc, "niche").unwrap_or(defaults.niche),
            topic: string_field(doc, "topic").unwrap_or(defaults.topic),
            style: string_field(doc, "style").unwrap_or(defaults.style),
            tone: string_field(doc, "tone").unwrap_or(defaults.tone),
            viral: doc.get("viral").and_then(Value::as_bool).unwrap_or(defaults.viral),
            keywords: string_field(doc, "keywords").unwrap_or(defaults.keywords),
        }
    }
}

/// Validated settings for one kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum GenerationSettings {
    Blog(BlogSettings),
    Tweet(TweetSettings),
}

impl GenerationSettings {
    pub fn default_for(kind: SettingsKind) -> Self {
        match kind {
            SettingsKind::Blog => GenerationSettings::Blog(BlogSettings::default()),
            SettingsKind::Tweet => GenerationSettings::Tweet(TweetSettings::default()),
        }
    }

    pub fn from_document(kind: SettingsKind, doc: &Value) -> Self {
        match kind {
            SettingsKind::Blog => GenerationSettings::Blog(BlogSettings::from_document(doc)),
            SettingsKind::Tweet => GenerationSettings::Tweet(TweetSettings::from_document(doc)),
        }
    }

    pub fn kind(&self) -> SettingsKind {
        match self {
            GenerationSettings::Blog(_) => SettingsKind::Blog,
            GenerationSettings::Tweet(_) => SettingsKind::Tweet,
        }
    }

    /// Flat JSON form, stored as `generationParams` on publish records
    pub fn to_params(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Where resolved settings came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingsSource {
    Saved,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSettings {
    pub settings: GenerationSettings,
    pub source: SettingsSource,
}

/// Load an owner's settings, falling back to the default record.
pub fn load_settings(
    store: &DocumentStore,
    owner: &str,
    kind: SettingsKind,
) -> Result<ResolvedSettings, StoreError> {
    let resolved = match store.get(owner, SETTINGS_COLLECTION, kind.as_str())? {
        Some(doc) => ResolvedSettings {
            settings: GenerationSettings::from_document(kind, &doc),
            source: SettingsSource::Saved,
        },
        None => ResolvedSettings {
            settings: GenerationSettings::default_for(kind),
            source: SettingsSource::Default,
        },
    };
    Ok(resolved)
}

/// Check that a settings patch only names known fields with the right types.
pub fn validate_patch(kind: SettingsKind, patch: &Map<String, Value>) -> Result<(), String> {
    for (key, value) in patch {
        if kind.string_fields().contains(&key.as_str()) {
            if !value.is_string() {
                return Err(format!("Field '{}' must be a string", key));
            }
        } else if kind.bool_fields().contains(&key.as_str()) {
            if !value.is_boolean() {
                return Err(format!("Field '{}' must be a boolean", key));
            }
        } else {
            return Err(format!("Unknown field '{}' for {} settings", key, kind));
        }
    }
    Ok(())
}

/// Merge a validated patch into the owner's settings document and return the
/// resolved result.
pub fn save_settings(
    store: &DocumentStore,
    owner: &str,
    kind: SettingsKind,
    patch: &Map<String, Value>,
) -> Result<GenerationSettings, StoreError> {
    let mut patch = patch.clone();
    patch.insert("userId".to_string(), Value::String(owner.to_string()));
    patch.insert("lastModified".to_string(), Value::String(Utc::now().to_rfc3339()));

    let merged = store.merge(owner, SETTINGS_COLLECTION, kind.as_str(), &patch)?;
    Ok(GenerationSettings::from_document(kind, &merged))
}

fn string_field(doc: &Value, key: &str) -> Option<String> {
    doc.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
