//! Document storage for settings and publish records.

mod documents;
pub mod records;
pub mod settings;

pub use documents::{Document, DocumentStore};
pub use records::{list_records, Metrics, PublishLog, PublishRecord};
pub use settings::{
    load_settings, save_settings, validate_patch, BlogSettings, GenerationSettings,
    ResolvedSettings, SettingsKind, SettingsSource, TweetSettings,
};
