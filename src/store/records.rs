//! Audit records of generated and published content.

use super::DocumentStore;
use crate::error::StoreError;
use crate::generation::ContentKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Provider-reported engagement. Starts at zero; refreshing it is outside this
/// service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub impressions: u64,
    pub likes: u64,
    pub shares: u64,
    pub replies: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRecord {
    /// Provider-assigned id, or a generated id for unpublished drafts
    pub content_id: String,
    pub kind: ContentKind,
    pub content: String,
    pub generation_params: Value,
    pub metrics: Metrics,
    pub created_at: DateTime<Utc>,
}

impl PublishRecord {
    pub fn new(content_id: String, kind: ContentKind, content: String, generation_params: Value) -> Self {
        Self {
            content_id,
            kind,
            content,
            generation_params,
            metrics: Metrics::default(),
            created_at: Utc::now(),
        }
    }
}

/// Collection each kind of record is written to
pub fn collection_for(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::FacebookPost => "facebookPosts",
        ContentKind::Tweet => "tweets",
        ContentKind::BlogDraft => "blogPosts",
    }
}

/// Sink for audit records
pub trait PublishLog: Send + Sync {
    fn record(&self, owner: &str, record: &PublishRecord) -> Result<(), StoreError>;
}

impl PublishLog for DocumentStore {
    fn record(&self, owner: &str, record: &PublishRecord) -> Result<(), StoreError> {
        let body = serde_json::to_value(record)?;
        self.set(owner, collection_for(record.kind), &record.content_id, &body)
    }
}

/// Read back an owner's records of one kind, newest first. Documents that no
/// longer parse as records are skipped.
pub fn list_records(
    store: &DocumentStore,
    owner: &str,
    kind: ContentKind,
) -> Result<Vec<PublishRecord>, StoreError> {
    let records = store
        .list(owner, collection_for(kind))?
        .into_iter()
        .filter_map(|doc| match serde_json::from_value::<PublishRecord>(doc.body) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(doc_id = %doc.id, error = %e, "Skipping unreadable publish record");
                None
            }
        })
        .collect();
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_written_to_kind_collection() {
        let store = DocumentStore::new(":memory:").unwrap();
        let record = PublishRecord::new(
            "pub_789".to_string(),
            ContentKind::FacebookPost,
            "Hello page".to_string(),
            json!({"topic": "AI"}),
        );

        store.record("owner-1", &record).unwrap();

        let raw = store.get("owner-1", "facebookPosts", "pub_789").unwrap().unwrap();
        assert_eq!(raw["contentId"], "pub_789");
        assert_eq!(raw["generationParams"]["topic"], "AI");
        assert_eq!(raw["metrics"]["likes"], 0);

        let listed = list_records(&store, "owner-1", ContentKind::FacebookPost).unwrap();
        assert_eq!(listed, vec![record]);
        assert!(list_records(&store, "owner-1", ContentKind::Tweet).unwrap().is_empty());
    }

    #[test]
    fn test_unreadable_records_are_skipped() {
        let store = DocumentStore::new(":memory:").unwrap();
        store.set("owner-1", "tweets", "bad", &json!({"unexpected": true})).unwrap();
        store
            .record(
                "owner-1",
                &PublishRecord::new("t1".to_string(), ContentKind::Tweet, "hi".to_string(), json!({})),
            )
            .unwrap();

        let listed = list_records(&store, "owner-1", ContentKind::Tweet).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].content_id, "t1");
    }
}
