//! Scheduled publish orchestrator.
//!
//! Invoked by an external scheduler through `GET /api/cron/:job`. One run is
//! one linear pipeline for the configured owner:
//!
//! ```text
//! owner ─► settings (or defaults) ─► credential ─► generate ─► publish ─► audit
//! ```
//!
//! Any failure stops the run. The audit write is spawned after a successful
//! publish and never awaited.

use crate::config::AutomationConfig;
use crate::credentials::{CredentialStore, ResourceCredential, ResourceType};
use crate::error::{ConfigError, JobError};
use crate::generation::{ContentGenerator, ContentKind, ContentRequest};
use crate::publish::Publisher;
use crate::store::{load_settings, DocumentStore, PublishLog, PublishRecord, SettingsKind, SettingsSource};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;


/// A scheduled job, addressed by its cron path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Job {
    FacebookPost,
    Tweet,
    BlogDraft,
}

impl Job {
    pub fn as_str(&self) -> &'static str {
        match self {
            Job::FacebookPost => "post-facebook",
            Job::Tweet => "post-tweet",
            Job::BlogDraft => "post-blog",
        }
    }

    pub fn content_kind(&self) -> ContentKind {
        match self {
            Job::FacebookPost => ContentKind::FacebookPost,
            Job::Tweet => ContentKind::Tweet,
            Job::BlogDraft => ContentKind::BlogDraft,
        }
    }

    /// Facebook posts reuse the blog topic and requirements
    pub fn settings_kind(&self) -> SettingsKind {
        match self {
            Job::FacebookPost | Job::BlogDraft => SettingsKind::Blog,
            Job::Tweet => SettingsKind::Tweet,
        }
    }

    /// Resource the job publishes to; `None` for draft-only jobs
    pub fn resource_type(&self) -> Option<ResourceType> {
        match self {
            Job::FacebookPost => Some(ResourceType::Facebook),
            Job::Tweet => Some(ResourceType::X),
            Job::BlogDraft => None,
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Job {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post-facebook" => Ok(Job::FacebookPost),
            "post-tweet" => Ok(Job::Tweet),
            "post-blog" => Ok(Job::BlogDraft),
            other => Err(format!("Unknown job '{}'", other)),
        }
    }
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutcome {
    /// Provider post id, or the draft id for unpublished jobs
    pub post_id: String,
    pub message: String,
    #[serde(skip)]
    pub content: String,
}

/// Runs scheduled jobs for the configured automation owner
pub struct ScheduledPublisher {
    config: AutomationConfig,
    documents: Arc<DocumentStore>,
    credentials: Arc<CredentialStore>,
    generator: Arc<dyn ContentGenerator>,
    publishers: HashMap<ResourceType, Arc<dyn Publisher>>,
    log: Arc<dyn PublishLog>,
}

impl ScheduledPublisher {
    pub fn new(
        config: AutomationConfig,
        documents: Arc<DocumentStore>,
        credentials: Arc<CredentialStore>,
        generator: Arc<dyn ContentGenerator>,
        log: Arc<dyn PublishLog>,
    ) -> Self {
        Self {
            config,
            documents,
            credentials,
            generator,
            publishers: HashMap::new(),
            log,
        }
    }

    /// Register the publish client for one resource type
    pub fn with_publisher(mut self, resource_type: ResourceType, publisher: Arc<dyn Publisher>) -> Self {
        self.publishers.insert(resource_type, publisher);
        self
    }

    pub async fn run(&self, job: Job) -> Result<JobOutcome, JobError> {
        let owner = self.config.owner()?.to_string();
        debug!(job = %job, owner = %owner, "Scheduled job started");

        let resolved = load_settings(&self.documents, &owner, job.settings_kind())?;
        if resolved.source == SettingsSource::Default {
            info!(job = %job, owner = %owner, "No saved settings, using defaults");
        }

        let target = match job.resource_type() {
            Some(resource_type) => Some(self.target_for(&owner, resource_type)?),
            None => None,
        };

        let request = ContentRequest {
            kind: job.content_kind(),
            settings: resolved.settings,
        };
        let generated = self.generator.generate(&request).await.map_err(|e| {
            error!(job = %job, error = %e, "Content generation failed");
            e
        })?;

        let (post_id, message) = match target {
            Some((publisher, credential)) => {
                let post_id = publisher
                    .publish(&credential, &generated.text)
                    .await
                    .map_err(|e| {
                        error!(job = %job, resource_id = %credential.resource_id, error = %e, "Publish failed");
                        e
                    })?;
                let message = match job {
                    Job::Tweet => "Successfully posted tweet".to_string(),
                    _ => "Successfully posted to Facebook Page".to_string(),
                };
                (post_id, message)
            }
            None => (Uuid::now_v7().to_string(), "Blog draft generated".to_string()),
        };

        info!(job = %job, owner = %owner, post_id = %post_id, "Scheduled job completed");

        let record = PublishRecord::new(
            post_id.clone(),
            request.kind,
            generated.text.clone(),
            request.settings.to_params(),
        );
        self.spawn_audit(owner, record);

        Ok(JobOutcome {
            post_id,
            message,
            content: generated.text,
        })
    }

    fn target_for(
        &self,
        owner: &str,
        resource_type: ResourceType,
    ) -> Result<(Arc<dyn Publisher>, ResourceCredential), JobError> {
        let publisher = self.publishers.get(&resource_type).cloned().ok_or_else(|| {
            ConfigError::Missing(match resource_type {
                ResourceType::Facebook => "facebook publisher",
                ResourceType::X => "x publisher",
            })
        })?;

        let credential = self.credentials.load(owner, resource_type)?.ok_or_else(|| {
            warn!(owner = %owner, resource_type = %resource_type, "No connected account for scheduled job");
            JobError::NotConnected(resource_type)
        })?;

        Ok((publisher, credential))
    }

    fn spawn_audit(&self, owner: String, record: PublishRecord) {
        let log = Arc::clone(&self.log);
        tokio::task::spawn_blocking(move || {
            if let Err(e) = log.record(&owner, &record) {
                warn!(
                    owner = %owner,
                    post_id = %record.content_id,
                    error = %e,
                    "Failed to write publish record"
                );
            }
        });
    }
}
