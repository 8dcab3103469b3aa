//! Cron trigger endpoint for the external scheduler.

use crate::auth::verify_bearer;
use crate::automation::{Job, ScheduledPublisher};
use crate::error::JobError;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared state for the cron API
#[derive(Clone)]
pub struct CronAppState {
    pub publisher: Arc<ScheduledPublisher>,
    /// Shared secret the scheduler presents. None = every request is rejected.
    pub cron_secret: Option<String>,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
struct CronResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    post_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl CronResponse {
    fn failure(status: StatusCode, error: impl Into<String>) -> Response {
        let body = CronResponse {
            success: false,
            post_id: None,
            message: None,
            error: Some(error.into()),
        };
        (status, Json(body)).into_response()
    }
}

pub fn create_cron_router(state: CronAppState) -> Router {
    Router::new()
        .route("/api/cron/:job", get(run_job))
        .with_state(Arc::new(state))
}

/// GET /api/cron/:job
///
/// Runs one scheduled job. Requires `Authorization: Bearer <cron_secret>`.
async fn run_job(
    State(state): State<Arc<CronAppState>>,
    headers: HeaderMap,
    Path(job_name): Path<String>,
) -> Response {
    let Some(secret) = state.cron_secret.as_deref() else {
        error!(job = %job_name, "Cron request rejected: cron secret is not configured");
        return CronResponse::failure(StatusCode::UNAUTHORIZED, "Unauthorized");
    };

    if let Err(e) = verify_bearer(&headers, secret) {
        warn!(job = %job_name, error = %e, "Cron request rejected");
        return CronResponse::failure(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    let job: Job = match job_name.parse() {
        Ok(job) => job,
        Err(msg) => return CronResponse::failure(StatusCode::NOT_FOUND, msg),
    };

    info!(job = %job, "Cron job triggered");

    match state.publisher.run(job).await {
        Ok(outcome) => {
            let body = CronResponse {
                success: true,
                post_id: Some(outcome.post_id),
                message: Some(outcome.message),
                error: None,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            let status = status_for(&e);
            warn!(job = %job, status = %status, error = %e, "Cron job failed");
            CronResponse::failure(status, e.to_string())
        }
    }
}

fn status_for(error: &JobError) -> StatusCode {
    match error {
        JobError::Config(_) | JobError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        JobError::NotConnected(_) => StatusCode::CONFLICT,
        JobError::Generation(_) | JobError::Publish(_) => StatusCode::BAD_GATEWAY,
    }
}
