use super::{AppError, DashboardAppState};
use crate::generation::ContentKind;
use crate::store::{list_records, PublishRecord};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Serialize)]
pub struct ListPostsResponse {
    pub posts: Vec<PublishRecord>,
}

pub fn create_posts_router(state: DashboardAppState) -> Router {
    Router::new()
        .route("/api/posts/:kind", get(list_posts))
        .with_state(Arc::new(state))
}

/// GET /api/posts/:kind - audit records of generated content, newest first
async fn list_posts(
    State(state): State<Arc<DashboardAppState>>,
    headers: HeaderMap,
    Path(kind): Path<String>,
) -> Result<Json<ListPostsResponse>, AppError> {
    let owner = state.authorize(&headers)?;
    let kind: ContentKind = kind.parse().map_err(AppError::NotFound)?;

    debug!(owner = %owner, kind = %kind, "Listing publish records");

    let posts = list_records(&state.documents, &owner, kind)?;
    Ok(Json(ListPostsResponse { posts }))
}
