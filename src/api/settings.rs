//! Generation settings API ("save as automation default").

use super::{AppError, DashboardAppState};
use crate::store::{load_settings, save_settings, validate_patch, GenerationSettings, SettingsKind, SettingsSource};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Serialize, Debug)]
pub struct SettingsResponse {
    pub kind: SettingsKind,
    pub source: SettingsSource,
    pub settings: GenerationSettings,
}

pub fn create_settings_router(state: DashboardAppState) -> Router {
    Router::new()
        .route("/api/settings/:kind", get(get_settings).put(put_settings))
        .with_state(Arc::new(state))
}

fn parse_kind(kind: &str) -> Result<SettingsKind, AppError> {
    kind.parse().map_err(AppError::NotFound)
}

/// GET /api/settings/:kind - resolved settings, defaults filled in
async fn get_settings(
    State(state): State<Arc<DashboardAppState>>,
    headers: HeaderMap,
    Path(kind): Path<String>,
) -> Result<Json<SettingsResponse>, AppError> {
    let owner = state.authorize(&headers)?;
    let kind = parse_kind(&kind)?;

    debug!(owner = %owner, kind = %kind, "Reading settings");

    let resolved = load_settings(&state.documents, &owner, kind)?;
    Ok(Json(SettingsResponse {
        kind,
        source: resolved.source,
        settings: resolved.settings,
    }))
}

/// PUT /api/settings/:kind - merge the given fields into the saved settings
async fn put_settings(
    State(state): State<Arc<DashboardAppState>>,
    headers: HeaderMap,
    Path(kind): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<SettingsResponse>, AppError> {
    let owner = state.authorize(&headers)?;
    let kind = parse_kind(&kind)?;

    let Value::Object(patch) = body else {
        return Err(AppError::BadRequest("Settings body must be a JSON object".to_string()));
    };
    validate_patch(kind, &patch).map_err(AppError::BadRequest)?;

    let settings = save_settings(&state.documents, &owner, kind, &patch)?;

    info!(owner = %owner, kind = %kind, fields = patch.len(), "Settings saved");

    Ok(Json(SettingsResponse {
        kind,
        source: SettingsSource::Saved,
        settings,
    }))
}
