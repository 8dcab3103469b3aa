//! Connection status API.
//!
//! Facebook Pages are connected through the OAuth flow; X accounts are
//! connected by storing a user access token directly.

use super::{AppError, DashboardAppState};
use crate::credentials::{ResourceCredential, ResourceType};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Connection status for one resource type
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSummary {
    pub resource: ResourceType,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl ConnectionSummary {
    fn from_credential(resource: ResourceType, credential: Option<ResourceCredential>) -> Self {
        match credential {
            Some(c) => Self {
                resource,
                connected: true,
                resource_id: Some(c.resource_id),
                resource_name: c.resource_name,
                last_modified: Some(c.last_modified),
            },
            None => Self {
                resource,
                connected: false,
                resource_id: None,
                resource_name: None,
                last_modified: None,
            },
        }
    }
}

#[derive(Serialize)]
pub struct ListConnectionsResponse {
    pub connections: Vec<ConnectionSummary>,
}

/// Request body for POST /api/connections/:resource/token
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub token: String,
    /// Account identifier, e.g. the X handle
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub resource_name: Option<String>,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

pub fn create_connections_router(state: DashboardAppState) -> Router {
    Router::new()
        .route("/api/connections", get(list_connections))
        .route("/api/connections/:resource/token", post(store_token))
        .route("/api/connections/:resource", delete(delete_connection))
        .with_state(Arc::new(state))
}

fn parse_resource(resource: &str) -> Result<ResourceType, AppError> {
    resource.parse().map_err(AppError::NotFound)
}

/// GET /api/connections - status of every supported resource type
async fn list_connections(
    State(state): State<Arc<DashboardAppState>>,
    headers: HeaderMap,
) -> Result<Json<ListConnectionsResponse>, AppError> {
    let owner = state.authorize(&headers)?;
    debug!(owner = %owner, "Listing connections");

    let mut connections = Vec::with_capacity(ResourceType::ALL.len());
    for resource in ResourceType::ALL {
        let credential = state.credential_store.load(&owner, resource)?;
        connections.push(ConnectionSummary::from_credential(resource, credential));
    }

    Ok(Json(ListConnectionsResponse { connections }))
}

/// POST /api/connections/:resource/token - store a user token directly
async fn store_token(
    State(state): State<Arc<DashboardAppState>>,
    headers: HeaderMap,
    Path(resource): Path<String>,
    Json(body): Json<TokenRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let owner = state.authorize(&headers)?;
    let resource = parse_resource(&resource)?;

    if resource == ResourceType::Facebook {
        return Err(AppError::BadRequest(
            "Facebook Pages are connected through /api/auth/facebook/connect".to_string(),
        ));
    }

    let token = body.token.trim();
    if token.is_empty() {
        return Err(AppError::BadRequest("Token must not be empty".to_string()));
    }

    let now = Utc::now();
    let credential = ResourceCredential {
        owner_user_id: owner.clone(),
        resource_id: body
            .resource_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| "me".to_string()),
        resource_name: body.resource_name,
        access_token: token.to_string(),
        obtained_at: now,
        last_modified: now,
    };
    state.credential_store.save(&owner, resource, &credential)?;

    info!(owner = %owner, resource_type = %resource, "Token stored");

    Ok(Json(SuccessResponse { success: true }))
}

/// DELETE /api/connections/:resource - disconnect
async fn delete_connection(
    State(state): State<Arc<DashboardAppState>>,
    headers: HeaderMap,
    Path(resource): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    let owner = state.authorize(&headers)?;
    let resource = parse_resource(&resource)?;

    if !state.credential_store.delete(&owner, resource)? {
        return Err(AppError::NotFound(format!("No {} connection found", resource)));
    }

    info!(owner = %owner, resource_type = %resource, "Connection removed");

    Ok(Json(SuccessResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_summary_omits_details() {
        let summary = ConnectionSummary::from_credential(ResourceType::X, None);

        let json = serde_json::to_string(&summary).unwrap();
        assert_eq!(json, r#"{"resource":"x","connected":false}"#);
    }

    #[test]
    fn test_connected_summary_never_exposes_token() {
        let now = Utc::now();
        let credential = ResourceCredential {
            owner_user_id: "owner-1".to_string(),
            resource_id: "page1".to_string(),
            resource_name: Some("My Page".to_string()),
            access_token: "PAT1".to_string(),
            obtained_at: now,
            last_modified: now,
        };

        let summary = ConnectionSummary::from_credential(ResourceType::Facebook, Some(credential));
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["connected"], true);
        assert_eq!(json["resourceId"], "page1");
        assert_eq!(json["resourceName"], "My Page");
        assert!(!json.to_string().contains("PAT1"));
    }
}
