// Integration tests for the settings, connections and posts APIs

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use quill::api::{
    create_connections_router, create_posts_router, create_settings_router, DashboardAppState,
};
use quill::config::AutomationConfig;
use quill::credentials::{CredentialStore, ResourceType};
use quill::generation::ContentKind;
use quill::store::{DocumentStore, PublishLog, PublishRecord};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn create_state(api_token: Option<&str>) -> DashboardAppState {
    let key = BASE64.encode([0u8; 32]);
    DashboardAppState {
        documents: Arc::new(DocumentStore::new(":memory:").unwrap()),
        credential_store: Arc::new(CredentialStore::new(":memory:", &key).unwrap()),
        automation: AutomationConfig {
            owner_user_id: Some("owner-1".to_string()),
            cron_secret: None,
        },
        api_token: api_token.map(str::to_string),
    }
}

fn create_test_app(state: DashboardAppState) -> Router {
    create_settings_router(state.clone())
        .merge(create_connections_router(state.clone()))
        .merge(create_posts_router(state))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_get_settings_returns_defaults() {
    let app = create_test_app(create_state(None));

    let (status, json) = send(&app, "GET", "/api/settings/tweet", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["kind"], "tweet");
    assert_eq!(json["source"], "default");
    assert_eq!(json["settings"]["niche"], "Tech & AI");
    assert_eq!(json["settings"]["viral"], true);
}

#[tokio::test]
async fn test_put_settings_merges() {
    let app = create_test_app(create_state(None));

    let (status, _) = send(
        &app,
        "PUT",
        "/api/settings/blog",
        Some(json!({"topic": "Async Rust", "requirements": "Keep it short"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(
        &app,
        "PUT",
        "/api/settings/blog",
        Some(json!({"topic": "Pinning explained"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["settings"]["topic"], "Pinning explained");
    assert_eq!(json["settings"]["requirements"], "Keep it short");

    let (_, json) = send(&app, "GET", "/api/settings/blog", None, None).await;
    assert_eq!(json["source"], "saved");
    assert_eq!(json["settings"]["topic"], "Pinning explained");
}

#[tokio::test]
async fn test_put_settings_rejects_bad_fields() {
    let app = create_test_app(create_state(None));

    let (status, json) = send(
        &app,
        "PUT",
        "/api/settings/tweet",
        Some(json!({"viral": "very"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("boolean"));

    let (status, _) = send(&app, "PUT", "/api/settings/tweet", Some(json!(["topic"])), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/api/settings/video", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_token_required_when_configured() {
    let app = create_test_app(create_state(Some("dash-token")));

    let (status, _) = send(&app, "GET", "/api/settings/blog", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/connections", None, Some("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/connections", None, Some("dash-token")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_connection_lifecycle() {
    let state = create_state(None);
    let app = create_test_app(state.clone());

    let (status, json) = send(&app, "GET", "/api/connections", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let connections = json["connections"].as_array().unwrap();
    assert_eq!(connections.len(), 2);
    assert!(connections.iter().all(|c| c["connected"] == false));

    let (status, json) = send(
        &app,
        "POST",
        "/api/connections/x/token",
        Some(json!({"token": "x-user-token", "resourceId": "quill_bot"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    let stored = state
        .credential_store
        .load("owner-1", ResourceType::X)
        .unwrap()
        .unwrap();
    assert_eq!(stored.resource_id, "quill_bot");
    assert_eq!(stored.access_token, "x-user-token");

    let (_, json) = send(&app, "GET", "/api/connections", None, None).await;
    let x = json["connections"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["resource"] == "x")
        .unwrap()
        .clone();
    assert_eq!(x["connected"], true);
    assert_eq!(x["resourceId"], "quill_bot");
    assert!(!json.to_string().contains("x-user-token"));

    let (status, _) = send(&app, "DELETE", "/api/connections/x", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "DELETE", "/api/connections/x", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_facebook_token_must_use_oauth() {
    let app = create_test_app(create_state(None));

    let (status, _) = send(
        &app,
        "POST",
        "/api/connections/facebook/token",
        Some(json!({"token": "PAT1"})),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_posts() {
    let state = create_state(None);
    state
        .documents
        .record(
            "owner-1",
            &PublishRecord::new(
                "pub_789".to_string(),
                ContentKind::FacebookPost,
                "Hello page".to_string(),
                json!({"topic": "AI"}),
            ),
        )
        .unwrap();
    let app = create_test_app(state);

    let (status, json) = send(&app, "GET", "/api/posts/facebook", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let posts = json["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["contentId"], "pub_789");
    assert_eq!(posts[0]["kind"], "facebookPost");

    let (_, json) = send(&app, "GET", "/api/posts/tweet", None, None).await;
    assert!(json["posts"].as_array().unwrap().is_empty());
}
