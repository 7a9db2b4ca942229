//! HTTP API tests

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chat_history_search::api::{build_router, AppState};
use chat_history_search::models::ConversationDocument;
use chat_history_search::search::{ClusterStatus, HealthChecker, InMemoryStore};
use common::{seeded_service, ConversationFixture};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

async fn app_with(docs: &[ConversationDocument]) -> (Arc<InMemoryStore>, Router) {
    let (store, service) = seeded_service(docs).await;
    let state = AppState::new(Arc::new(service)).with_health(HealthChecker::new(store.clone()));
    (store, build_router(state))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_search_returns_envelope_with_pagination() {
    let docs: Vec<_> = (0..3)
        .map(|i| ConversationFixture::new(&format!("meeting {}", i)).build())
        .collect();
    let (_, app) = app_with(&docs).await;

    let (status, body) = get(app, "/api/v1/search?q=meeting&limit=2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["conversations"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"]["page"], 1);
    assert_eq!(body["pagination"]["limit"], 2);
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["total_pages"], 2);
    assert_eq!(
        body["data"]["conversations"][0]["matched_fields"][0],
        "title"
    );
}

#[tokio::test]
async fn test_invalid_user_id_is_rejected() {
    let (_, app) = app_with(&[ConversationFixture::new("x").build()]).await;

    let (status, body) = get(app, "/api/v1/search?q=x&user_id=nope").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_UUID");
}

#[tokio::test]
async fn test_invalid_date_is_rejected() {
    let (_, app) = app_with(&[ConversationFixture::new("x").build()]).await;

    let (status, body) = get(app, "/api/v1/search?end_date=31-01-2024").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_DATE");
}

#[tokio::test]
async fn test_out_of_range_limit_falls_back_to_default() {
    let (_, app) = app_with(&[ConversationFixture::new("x").build()]).await;

    let (status, body) = get(app, "/api/v1/search?limit=1000&page=0").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["limit"], 10);
    assert_eq!(body["pagination"]["page"], 1);
}

#[tokio::test]
async fn test_huge_page_is_rejected() {
    let (_, app) = app_with(&[ConversationFixture::new("x").build()]).await;

    let (status, body) = get(app, "/api/v1/search?q=x&page=18446744073709551615").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_missing_index_is_not_found() {
    let (_, app) = app_with(&[]).await;

    let (status, body) = get(app, "/api/v1/search?q=anything").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_health_endpoints() {
    let (store, app) = app_with(&[]).await;

    let (status, body) = get(app.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = get(app.clone(), "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    store.set_cluster_status(ClusterStatus::Red);
    let (status, body) = get(app, "/health/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    chat_history_search::metrics::init_metrics().unwrap();
    let (_, app) = app_with(&[ConversationFixture::new("metrics probe").build()]).await;

    let _ = get(app.clone(), "/api/v1/search?q=probe").await;

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let metrics = common::parse_prometheus_output(&text);
    assert!(metrics.contains_key("chat_history_search_search_requests_total"));
}
