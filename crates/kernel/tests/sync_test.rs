#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Change-triggered sync integration tests.
//!
//! Saves are reported through the hook endpoint, handled by the real sync
//! worker, and captured by a recording pusher. The HTTP pusher is exercised
//! against a local collector bound to an ephemeral port.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::post;
use parking_lot::Mutex;
use serde_json::{Value, json};

mod common;
use common::{COLLECTOR, TestApp, response_json};

use catalist_kernel::models::SerializedItem;
use catalist_kernel::sync::{HttpPusher, Pusher};
use catalist_test_utils::{TestItem, test_item};

fn catalog() -> Vec<TestItem> {
    vec![
        test_item(1, "Budget passes")
            .in_category("news")
            .created_at("2024-03-01T09:00:00"),
        test_item(2, "Cup final")
            .in_category("sports")
            .created_at("2024-03-02T09:00:00"),
    ]
}

// =============================================================================
// Hook and dispatcher
// =============================================================================

#[tokio::test]
async fn save_pushes_configured_category() {
    let app = TestApp::new("news", &catalog()).await;

    let response = app.save_item(1, "post", false).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(response_json(response).await["queued"], true);

    let pushes = app.pusher.pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].0, format!("{COLLECTOR}/news"));

    let body = pushes[0].1.as_array().unwrap();
    assert_eq!(body.len(), 1);
    assert_eq!(body[0]["ID"], 1);
    assert_eq!(body[0]["date"], "2024-03-01 09:00:00");
}

#[tokio::test]
async fn every_category_is_resynced_on_any_save() {
    let app = TestApp::new("news, sports", &catalog()).await;

    // Item 2 is only in sports; news is pushed anyway
    app.save_item(2, "post", false).await;

    let urls: Vec<String> = app.pusher.pushes().into_iter().map(|(u, _)| u).collect();
    assert_eq!(
        urls,
        vec![format!("{COLLECTOR}/news"), format!("{COLLECTOR}/sports")]
    );
}

#[tokio::test]
async fn autosaves_and_other_types_push_nothing() {
    let app = TestApp::new("news", &catalog()).await;

    let response = app.save_item(1, "post", true).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    app.save_item(1, "page", false).await;

    assert!(app.pusher.pushes().is_empty());
}

#[tokio::test]
async fn empty_configuration_pushes_nothing() {
    let app = TestApp::new("", &catalog()).await;
    app.save_item(1, "post", false).await;
    assert!(app.pusher.pushes().is_empty());
}

#[tokio::test]
async fn settings_change_applies_to_next_save() {
    let app = TestApp::new("news", &catalog()).await;

    app.admin(
        axum::http::Method::PUT,
        "/api/settings/listing",
        Some(json!({"category_slugs": "sports"})),
    )
    .await;
    app.save_item(1, "post", false).await;

    let pushes = app.pusher.pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].0, format!("{COLLECTOR}/sports"));
    assert_eq!(pushes[0].1[0]["ID"], 2);
}

#[tokio::test]
async fn malformed_hook_body_is_rejected() {
    let app = TestApp::new("news", &catalog()).await;

    let response = app
        .admin(
            axum::http::Method::POST,
            "/api/hooks/item-saved",
            Some(json!({"item_type": "post"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    assert_eq!(body["code"], "bad_request");
    assert!(body["message"].as_str().unwrap().contains("item_id"));

    app.state.sync_queue().flush().await.unwrap();
    assert!(app.pusher.pushes().is_empty());
}

// =============================================================================
// HTTP pusher
// =============================================================================

#[derive(Clone, Default)]
struct Collector {
    received: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
}

async fn ingest(
    State(collector): State<Collector>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let body: Value = serde_json::from_slice(&body).unwrap();
    collector
        .received
        .lock()
        .push((slug.clone(), content_type, body));

    if slug == "broken" {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::CREATED
    }
}

/// Start a collector on an ephemeral port, returning its base URL.
async fn start_collector() -> (String, Collector) {
    let collector = Collector::default();
    let app = Router::new()
        .route("/ingest/{slug}", post(ingest))
        .with_state(collector.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/ingest"), collector)
}

fn sample_items() -> Vec<SerializedItem> {
    serde_json::from_value(json!([{
        "ID": 7,
        "slug": "budget-passes",
        "title": "Budget passes",
        "content": "",
        "date": "2024-03-01 09:00:00",
        "categories": [{"name": "News", "slug": "news"}],
        "tags": [],
        "custom_fields": {}
    }]))
    .unwrap()
}

#[tokio::test]
async fn http_pusher_posts_json_array() {
    let (base, collector) = start_collector().await;
    let pusher = HttpPusher::new(Duration::from_secs(5)).unwrap();

    let status = pusher
        .push(&format!("{base}/news"), &sample_items())
        .await
        .unwrap();
    assert_eq!(status, 201);

    let received = collector.received.lock().clone();
    assert_eq!(received.len(), 1);
    let (slug, content_type, body) = &received[0];
    assert_eq!(slug, "news");
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(body[0]["ID"], 7);
    assert_eq!(body[0]["categories"][0]["slug"], "news");
}

#[tokio::test]
async fn http_pusher_returns_error_statuses() {
    let (base, _collector) = start_collector().await;
    let pusher = HttpPusher::new(Duration::from_secs(5)).unwrap();

    let status = pusher.push(&format!("{base}/broken"), &[]).await.unwrap();
    assert_eq!(status, 500);
}

#[tokio::test]
async fn http_pusher_fails_on_unreachable_collector() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let pusher = HttpPusher::new(Duration::from_secs(2)).unwrap();
    assert!(pusher.push(&format!("http://{addr}/news"), &[]).await.is_err());
}
