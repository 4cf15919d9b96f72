#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Each [`TestApp`] runs the REAL kernel router and state over in-memory
//! stores and a recording pusher, so tests see exactly what a deployed
//! server would answer without Postgres or a live collector.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, header};
use axum::response::Response;
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde_json::Value;
use tower::ServiceExt;

use catalist_kernel::content::{ContentSource, MemoryContentSource, StoredItem};
use catalist_kernel::models::{CategoryRef, ContentItem, CustomFields, SerializedItem};
use catalist_kernel::query::ItemQuery;
use catalist_kernel::settings::{MemorySettingsStore, SettingsStore};
use catalist_kernel::sync::Pusher;
use catalist_kernel::{AppState, Backends, Config};
use catalist_test_utils::{TestItem, seed};

pub const ADMIN_TOKEN: &str = "test-admin-token";
pub const COLLECTOR: &str = "http://collector.test/ingest";

/// Convert fixtures into stored items.
pub fn stored(items: &[TestItem]) -> Vec<StoredItem> {
    serde_json::from_value(seed(items)).expect("fixtures match the seed format")
}

/// Configuration used by most tests.
pub fn test_config(category_slugs: &str) -> Config {
    Config {
        category_slugs_seed: Some(category_slugs.to_string()),
        sync_base_url: Some(COLLECTOR.to_string()),
        admin_token: Some(ADMIN_TOKEN.to_string()),
        ..Config::default()
    }
}

/// Pusher that records every push and answers with a fixed status.
#[derive(Default)]
pub struct RecordingPusher {
    pushes: Mutex<Vec<(String, Value)>>,
}

impl RecordingPusher {
    /// Recorded `(url, body)` pairs in push order.
    pub fn pushes(&self) -> Vec<(String, Value)> {
        self.pushes.lock().clone()
    }
}

#[async_trait]
impl Pusher for RecordingPusher {
    async fn push(&self, url: &str, items: &[SerializedItem]) -> Result<u16> {
        self.pushes
            .lock()
            .push((url.to_string(), serde_json::to_value(items)?));
        Ok(200)
    }
}

/// Content source that counts listing queries.
pub struct CountingSource {
    inner: MemoryContentSource,
    queries: AtomicUsize,
}

impl CountingSource {
    pub fn new(items: Vec<StoredItem>) -> Self {
        Self {
            inner: MemoryContentSource::with_items("post", items),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentSource for CountingSource {
    async fn query(&self, query: &ItemQuery) -> Result<Vec<ContentItem>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query(query).await
    }

    async fn categories_of(&self, item_id: i64) -> Result<Vec<CategoryRef>> {
        self.inner.categories_of(item_id).await
    }

    async fn tags_of(&self, item_id: i64) -> Result<Vec<String>> {
        self.inner.tags_of(item_id).await
    }

    async fn featured_image_url(&self, item_id: i64) -> Result<Option<String>> {
        self.inner.featured_image_url(item_id).await
    }

    async fn custom_fields(&self, item_id: i64) -> Result<CustomFields> {
        self.inner.custom_fields(item_id).await
    }
}

/// Test application wrapper using the REAL kernel routes and state.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub settings: Arc<MemorySettingsStore>,
    pub pusher: Arc<RecordingPusher>,
}

impl TestApp {
    /// App serving `items` with `category_slugs` as the stored configuration.
    pub async fn new(category_slugs: &str, items: &[TestItem]) -> Self {
        let source = Arc::new(MemoryContentSource::with_items("post", stored(items)));
        Self::with_source(test_config(category_slugs), source).await
    }

    pub async fn with_source(config: Config, source: Arc<dyn ContentSource>) -> Self {
        let settings = Arc::new(MemorySettingsStore::new());
        let pusher = Arc::new(RecordingPusher::default());

        let backends = Backends {
            settings: settings.clone() as Arc<dyn SettingsStore>,
            source,
            pusher: pusher.clone(),
        };
        let state = AppState::with_backends(config, backends)
            .await
            .expect("Failed to build app state");

        Self {
            router: catalist_kernel::app(state.clone()),
            state,
            settings,
            pusher,
        }
    }

    /// Send a request through the full router.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.request(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    /// Send an admin request carrying the test token.
    pub async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"));
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.request(request).await
    }

    /// Report an item save through the hook endpoint and wait for the
    /// sync worker to finish with it.
    pub async fn save_item(&self, item_id: i64, item_type: &str, autosave: bool) -> Response {
        let response = self
            .admin(
                Method::POST,
                "/api/hooks/item-saved",
                Some(serde_json::json!({
                    "item_id": item_id,
                    "item_type": item_type,
                    "autosave": autosave,
                })),
            )
            .await;
        self.state.sync_queue().flush().await.unwrap();
        response
    }
}

/// Read a response body as JSON.
pub async fn response_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        panic!(
            "response is not JSON ({e}): {}",
            String::from_utf8_lossy(&bytes)
        )
    })
}

/// Read a response body as text.
pub async fn response_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}
