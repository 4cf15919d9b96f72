//! Listing endpoint registration.
//!
//! The registration pass reads the listing configuration from the settings
//! store and registers one endpoint per configured slug. Endpoints are
//! collected into a fresh router which is swapped into the [`RouteTable`]
//! as a whole; requests in flight keep the router they started with.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{RawQuery, State};
use axum::routing::get;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::listing::{self, ListingContext};
use crate::error::AppError;
use crate::models::{CategorySlug, LISTING_PARAMS, ListingConfig, ParamSpec};
use crate::settings::{self, SettingsStore};

/// One listing endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Endpoint {
    pub slug: CategorySlug,
    pub path: String,
    #[serde(skip)]
    pub params: &'static [ParamSpec],
}

impl Endpoint {
    /// Endpoint for `slug` mounted under `prefix`.
    pub fn new(prefix: &str, slug: CategorySlug) -> Self {
        Self {
            path: format!("{prefix}/{slug}"),
            slug,
            params: LISTING_PARAMS,
        }
    }
}

/// Endpoints a listing configuration yields, in configuration order.
pub fn derive_endpoints(prefix: &str, config: &ListingConfig) -> Vec<Endpoint> {
    config
        .slugs()
        .into_iter()
        .map(|slug| Endpoint::new(prefix, slug))
        .collect()
}

/// What a registry did with one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Added,
    /// Path already registered in this pass; the first one wins.
    Duplicate,
    /// Slug cannot be expressed as a route.
    Rejected(String),
}

/// Receives endpoints during a registration pass.
///
/// Registries are held across the settings read and must be `Send`.
pub trait RouteRegistry: Send {
    fn register(&mut self, endpoint: Endpoint) -> Registration;
}

/// Records endpoints without serving them.
impl RouteRegistry for Vec<Endpoint> {
    fn register(&mut self, endpoint: Endpoint) -> Registration {
        self.push(endpoint);
        Registration::Added
    }
}

/// Builds an axum router serving registered endpoints.
#[derive(Default)]
pub struct AxumRegistry {
    router: Router<ListingContext>,
    paths: HashSet<String>,
    endpoints: Vec<Endpoint>,
}

impl AxumRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered endpoints in registration order.
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Finish the pass, producing a router that answers unknown paths with
    /// `no_route`.
    pub fn into_router(self, ctx: ListingContext) -> (Router, Vec<Endpoint>) {
        let router = self
            .router
            .fallback(|| async { AppError::NotFound })
            .with_state(ctx);
        (router, self.endpoints)
    }
}

impl RouteRegistry for AxumRegistry {
    fn register(&mut self, endpoint: Endpoint) -> Registration {
        if let Err(reason) = check_route_slug(endpoint.slug.as_str()) {
            warn!(slug = %endpoint.slug, reason = %reason, "listing endpoint rejected");
            return Registration::Rejected(reason);
        }
        if !self.paths.insert(endpoint.path.clone()) {
            warn!(path = %endpoint.path, "duplicate listing endpoint ignored");
            return Registration::Duplicate;
        }

        let slug = endpoint.slug.clone();
        let params = endpoint.params;
        let handler = move |State(ctx): State<ListingContext>, RawQuery(query): RawQuery| {
            let slug = slug.clone();
            async move { listing::list_category(ctx, slug, params, query).await }
        };

        self.router = std::mem::take(&mut self.router).route(&endpoint.path, get(handler));
        debug!(path = %endpoint.path, "listing endpoint registered");
        self.endpoints.push(endpoint);
        Registration::Added
    }
}

/// Reject slugs the router would misread or refuse.
///
/// Slugs may span several path segments (`a/b`), but no segment may be
/// empty or start with a capture marker.
pub fn check_route_slug(slug: &str) -> Result<(), String> {
    if slug.chars().any(|c| c.is_whitespace() || matches!(c, '{' | '}' | '?' | '#')) {
        return Err("contains whitespace or a reserved character".to_string());
    }
    for segment in slug.split('/') {
        if segment.is_empty() {
            return Err("contains an empty path segment".to_string());
        }
        if segment.starts_with(':') || segment.starts_with('*') {
            return Err(format!("segment '{segment}' starts with a capture marker"));
        }
    }
    Ok(())
}

/// Atomically swappable listing router.
#[derive(Clone)]
pub struct RouteTable {
    inner: Arc<RwLock<TableInner>>,
}

struct TableInner {
    router: Router,
    endpoints: Vec<Endpoint>,
}

impl RouteTable {
    /// An empty table: every lookup is `no_route`.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(TableInner {
                router: Router::new().fallback(|| async { AppError::NotFound }),
                endpoints: Vec::new(),
            })),
        }
    }

    /// The router current at call time.
    pub fn current(&self) -> Router {
        self.inner.read().router.clone()
    }

    /// Registered endpoint paths.
    pub fn paths(&self) -> Vec<String> {
        self.inner
            .read()
            .endpoints
            .iter()
            .map(|e| e.path.clone())
            .collect()
    }

    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.inner.read().endpoints.clone()
    }

    /// Replace the whole table.
    pub fn swap(&self, router: Router, endpoints: Vec<Endpoint>) {
        let mut inner = self.inner.write();
        inner.router = router;
        inner.endpoints = endpoints;
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTable")
            .field("paths", &self.paths())
            .finish()
    }
}

/// Runs registration passes against the settings store.
#[derive(Clone)]
pub struct RouteRegistrar {
    settings: Arc<dyn SettingsStore>,
    prefix: String,
    /// Held from the settings read to the table swap, so the last swap
    /// always reflects the last stored configuration.
    rebuild_lock: Arc<tokio::sync::Mutex<()>>,
}

impl RouteRegistrar {
    pub fn new(settings: Arc<dyn SettingsStore>, prefix: impl Into<String>) -> Self {
        Self {
            settings,
            prefix: prefix.into(),
            rebuild_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Read the configuration and register one endpoint per slug.
    ///
    /// Returns the number of endpoints the registry accepted.
    pub async fn registration_pass(&self, registry: &mut dyn RouteRegistry) -> Result<usize> {
        let config = settings::load_listing_config(self.settings.as_ref())
            .await
            .context("failed to read listing settings for registration")?;

        let mut added = 0;
        for endpoint in derive_endpoints(&self.prefix, &config) {
            if registry.register(endpoint) == Registration::Added {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Run a pass into a fresh router and swap it into `table`.
    ///
    /// On failure the previous table stays in place. Concurrent rebuilds
    /// run one at a time.
    pub async fn rebuild(&self, table: &RouteTable, ctx: ListingContext) -> Result<Vec<String>> {
        let _guard = self.rebuild_lock.lock().await;
        let metrics = ctx.metrics.clone();
        let mut registry = AxumRegistry::new();
        self.registration_pass(&mut registry).await?;

        let (router, endpoints) = registry.into_router(ctx);
        let paths: Vec<String> = endpoints.iter().map(|e| e.path.clone()).collect();
        metrics.set_registered_endpoints(endpoints.len());
        table.swap(router, endpoints);

        info!(endpoints = paths.len(), "listing routes rebuilt");
        Ok(paths)
    }
}

impl std::fmt::Debug for RouteRegistrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteRegistrar")
            .field("prefix", &self.prefix)
            .finish()
    }
}
