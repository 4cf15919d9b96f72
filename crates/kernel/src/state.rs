//! Application state shared across all handlers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::content::{ContentSource, MemoryContentSource, PgContentSource};
use crate::db;
use crate::metrics::Metrics;
use crate::routes::{ListingContext, RouteRegistrar, RouteTable};
use crate::settings::{self, MemorySettingsStore, PgSettingsStore, SettingsStore};
use crate::sync::{ChangeDispatcher, HttpPusher, Pusher, RetryingPusher, SyncQueue};

/// First retry delay when `SYNC_MAX_ATTEMPTS` > 1.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Storage and delivery backends the state is assembled from.
pub struct Backends {
    pub settings: Arc<dyn SettingsStore>,
    pub source: Arc<dyn ContentSource>,
    pub pusher: Arc<dyn Pusher>,
}

impl Backends {
    /// Connect the backends named by `config`.
    ///
    /// With `DATABASE_URL` set both stores are Postgres-backed; otherwise
    /// both live in memory, with content optionally loaded from `SEED_FILE`.
    pub async fn connect(config: &Config) -> Result<Self> {
        let (settings, source): (Arc<dyn SettingsStore>, Arc<dyn ContentSource>) =
            match config.database_url.as_deref() {
                Some(url) => {
                    let pool = db::create_pool(url, config.database_max_connections).await?;
                    db::run_migrations(&pool).await?;
                    info!("PostgreSQL backends connected");
                    (
                        Arc::new(PgSettingsStore::new(pool.clone())),
                        Arc::new(PgContentSource::new(pool, &config.listing_item_type)),
                    )
                }
                None => {
                    let source = match config.seed_file.as_deref() {
                        Some(path) => {
                            MemoryContentSource::from_seed_file(&config.listing_item_type, path)?
                        }
                        None => MemoryContentSource::new(&config.listing_item_type),
                    };
                    info!(items = source.len(), "in-memory backends ready");
                    (Arc::new(MemorySettingsStore::new()), Arc::new(source))
                }
            };

        let http = HttpPusher::new(config.sync_timeout)?;
        let pusher: Arc<dyn Pusher> = if config.sync_max_attempts > 1 {
            Arc::new(RetryingPusher::new(
                http,
                config.sync_max_attempts,
                RETRY_BASE_DELAY,
            ))
        } else {
            Arc::new(http)
        };

        Ok(Self {
            settings,
            source,
            pusher,
        })
    }
}

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,

    /// Listing configuration lives here; read on every registration pass
    /// and every resync.
    settings: Arc<dyn SettingsStore>,

    source: Arc<dyn ContentSource>,

    metrics: Arc<Metrics>,

    /// Listing endpoints currently served.
    route_table: RouteTable,

    registrar: RouteRegistrar,

    dispatcher: Arc<ChangeDispatcher>,

    /// Handle to the single sync worker.
    sync_queue: SyncQueue,
}

impl AppState {
    /// Connect backends from `config` and assemble the state.
    pub async fn new(config: &Config) -> Result<Self> {
        let backends = Backends::connect(config)
            .await
            .context("failed to connect backends")?;
        Self::with_backends(config.clone(), backends).await
    }

    /// Assemble the state over explicit backends.
    ///
    /// Seeds the listing configuration, runs the initial registration pass,
    /// and starts the sync worker. Must be called inside a Tokio runtime.
    pub async fn with_backends(config: Config, backends: Backends) -> Result<Self> {
        let Backends {
            settings,
            source,
            pusher,
        } = backends;

        if let Some(seed) = config.category_slugs_seed.as_deref() {
            settings::seed_listing_config(settings.as_ref(), seed)
                .await
                .context("failed to seed listing settings")?;
        }

        let metrics = Arc::new(Metrics::new());
        let registrar = RouteRegistrar::new(settings.clone(), &config.api_prefix);
        let route_table = RouteTable::new();

        let dispatcher = Arc::new(ChangeDispatcher::new(
            settings.clone(),
            source.clone(),
            pusher,
            config.sync_base_url.clone(),
            &config.sync_item_type,
            metrics.clone(),
        ));
        let (sync_queue, _worker) = SyncQueue::start(dispatcher.clone());

        let state = Self {
            inner: Arc::new(AppStateInner {
                config,
                settings,
                source,
                metrics,
                route_table,
                registrar,
                dispatcher,
                sync_queue,
            }),
        };

        state
            .rebuild_routes()
            .await
            .context("initial route registration failed")?;

        Ok(state)
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn settings(&self) -> &Arc<dyn SettingsStore> {
        &self.inner.settings
    }

    pub fn source(&self) -> &Arc<dyn ContentSource> {
        &self.inner.source
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.inner.metrics
    }

    pub fn route_table(&self) -> &RouteTable {
        &self.inner.route_table
    }

    pub fn dispatcher(&self) -> &Arc<ChangeDispatcher> {
        &self.inner.dispatcher
    }

    pub fn sync_queue(&self) -> &SyncQueue {
        &self.inner.sync_queue
    }

    /// Context handed to listing handlers.
    pub fn listing_context(&self) -> ListingContext {
        ListingContext::new(self.inner.source.clone(), self.inner.metrics.clone())
    }

    /// Re-run registration and swap in the result.
    pub async fn rebuild_routes(&self) -> Result<Vec<String>> {
        self.inner
            .registrar
            .rebuild(&self.inner.route_table, self.listing_context())
            .await
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .field("route_table", &self.inner.route_table)
            .finish()
    }
}
