//! Change dispatcher: resync configured categories to the collector.
//!
//! Every eligible item save re-reads the listing configuration and, for
//! each configured category, pushes the full serialized category to
//! `<base>/<slug>`. All categories are resynced on every eligible save,
//! whether or not the saved item belongs to them.
//!
//! Delivery is fire-and-forget by default: push outcomes are logged and
//! counted, never surfaced to the saver.

mod push;
mod queue;

pub use push::{HttpPusher, Pusher, RetryingPusher, is_success};
pub use queue::SyncQueue;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::content::{ContentSource, ItemSerializer};
use crate::metrics::Metrics;
use crate::models::{CategorySlug, SerializedItem};
use crate::query::ItemQuery;
use crate::settings::{self, SettingsStore};

/// "Content item saved" event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSaved {
    pub item_id: i64,
    pub item_type: String,
    /// Set when the save belongs to an automated draft-save cycle.
    #[serde(default)]
    pub autosave: bool,
}

/// What happened to one category during a resync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PushResult {
    /// Collector answered 2xx.
    Delivered { status: u16 },
    /// Collector answered outside 2xx.
    Rejected { status: u16 },
    /// Transport failure.
    Failed { error: String },
    /// Nothing sent: the category could not be read or the URL is invalid.
    NotSent { error: String },
}

impl PushResult {
    fn label(&self) -> &'static str {
        match self {
            PushResult::Delivered { .. } => "delivered",
            PushResult::Rejected { .. } => "rejected",
            PushResult::Failed { .. } => "failed",
            PushResult::NotSent { .. } => "not_sent",
        }
    }
}

/// One category's resync record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushRecord {
    pub slug: CategorySlug,
    pub url: String,
    pub items: usize,
    #[serde(flatten)]
    pub result: PushResult,
}

/// Result of handling one save event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "pushes", rename_all = "snake_case")]
pub enum EventOutcome {
    SkippedAutosave,
    SkippedItemType,
    /// No collector configured.
    Disabled,
    Dispatched(Vec<PushRecord>),
}

impl EventOutcome {
    fn label(&self) -> &'static str {
        match self {
            EventOutcome::SkippedAutosave => "skipped_autosave",
            EventOutcome::SkippedItemType => "skipped_item_type",
            EventOutcome::Disabled => "disabled",
            EventOutcome::Dispatched(_) => "dispatched",
        }
    }
}

/// Build the collector URL for a category.
pub fn collector_url(base: &str, slug: &CategorySlug) -> String {
    format!("{}/{}", base.trim_end_matches('/'), slug)
}

/// Reacts to item saves by pushing every configured category.
pub struct ChangeDispatcher {
    settings: Arc<dyn SettingsStore>,
    source: Arc<dyn ContentSource>,
    serializer: ItemSerializer,
    pusher: Arc<dyn Pusher>,
    base_url: Option<String>,
    sync_item_type: String,
    metrics: Arc<Metrics>,
}

impl ChangeDispatcher {
    /// Create a dispatcher. `base_url = None` disables pushing.
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        source: Arc<dyn ContentSource>,
        pusher: Arc<dyn Pusher>,
        base_url: Option<String>,
        sync_item_type: impl Into<String>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            serializer: ItemSerializer::new(source.clone()),
            settings,
            source,
            pusher,
            base_url,
            sync_item_type: sync_item_type.into(),
            metrics,
        }
    }

    /// Whether a collector is configured.
    pub fn enabled(&self) -> bool {
        self.base_url.is_some()
    }

    /// Handle one save event.
    ///
    /// Only a settings read failure is an error; per-category failures are
    /// recorded in the outcome and logged.
    pub async fn handle(&self, event: &ItemSaved) -> Result<EventOutcome> {
        let outcome = if event.autosave {
            EventOutcome::SkippedAutosave
        } else if event.item_type != self.sync_item_type {
            EventOutcome::SkippedItemType
        } else {
            match self.base_url.as_deref() {
                None => EventOutcome::Disabled,
                Some(base) => EventOutcome::Dispatched(self.push_all(base).await?),
            }
        };

        self.metrics.record_event(outcome.label());
        debug!(
            item_id = event.item_id,
            item_type = %event.item_type,
            outcome = outcome.label(),
            "item save handled"
        );
        Ok(outcome)
    }

    /// Push every configured category once, ignoring eligibility rules.
    pub async fn resync_all(&self) -> Result<Vec<PushRecord>> {
        let Some(base) = self.base_url.as_deref() else {
            anyhow::bail!("no collector configured (SYNC_BASE_URL is unset)");
        };
        self.push_all(base).await
    }

    async fn push_all(&self, base: &str) -> Result<Vec<PushRecord>> {
        let slugs = settings::load_category_slugs(self.settings.as_ref())
            .await
            .context("failed to read category slugs for resync")?;

        let mut records = Vec::with_capacity(slugs.len());
        for slug in slugs {
            records.push(self.push_category(base, slug).await);
        }
        Ok(records)
    }

    async fn push_category(&self, base: &str, slug: CategorySlug) -> PushRecord {
        let url = collector_url(base, &slug);

        let items = match self.snapshot(&slug).await {
            Ok(items) => items,
            Err(e) => {
                warn!(slug = %slug, error = %e, "failed to read category for push");
                return self.finish(
                    slug,
                    url,
                    0,
                    PushResult::NotSent {
                        error: format!("{e:#}"),
                    },
                    0.0,
                );
            }
        };

        if let Err(e) = url::Url::parse(&url) {
            warn!(slug = %slug, url = %url, error = %e, "invalid collector URL");
            return self.finish(
                slug,
                url,
                items.len(),
                PushResult::NotSent {
                    error: e.to_string(),
                },
                0.0,
            );
        }

        let start = Instant::now();
        let result = match self.pusher.push(&url, &items).await {
            Ok(status) if is_success(status) => PushResult::Delivered { status },
            Ok(status) => {
                warn!(slug = %slug, url = %url, status, "collector rejected push");
                PushResult::Rejected { status }
            }
            Err(e) => {
                warn!(slug = %slug, url = %url, error = %e, "collector push failed");
                PushResult::Failed {
                    error: format!("{e:#}"),
                }
            }
        };
        let elapsed = start.elapsed().as_secs_f64();

        self.finish(slug, url, items.len(), result, elapsed)
    }

    async fn snapshot(&self, slug: &CategorySlug) -> Result<Vec<SerializedItem>> {
        let items = self.source.query(&ItemQuery::unpaginated(slug)).await?;
        self.serializer.serialize_all(items).await
    }

    fn finish(
        &self,
        slug: CategorySlug,
        url: String,
        items: usize,
        result: PushResult,
        elapsed: f64,
    ) -> PushRecord {
        self.metrics.record_push(slug.as_str(), result.label(), elapsed);
        if let PushResult::Delivered { status } = result {
            info!(slug = %slug, status, items, "category pushed");
        }
        PushRecord {
            slug,
            url,
            items,
            result,
        }
    }
}

impl std::fmt::Debug for ChangeDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeDispatcher")
            .field("base_url", &self.base_url)
            .field("sync_item_type", &self.sync_item_type)
            .finish()
    }
}
