//! Prometheus metrics collection.
//!
//! Provides application metrics in Prometheus format.

use prometheus_client::encoding::{EncodeLabelSet, text::encode};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;

/// Listing request labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ListingLabels {
    pub slug: String,
    pub status: u16,
}

/// Collector push labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct PushLabels {
    pub slug: String,
    pub result: String,
}

/// Save-event labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct EventLabels {
    pub outcome: String,
}

/// Application metrics.
pub struct Metrics {
    registry: Registry,

    /// Listing requests by slug/status.
    pub listing_requests: Family<ListingLabels, Counter>,

    /// Listing request duration histogram.
    pub listing_duration_seconds: Histogram,

    /// Requests rejected by parameter validation.
    pub validation_rejections: Counter,

    /// Save events by outcome (dispatched, skipped_autosave, ...).
    pub sync_events: Family<EventLabels, Counter>,

    /// Collector pushes by slug/result.
    pub sync_pushes: Family<PushLabels, Counter>,

    /// Push duration histogram.
    pub push_duration_seconds: Histogram,

    /// Endpoints in the current listing route table.
    pub registered_endpoints: Gauge,
}

impl Metrics {
    /// Create a new metrics registry.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let listing_requests = Family::<ListingLabels, Counter>::default();
        registry.register(
            "listing_requests",
            "Listing endpoint requests",
            listing_requests.clone(),
        );

        let listing_duration_seconds = Histogram::new(exponential_buckets(0.001, 2.0, 12));
        registry.register(
            "listing_duration_seconds",
            "Listing request duration in seconds",
            listing_duration_seconds.clone(),
        );

        let validation_rejections = Counter::default();
        registry.register(
            "validation_rejections",
            "Listing requests rejected by parameter validation",
            validation_rejections.clone(),
        );

        let sync_events = Family::<EventLabels, Counter>::default();
        registry.register(
            "sync_events",
            "Item save events by outcome",
            sync_events.clone(),
        );

        let sync_pushes = Family::<PushLabels, Counter>::default();
        registry.register(
            "sync_pushes",
            "Collector pushes by result",
            sync_pushes.clone(),
        );

        let push_duration_seconds = Histogram::new(exponential_buckets(0.005, 2.0, 12));
        registry.register(
            "push_duration_seconds",
            "Collector push duration in seconds",
            push_duration_seconds.clone(),
        );

        let registered_endpoints = Gauge::default();
        registry.register(
            "registered_endpoints",
            "Endpoints in the current listing route table",
            registered_endpoints.clone(),
        );

        Self {
            registry,
            listing_requests,
            listing_duration_seconds,
            validation_rejections,
            sync_events,
            sync_pushes,
            push_duration_seconds,
            registered_endpoints,
        }
    }

    /// Record a listing request.
    pub fn record_listing(&self, slug: &str, status: u16, duration_secs: f64) {
        self.listing_requests
            .get_or_create(&ListingLabels {
                slug: slug.to_string(),
                status,
            })
            .inc();
        self.listing_duration_seconds.observe(duration_secs);
    }

    /// Record a validation rejection.
    pub fn record_rejection(&self) {
        self.validation_rejections.inc();
    }

    /// Record a save event outcome.
    pub fn record_event(&self, outcome: &str) {
        self.sync_events
            .get_or_create(&EventLabels {
                outcome: outcome.to_string(),
            })
            .inc();
    }

    /// Record a push outcome.
    pub fn record_push(&self, slug: &str, result: &str, duration_secs: f64) {
        self.sync_pushes
            .get_or_create(&PushLabels {
                slug: slug.to_string(),
                result: result.to_string(),
            })
            .inc();
        self.push_duration_seconds.observe(duration_secs);
    }

    /// Set the registered endpoint count.
    pub fn set_registered_endpoints(&self, count: usize) {
        self.registered_endpoints
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Encode metrics in Prometheus text format.
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        if let Err(e) = encode(&mut buffer, &self.registry) {
            tracing::warn!(error = %e, "failed to encode metrics");
        }
        buffer
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish()
    }
}
