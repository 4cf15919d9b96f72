//! Collector delivery.
//!
//! [`Pusher`] is the seam between the dispatcher and the wire. The default
//! [`HttpPusher`] makes one attempt; [`RetryingPusher`] wraps any pusher with
//! a bounded retry schedule.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::models::SerializedItem;

/// Sends one category snapshot to the collector.
#[async_trait]
pub trait Pusher: Send + Sync {
    /// POST `items` as a JSON array to `url`, returning the HTTP status.
    ///
    /// Transport failures are errors; non-2xx statuses are not.
    async fn push(&self, url: &str, items: &[SerializedItem]) -> Result<u16>;
}

/// Pusher using a shared `reqwest` client.
#[derive(Clone)]
pub struct HttpPusher {
    client: reqwest::Client,
}

impl HttpPusher {
    /// Create a pusher whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            // Collector URLs are operator-configured; do not follow redirects elsewhere
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("Catalist-Sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { client })
    }
}

impl std::fmt::Debug for HttpPusher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPusher").finish()
    }
}

#[async_trait]
impl Pusher for HttpPusher {
    async fn push(&self, url: &str, items: &[SerializedItem]) -> Result<u16> {
        let body = serde_json::to_vec(items).context("failed to serialize payload")?;

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .context("HTTP request failed")?;

        let status = response.status().as_u16();
        debug!(url = %url, status, items = items.len(), "collector responded");
        Ok(status)
    }
}

/// Whether a status counts as delivered.
pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Retries a wrapped pusher on transport errors and non-2xx statuses.
pub struct RetryingPusher<P> {
    inner: P,
    max_attempts: u32,
    base_delay: Duration,
}

impl<P: Pusher> RetryingPusher<P> {
    /// Make up to `max_attempts` attempts, waiting `base_delay * 2^n`
    /// between them.
    pub fn new(inner: P, max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

#[async_trait]
impl<P: Pusher> Pusher for RetryingPusher<P> {
    async fn push(&self, url: &str, items: &[SerializedItem]) -> Result<u16> {
        let mut attempt = 1;
        loop {
            let result = self.inner.push(url, items).await;
            let retryable = match &result {
                Ok(status) => !is_success(*status),
                Err(_) => true,
            };
            if !retryable || attempt >= self.max_attempts {
                return result;
            }

            let delay = self.delay_for(attempt);
            match &result {
                Ok(status) => warn!(url = %url, attempt, status, "push rejected, retrying"),
                Err(e) => warn!(url = %url, attempt, error = %e, "push failed, retrying"),
            }
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
