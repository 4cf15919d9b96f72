//! Settings storage.
//!
//! All listing-configuration reads go through [`SettingsStore`]. Route
//! registration and the change dispatcher receive the same store at
//! construction time and re-read it on every pass; nothing caches it.

mod memory;
mod postgres;

pub use memory::MemorySettingsStore;
pub use postgres::PgSettingsStore;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use crate::models::{CategorySlug, ListingConfig};

/// Key the listing configuration is stored under.
pub const LISTING_SETTINGS_KEY: &str = "listing_settings";

/// Key-value store of JSON settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Get a value by key.
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;

    /// Set a value, replacing any previous one.
    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()>;

    /// Whether the backing store is reachable.
    async fn healthy(&self) -> bool {
        true
    }
}

/// Read the listing configuration. A missing or malformed entry reads as
/// empty.
pub async fn load_listing_config(store: &dyn SettingsStore) -> Result<ListingConfig> {
    let value = store
        .get(LISTING_SETTINGS_KEY)
        .await
        .context("failed to read listing settings")?;

    Ok(value
        .and_then(|v| serde_json::from_value::<ListingConfig>(v).ok())
        .unwrap_or_default())
}

/// Read the listing configuration and parse it into slugs.
pub async fn load_category_slugs(store: &dyn SettingsStore) -> Result<Vec<CategorySlug>> {
    Ok(load_listing_config(store).await?.slugs())
}

/// Replace the listing configuration.
pub async fn save_listing_config(store: &dyn SettingsStore, config: &ListingConfig) -> Result<()> {
    let value = serde_json::to_value(config).context("failed to encode listing settings")?;
    store
        .set(LISTING_SETTINGS_KEY, value)
        .await
        .context("failed to write listing settings")
}

/// Seed the listing configuration if the store has none yet.
///
/// Returns whether the seed was written.
pub async fn seed_listing_config(store: &dyn SettingsStore, raw: &str) -> Result<bool> {
    if store.get(LISTING_SETTINGS_KEY).await?.is_some() {
        return Ok(false);
    }
    save_listing_config(store, &ListingConfig::new(raw)).await?;
    info!(category_slugs = %raw, "listing settings seeded");
    Ok(true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn missing_settings_read_as_empty() {
        let store = MemorySettingsStore::new();
        let config = load_listing_config(&store).await.unwrap();
        assert_eq!(config, ListingConfig::default());
        assert!(load_category_slugs(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_settings_read_as_empty() {
        let store = MemorySettingsStore::new();
        store
            .set(LISTING_SETTINGS_KEY, json!(["not", "an", "object"]))
            .await
            .unwrap();
        assert!(load_category_slugs(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_then_load() {
        let store = MemorySettingsStore::new();
        save_listing_config(&store, &ListingConfig::new("news, sports"))
            .await
            .unwrap();
        let slugs = load_category_slugs(&store).await.unwrap();
        let names: Vec<&str> = slugs.iter().map(CategorySlug::as_str).collect();
        assert_eq!(names, vec!["news", "sports"]);
        assert_eq!(
            store.get(LISTING_SETTINGS_KEY).await.unwrap(),
            Some(json!({"category_slugs": "news, sports"}))
        );
    }

    #[tokio::test]
    async fn seed_only_applies_once() {
        let store = MemorySettingsStore::new();
        assert!(seed_listing_config(&store, "news").await.unwrap());
        assert!(!seed_listing_config(&store, "sports").await.unwrap());
        let config = load_listing_config(&store).await.unwrap();
        assert_eq!(config.category_slugs, "news");
    }
}
