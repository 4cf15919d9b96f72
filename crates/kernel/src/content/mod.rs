//! Content source abstraction.
//!
//! This module provides:
//! - ContentSource: the read-only interface listings and resyncs query
//! - MemoryContentSource: in-process store for tests and seeded demos
//! - PgContentSource: Postgres-backed reader
//! - ItemSerializer: raw item + relations to wire form

mod memory;
mod postgres;
mod serializer;

pub use memory::{MemoryContentSource, StoredItem};
pub use postgres::PgContentSource;
pub use serializer::ItemSerializer;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{CategoryRef, ContentItem, CustomFields};
use crate::query::ItemQuery;

/// Queryable store of content items and their relations.
///
/// Implementations apply their own default listing scope (published items
/// of the listing type) and nothing else beyond what [`ItemQuery`] asks for.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Run a listing query.
    async fn query(&self, query: &ItemQuery) -> Result<Vec<ContentItem>>;

    /// Every category the item belongs to, in membership order.
    async fn categories_of(&self, item_id: i64) -> Result<Vec<CategoryRef>>;

    /// Tag names attached to the item.
    async fn tags_of(&self, item_id: i64) -> Result<Vec<String>>;

    /// Full-resolution featured media URL, if the item has one.
    async fn featured_image_url(&self, item_id: i64) -> Result<Option<String>>;

    /// Custom-field mapping for the item.
    async fn custom_fields(&self, item_id: i64) -> Result<CustomFields>;

    /// Whether the backing store is reachable.
    async fn healthy(&self) -> bool {
        true
    }
}
