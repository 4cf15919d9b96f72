//! Item serializer: raw item plus relations to wire form.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::warn;

use super::ContentSource;
use crate::models::{ContentItem, CustomFields, SerializedItem};

/// Converts raw content items into [`SerializedItem`]s.
///
/// Pure over content source reads; never writes.
#[derive(Clone)]
pub struct ItemSerializer {
    source: Arc<dyn ContentSource>,
}

impl ItemSerializer {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self { source }
    }

    /// Serialize one item.
    ///
    /// A failing custom-field read degrades to an empty mapping; other
    /// relation read failures are errors.
    pub async fn serialize(&self, item: ContentItem) -> Result<SerializedItem> {
        let (categories, tags, featured_image, custom_fields) = tokio::join!(
            self.source.categories_of(item.id),
            self.source.tags_of(item.id),
            self.source.featured_image_url(item.id),
            self.source.custom_fields(item.id),
        );

        let categories = categories
            .with_context(|| format!("failed to load categories for item {}", item.id))?;
        let tags = tags.with_context(|| format!("failed to load tags for item {}", item.id))?;
        let featured_image = featured_image
            .with_context(|| format!("failed to load featured image for item {}", item.id))?;
        let custom_fields = custom_fields.unwrap_or_else(|e| {
            warn!(item_id = item.id, error = %e, "custom fields unavailable");
            CustomFields::new()
        });

        Ok(SerializedItem {
            id: item.id,
            date: item.date_string(),
            slug: item.slug,
            title: item.title,
            content: item.content,
            categories,
            tags,
            featured_image,
            custom_fields,
        })
    }

    /// Serialize a result set, preserving order.
    pub async fn serialize_all(&self, items: Vec<ContentItem>) -> Result<Vec<SerializedItem>> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(self.serialize(item).await?);
        }
        Ok(out)
    }
}

impl std::fmt::Debug for ItemSerializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemSerializer").finish()
    }
}
