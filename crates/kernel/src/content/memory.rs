//! In-memory content source.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::ContentSource;
use crate::models::{CategoryRef, ContentItem, CustomFields};
use crate::query::ItemQuery;

/// A content item together with everything the serializer reads for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredItem {
    #[serde(flatten)]
    pub item: ContentItem,
    #[serde(default)]
    pub categories: Vec<CategoryRef>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub custom_fields: CustomFields,
}

/// Content source held entirely in process memory.
///
/// Items are kept in insertion order; saving an item with an existing id
/// replaces it in place.
pub struct MemoryContentSource {
    item_type: String,
    items: RwLock<Vec<StoredItem>>,
}

impl MemoryContentSource {
    /// Create an empty source listing items of `item_type`.
    pub fn new(item_type: impl Into<String>) -> Self {
        Self {
            item_type: item_type.into(),
            items: RwLock::new(Vec::new()),
        }
    }

    /// Create a source pre-populated with `items`.
    pub fn with_items(item_type: impl Into<String>, items: Vec<StoredItem>) -> Self {
        let source = Self::new(item_type);
        for item in items {
            source.upsert(item);
        }
        source
    }

    /// Load items from a JSON array file.
    pub fn from_seed_file(item_type: impl Into<String>, path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read seed file {}", path.display()))?;
        let items: Vec<StoredItem> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse seed file {}", path.display()))?;
        info!(path = %path.display(), items = items.len(), "content seed loaded");
        Ok(Self::with_items(item_type, items))
    }

    /// Insert or replace an item by id.
    pub fn upsert(&self, stored: StoredItem) {
        let mut items = self.items.write();
        match items.iter_mut().find(|s| s.item.id == stored.item.id) {
            Some(existing) => *existing = stored,
            None => items.push(stored),
        }
    }

    /// Remove an item by id. Returns whether it existed.
    pub fn remove(&self, item_id: i64) -> bool {
        let mut items = self.items.write();
        let before = items.len();
        items.retain(|s| s.item.id != item_id);
        items.len() != before
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    fn find<T>(&self, item_id: i64, f: impl FnOnce(&StoredItem) -> T) -> Option<T> {
        self.items
            .read()
            .iter()
            .find(|s| s.item.id == item_id)
            .map(f)
    }
}

impl std::fmt::Debug for MemoryContentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryContentSource")
            .field("item_type", &self.item_type)
            .field("items", &self.len())
            .finish()
    }
}

#[async_trait]
impl ContentSource for MemoryContentSource {
    async fn query(&self, query: &ItemQuery) -> Result<Vec<ContentItem>> {
        let mut matched: Vec<ContentItem> = self
            .items
            .read()
            .iter()
            .filter(|s| s.item.is_published() && s.item.item_type == self.item_type)
            .filter(|s| {
                s.categories
                    .iter()
                    .any(|c| c.slug == query.category.as_str())
            })
            .filter(|s| query.matches_search(&s.item))
            .map(|s| s.item.clone())
            .collect();

        matched.sort_by(|a, b| query.compare(a, b));

        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let page = matched.into_iter().skip(offset);
        Ok(match query.limit {
            Some(limit) => page.take(limit as usize).collect(),
            None => page.collect(),
        })
    }

    async fn categories_of(&self, item_id: i64) -> Result<Vec<CategoryRef>> {
        Ok(self
            .find(item_id, |s| s.categories.clone())
            .unwrap_or_default())
    }

    async fn tags_of(&self, item_id: i64) -> Result<Vec<String>> {
        Ok(self.find(item_id, |s| s.tags.clone()).unwrap_or_default())
    }

    async fn featured_image_url(&self, item_id: i64) -> Result<Option<String>> {
        Ok(self
            .find(item_id, |s| s.featured_image.clone())
            .flatten()
            .filter(|url| !url.is_empty()))
    }

    async fn custom_fields(&self, item_id: i64) -> Result<CustomFields> {
        Ok(self
            .find(item_id, |s| s.custom_fields.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::{CategorySlug, ListingParams, OrderBy, SortOrder};
    use serde_json::json;

    fn stored(id: i64, title: &str, day: u32, categories: &[&str]) -> StoredItem {
        serde_json::from_value(json!({
            "id": id,
            "slug": format!("item-{id}"),
            "title": title,
            "content": format!("Body of {title}"),
            "created": format!("2024-01-{day:02}T10:00:00"),
            "changed": format!("2024-01-{day:02}T10:00:00"),
            "categories": categories
                .iter()
                .map(|c| json!({"name": c.to_uppercase(), "slug": c}))
                .collect::<Vec<_>>(),
        }))
        .unwrap()
    }

    fn news() -> CategorySlug {
        CategorySlug::parse("news").unwrap()
    }

    #[tokio::test]
    async fn filters_by_category() {
        let source = MemoryContentSource::with_items(
            "post",
            vec![
                stored(1, "A", 1, &["news"]),
                stored(2, "B", 2, &["sports"]),
                stored(3, "C", 3, &["news", "sports"]),
            ],
        );
        let items = source.query(&ItemQuery::unpaginated(&news())).await.unwrap();
        let ids: Vec<i64> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[tokio::test]
    async fn default_scope_excludes_drafts_and_other_types() {
        let mut draft = stored(1, "Draft", 1, &["news"]);
        draft.item.status = 0;
        let mut page = stored(2, "Page", 2, &["news"]);
        page.item.item_type = "page".to_string();
        let source = MemoryContentSource::with_items(
            "post",
            vec![draft, page, stored(3, "Live", 3, &["news"])],
        );
        let items = source.query(&ItemQuery::unpaginated(&news())).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 3);
    }

    #[tokio::test]
    async fn paginates_after_sorting() {
        let source = MemoryContentSource::with_items(
            "post",
            (1..=7).map(|i| stored(i, &format!("T{i}"), i as u32, &["news"])).collect(),
        );
        let params = ListingParams {
            per_page: 3,
            page: 2,
            orderby: OrderBy::Id,
            order: SortOrder::Asc,
            ..Default::default()
        };
        let items = source
            .query(&ItemQuery::for_listing(&news(), &params))
            .await
            .unwrap();
        let ids: Vec<i64> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![4, 5, 6]);

        let params = ListingParams { page: 9, ..params };
        let items = source
            .query(&ItemQuery::for_listing(&news(), &params))
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn upsert_replaces_existing() {
        let source = MemoryContentSource::new("post");
        source.upsert(stored(1, "Old", 1, &["news"]));
        source.upsert(stored(1, "New", 1, &["news"]));
        assert_eq!(source.len(), 1);
        let items = source.query(&ItemQuery::unpaginated(&news())).await.unwrap();
        assert_eq!(items[0].title, "New");
        assert!(source.remove(1));
        assert!(source.is_empty());
    }

    #[tokio::test]
    async fn missing_relations_are_empty() {
        let source = MemoryContentSource::with_items("post", vec![stored(1, "A", 1, &["news"])]);
        assert!(source.tags_of(1).await.unwrap().is_empty());
        assert!(source.featured_image_url(1).await.unwrap().is_none());
        assert!(source.custom_fields(1).await.unwrap().is_empty());
        assert!(source.categories_of(99).await.unwrap().is_empty());
    }
}
