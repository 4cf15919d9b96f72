//! Postgres-backed content source.
//!
//! Reads the content schema owned by the publishing system:
//!
//! - `item(id, slug, title, content, item_type, status, created, changed,
//!   featured_media_url)`
//! - `category(id, name, slug)` and `item_category(item_id, category_id, weight)`
//! - `tag(id, name)` and `item_tag(item_id, tag_id, weight)`
//! - `item_field(item_id, name, value jsonb, weight)`
//!
//! Nothing here writes.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use super::ContentSource;
use crate::db;
use crate::models::{CategoryRef, ContentItem, CustomFields, FieldValue};
use crate::query::{ItemQuery, ItemQueryBuilder};

/// Content source reading from PostgreSQL.
#[derive(Clone)]
pub struct PgContentSource {
    pool: PgPool,
    item_type: String,
}

impl PgContentSource {
    /// Create a source listing items of `item_type`.
    pub fn new(pool: PgPool, item_type: impl Into<String>) -> Self {
        Self {
            pool,
            item_type: item_type.into(),
        }
    }
}

impl std::fmt::Debug for PgContentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgContentSource")
            .field("item_type", &self.item_type)
            .finish()
    }
}

#[async_trait]
impl ContentSource for PgContentSource {
    async fn query(&self, query: &ItemQuery) -> Result<Vec<ContentItem>> {
        let sql = ItemQueryBuilder::new(query, &self.item_type).build();
        debug!(sql = %sql, "content listing query");

        let items = sqlx::query_as::<_, ContentItem>(&sql)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("failed to list items in category '{}'", query.category))?;

        Ok(items)
    }

    async fn categories_of(&self, item_id: i64) -> Result<Vec<CategoryRef>> {
        let categories = sqlx::query_as::<_, CategoryRef>(
            r#"
            SELECT c.name, c.slug
            FROM item_category ic
            JOIN category c ON c.id = ic.category_id
            WHERE ic.item_id = $1
            ORDER BY ic.weight, c.name
            "#,
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to load item categories")?;

        Ok(categories)
    }

    async fn tags_of(&self, item_id: i64) -> Result<Vec<String>> {
        let tags = sqlx::query_scalar::<_, String>(
            r#"
            SELECT t.name
            FROM item_tag it
            JOIN tag t ON t.id = it.tag_id
            WHERE it.item_id = $1
            ORDER BY it.weight, t.name
            "#,
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to load item tags")?;

        Ok(tags)
    }

    async fn featured_image_url(&self, item_id: i64) -> Result<Option<String>> {
        let url = sqlx::query_scalar::<_, Option<String>>(
            "SELECT featured_media_url FROM item WHERE id = $1",
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to load featured media")?;

        Ok(url.flatten().filter(|u| !u.is_empty()))
    }

    async fn custom_fields(&self, item_id: i64) -> Result<CustomFields> {
        #[derive(sqlx::FromRow)]
        struct FieldRow {
            name: String,
            value: serde_json::Value,
        }

        let rows = sqlx::query_as::<_, FieldRow>(
            "SELECT name, value FROM item_field WHERE item_id = $1 ORDER BY weight, name",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to load custom fields")?;

        Ok(rows
            .into_iter()
            .map(|row| (row.name, FieldValue::from(row.value)))
            .collect())
    }

    async fn healthy(&self) -> bool {
        db::check_health(&self.pool).await
    }
}
