//! Catalist test utilities.
//!
//! Helpers for integration testing: content fixtures in the seed-file
//! shape, and assertion utilities for listing responses.

use serde_json::{Value as JsonValue, json};

/// Create a published test item with default values.
pub fn test_item(id: i64, title: &str) -> TestItem {
    TestItem {
        id,
        slug: slugify(title),
        title: title.to_string(),
        content: String::new(),
        item_type: "post".to_string(),
        status: 1,
        created: "2024-01-01T00:00:00".to_string(),
        changed: "2024-01-01T00:00:00".to_string(),
        categories: Vec::new(),
        tags: Vec::new(),
        featured_image: None,
        custom_fields: json!({}),
    }
}

fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// A test item builder for creating content fixtures.
#[derive(Debug, Clone)]
pub struct TestItem {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub item_type: String,
    pub status: i16,
    /// `YYYY-MM-DDTHH:MM:SS`
    pub created: String,
    pub changed: String,
    pub categories: Vec<(String, String)>,
    pub tags: Vec<String>,
    pub featured_image: Option<String>,
    pub custom_fields: JsonValue,
}

impl TestItem {
    /// Set the body.
    pub fn with_content(mut self, content: &str) -> Self {
        self.content = content.to_string();
        self
    }

    /// Set the content type.
    pub fn of_type(mut self, item_type: &str) -> Self {
        self.item_type = item_type.to_string();
        self
    }

    /// Set as unpublished.
    pub fn unpublished(mut self) -> Self {
        self.status = 0;
        self
    }

    /// Set the publication timestamp, e.g. `2024-03-01T10:00:00`.
    pub fn created_at(mut self, created: &str) -> Self {
        self.created = created.to_string();
        self
    }

    /// Set the last-modified timestamp.
    pub fn changed_at(mut self, changed: &str) -> Self {
        self.changed = changed.to_string();
        self
    }

    /// Add a category; its display name is derived from the slug.
    pub fn in_category(mut self, slug: &str) -> Self {
        let mut name: Vec<char> = slug.chars().collect();
        if let Some(first) = name.first_mut() {
            *first = first.to_ascii_uppercase();
        }
        self.categories
            .push((name.into_iter().collect(), slug.to_string()));
        self
    }

    /// Add a tag.
    pub fn tagged(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    /// Set the featured image URL.
    pub fn with_featured_image(mut self, url: &str) -> Self {
        self.featured_image = Some(url.to_string());
        self
    }

    /// Add a custom field.
    pub fn with_field(mut self, name: &str, value: JsonValue) -> Self {
        if let Some(obj) = self.custom_fields.as_object_mut() {
            obj.insert(name.to_string(), value);
        }
        self
    }

    /// Seed-file JSON for this item.
    pub fn to_json(&self) -> JsonValue {
        let mut value = json!({
            "id": self.id,
            "slug": self.slug,
            "title": self.title,
            "content": self.content,
            "item_type": self.item_type,
            "status": self.status,
            "created": self.created,
            "changed": self.changed,
            "categories": self
                .categories
                .iter()
                .map(|(name, slug)| json!({"name": name, "slug": slug}))
                .collect::<Vec<_>>(),
            "tags": self.tags,
            "custom_fields": self.custom_fields,
        });
        if let (Some(url), Some(obj)) = (&self.featured_image, value.as_object_mut()) {
            obj.insert("featured_image".to_string(), json!(url));
        }
        value
    }
}

/// Seed-file JSON for a set of items.
pub fn seed(items: &[TestItem]) -> JsonValue {
    JsonValue::Array(items.iter().map(TestItem::to_json).collect())
}

/// Assertion helpers for listing responses.
pub mod assert {
    use serde_json::Value;

    /// Assert that a JSON value has a specific key.
    pub fn has_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_some(),
            "Expected JSON to have key '{}', got: {}",
            key,
            value
        );
    }

    /// Assert that a JSON value lacks a specific key.
    pub fn lacks_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_none(),
            "Expected JSON to lack key '{}', got: {}",
            key,
            value
        );
    }

    /// Assert that a listing body is an array with these `ID`s, in order.
    pub fn ids(body: &Value, expected: &[i64]) {
        let actual: Vec<i64> = body
            .as_array()
            .unwrap_or_else(|| panic!("Expected JSON array, got: {body}"))
            .iter()
            .filter_map(|item| item["ID"].as_i64())
            .collect();
        assert_eq!(actual, expected, "listing IDs mismatch in {body}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_builder() {
        let item = test_item(7, "Hello, World")
            .unpublished()
            .in_category("news")
            .tagged("rust")
            .with_field("rating", json!(5));

        assert_eq!(item.slug, "hello-world");
        assert_eq!(item.status, 0);
        assert_eq!(item.categories, vec![("News".to_string(), "news".to_string())]);

        let value = item.to_json();
        assert_eq!(value["id"], 7);
        assert_eq!(value["categories"][0]["slug"], "news");
        assert_eq!(value["custom_fields"]["rating"], 5);
        assert::lacks_key(&value, "featured_image");
    }

    #[test]
    fn test_seed_array() {
        let items = [
            test_item(1, "One").with_featured_image("https://img/1.jpg"),
            test_item(2, "Two"),
        ];
        let value = seed(&items);
        assert_eq!(value.as_array().map(Vec::len), Some(2));
        assert::has_key(&value[0], "featured_image");
    }

    #[test]
    fn test_ids_assertion() {
        let body = json!([{"ID": 3}, {"ID": 1}]);
        assert::ids(&body, &[3, 1]);
    }
}
