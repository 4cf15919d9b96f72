//! Content item records and their wire representation.
//!
//! [`ContentItem`] is the raw row a content source returns for a listing
//! query. [`SerializedItem`] is what listing endpoints and collector pushes
//! emit, with categories, tags, featured media, and custom fields attached.

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Timestamp format used for the `date` wire field.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Raw content item as read from a content source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContentItem {
    /// Stable numeric identifier.
    pub id: i64,

    /// URL slug of the item itself.
    pub slug: String,

    pub title: String,

    /// Raw body, unfiltered.
    pub content: String,

    /// Content type machine name (e.g. "post", "page").
    #[serde(default = "default_item_type")]
    pub item_type: String,

    /// Publication status (0 = unpublished, 1 = published).
    #[serde(default = "default_status")]
    pub status: i16,

    /// When the item was created.
    pub created: NaiveDateTime,

    /// When the item was last changed.
    pub changed: NaiveDateTime,
}

fn default_item_type() -> String {
    "post".to_string()
}

fn default_status() -> i16 {
    1
}

impl ContentItem {
    /// Check if this item is published.
    pub fn is_published(&self) -> bool {
        self.status == 1
    }

    /// Creation timestamp rendered for the wire.
    pub fn date_string(&self) -> String {
        self.created.format(DATE_FORMAT).to_string()
    }
}

/// One category an item belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CategoryRef {
    pub name: String,
    pub slug: String,
}

/// Arbitrary custom-field value, passed through without assuming a shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Sequence(Vec<FieldValue>),
    Mapping(IndexMap<String, FieldValue>),
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Bool(b),
            serde_json::Value::Number(n) => FieldValue::Number(n),
            serde_json::Value::String(s) => FieldValue::String(s),
            serde_json::Value::Array(items) => {
                FieldValue::Sequence(items.into_iter().map(FieldValue::from).collect())
            }
            serde_json::Value::Object(map) => FieldValue::Mapping(
                map.into_iter()
                    .map(|(k, v)| (k, FieldValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Field name to value, in the order the content source reports them.
pub type CustomFields = IndexMap<String, FieldValue>;

/// Wire form of a content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedItem {
    #[serde(rename = "ID")]
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub date: String,
    /// Every category the item belongs to, not just the one requested.
    pub categories: Vec<CategoryRef>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub custom_fields: CustomFields,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bare(id: i64) -> SerializedItem {
        SerializedItem {
            id,
            slug: "hello".to_string(),
            title: "Hello".to_string(),
            content: "<p>Body</p>".to_string(),
            date: "2024-03-01 09:30:00".to_string(),
            categories: vec![],
            tags: vec![],
            featured_image: None,
            custom_fields: CustomFields::new(),
        }
    }

    #[test]
    fn empty_tags_serialize_as_array() {
        let value = serde_json::to_value(bare(1)).unwrap();
        assert_eq!(value["tags"], json!([]));
        assert_eq!(value["custom_fields"], json!({}));
    }

    #[test]
    fn id_uses_uppercase_key() {
        let value = serde_json::to_value(bare(42)).unwrap();
        assert_eq!(value["ID"], 42);
        assert!(value.get("id").is_none());
    }

    #[test]
    fn missing_featured_image_is_omitted() {
        let value = serde_json::to_value(bare(1)).unwrap();
        assert!(value.get("featured_image").is_none());

        let mut item = bare(1);
        item.featured_image = Some("https://cdn.example.com/a.jpg".to_string());
        let value = serde_json::to_value(item).unwrap();
        assert_eq!(value["featured_image"], "https://cdn.example.com/a.jpg");
    }

    #[test]
    fn field_values_pass_through_unchanged() {
        let raw = json!({
            "subtitle": "Second line",
            "rating": 4.5,
            "count": 3,
            "pinned": false,
            "gallery": [1, "two", null],
            "author": {"name": "Ann", "links": {"web": "https://ann.example"}}
        });
        let fields: CustomFields = serde_json::from_value(raw.clone()).unwrap();
        assert!(matches!(fields["pinned"], FieldValue::Bool(false)));
        assert!(matches!(fields["gallery"], FieldValue::Sequence(_)));
        assert!(matches!(fields["author"], FieldValue::Mapping(_)));
        assert_eq!(serde_json::to_value(&fields).unwrap(), raw);
    }

    #[test]
    fn field_value_from_json_keeps_order() {
        let value = FieldValue::from(json!({"z": 1, "a": 2, "m": 3}));
        let FieldValue::Mapping(map) = value else {
            panic!("expected mapping");
        };
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn date_string_uses_wire_format() {
        let item = ContentItem {
            id: 1,
            slug: "s".to_string(),
            title: "t".to_string(),
            content: String::new(),
            item_type: "post".to_string(),
            status: 1,
            created: NaiveDateTime::parse_from_str("2024-03-01 09:30:05", DATE_FORMAT).unwrap(),
            changed: NaiveDateTime::parse_from_str("2024-03-02 10:00:00", DATE_FORMAT).unwrap(),
        };
        assert_eq!(item.date_string(), "2024-03-01 09:30:05");
        assert!(item.is_published());
    }
}
