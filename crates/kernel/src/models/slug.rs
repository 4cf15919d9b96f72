//! Category slugs and the listing configuration they are parsed from.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Short identifier naming one category.
///
/// Always trimmed and non-empty. Uniqueness is not enforced: a listing
/// configuration naming the same slug twice yields two entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategorySlug(String);

impl CategorySlug {
    /// Normalize a raw slug, returning `None` for empty or whitespace-only input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategorySlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CategorySlug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Operator-supplied comma-separated list of category slugs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Raw value as entered, commas and whitespace included.
    #[serde(default)]
    pub category_slugs: String,
}

impl ListingConfig {
    pub fn new(category_slugs: impl Into<String>) -> Self {
        Self {
            category_slugs: category_slugs.into(),
        }
    }

    /// Split on commas, trim, and drop empty entries. Order and duplicates
    /// are preserved.
    pub fn slugs(&self) -> Vec<CategorySlug> {
        self.category_slugs
            .split(',')
            .filter_map(CategorySlug::parse)
            .collect()
    }
}
