//! Query translation: validated listing parameters to content queries.
//!
//! A listing request and a dispatcher resync both end up here. The result is
//! an [`ItemQuery`] that every content source understands; the Postgres
//! source renders it to SQL through [`ItemQueryBuilder`].

mod builder;

pub use builder::ItemQueryBuilder;

use std::cmp::Ordering;

use serde::Serialize;

use crate::models::{CategorySlug, ContentItem, ListingParams, OrderBy, SortOrder};

/// Backend-neutral content query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemQuery {
    /// Exact category slug to filter on.
    pub category: CategorySlug,

    /// Page size; `None` returns every match.
    pub limit: Option<u32>,

    /// 1-based page number.
    pub page: u32,

    /// Free-text search; empty means no filter.
    pub search: String,

    pub orderby: OrderBy,
    pub order: SortOrder,
}

impl ItemQuery {
    /// Translate a validated listing request for one category.
    pub fn for_listing(category: &CategorySlug, params: &ListingParams) -> Self {
        Self {
            category: category.clone(),
            limit: Some(params.per_page),
            page: params.page,
            search: params.search.clone(),
            orderby: params.orderby,
            order: params.order,
        }
    }

    /// Every item in a category, default ordering (newest first).
    pub fn unpaginated(category: &CategorySlug) -> Self {
        Self {
            category: category.clone(),
            limit: None,
            page: 1,
            search: String::new(),
            orderby: OrderBy::Date,
            order: SortOrder::Desc,
        }
    }

    /// Rows to skip before the requested page.
    pub fn offset(&self) -> u64 {
        match self.limit {
            Some(limit) => u64::from(self.page.saturating_sub(1)) * u64::from(limit),
            None => 0,
        }
    }

    /// Whitespace-separated search terms; each must match.
    pub fn search_terms(&self) -> Vec<&str> {
        self.search.split_whitespace().collect()
    }

    /// Whether `item` satisfies the search terms (title or content,
    /// case-insensitive).
    pub fn matches_search(&self, item: &ContentItem) -> bool {
        let terms = self.search_terms();
        if terms.is_empty() {
            return true;
        }
        let title = item.title.to_lowercase();
        let content = item.content.to_lowercase();
        terms.iter().all(|term| {
            let term = term.to_lowercase();
            title.contains(&term) || content.contains(&term)
        })
    }

    /// Compare two items in result order.
    ///
    /// Ties on the sort key fall back to identifier ascending.
    pub fn compare(&self, a: &ContentItem, b: &ContentItem) -> Ordering {
        let primary = match self.orderby {
            OrderBy::Date => a.created.cmp(&b.created),
            OrderBy::Title => a.title.cmp(&b.title),
            OrderBy::Modified => a.changed.cmp(&b.changed),
            OrderBy::Id => a.id.cmp(&b.id),
        };
        let primary = match self.order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}
