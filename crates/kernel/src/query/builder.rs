//! Listing SQL builder using SeaQuery.
//!
//! Renders an [`ItemQuery`] against the content schema:
//! `item`, `category`, `item_category`.

use sea_query::{Alias, Expr, Order, PostgresQueryBuilder, Query, SelectStatement};

use super::ItemQuery;
use crate::models::{OrderBy, SortOrder};

/// Columns selected for a [`crate::models::ContentItem`] row.
const ITEM_COLUMNS: &[&str] = &[
    "id",
    "slug",
    "title",
    "content",
    "item_type",
    "status",
    "created",
    "changed",
];

/// Query builder for category listings.
pub struct ItemQueryBuilder<'a> {
    query: &'a ItemQuery,
    item_type: &'a str,
}

impl<'a> ItemQueryBuilder<'a> {
    /// Create a builder scoped to published items of `item_type`.
    pub fn new(query: &'a ItemQuery, item_type: &'a str) -> Self {
        Self { query, item_type }
    }

    /// Build the SELECT with filters, ordering, and pagination.
    pub fn build(&self) -> String {
        let mut select = Query::select();

        for column in ITEM_COLUMNS {
            select.column((Alias::new("item"), Alias::new(*column)));
        }
        select.from(Alias::new("item"));

        // Default listing scope
        select.and_where(Expr::col((Alias::new("item"), Alias::new("status"))).eq(1));
        select.and_where(
            Expr::col((Alias::new("item"), Alias::new("item_type"))).eq(self.item_type),
        );

        select.and_where(Expr::cust_with_values(
            "item.id IN (SELECT ic.item_id FROM item_category ic \
             JOIN category c ON c.id = ic.category_id WHERE c.slug = $1)",
            [self.query.category.as_str()],
        ));

        self.add_search(&mut select);
        self.add_sorts(&mut select);

        if let Some(limit) = self.query.limit {
            select.limit(u64::from(limit));
            select.offset(self.query.offset());
        }

        select.to_string(PostgresQueryBuilder)
    }

    fn add_search(&self, select: &mut SelectStatement) {
        for term in self.query.search_terms() {
            let pattern = format!("%{}%", escape_like_wildcards(term));
            select.and_where(Expr::cust_with_values(
                "(item.title ILIKE $1 OR item.content ILIKE $2)",
                [pattern.clone(), pattern],
            ));
        }
    }

    fn add_sorts(&self, select: &mut SelectStatement) {
        let order = match self.query.order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        };
        let column = match self.query.orderby {
            OrderBy::Date => "created",
            OrderBy::Title => "title",
            OrderBy::Modified => "changed",
            OrderBy::Id => "id",
        };
        select.order_by((Alias::new("item"), Alias::new(column)), order);

        if self.query.orderby != OrderBy::Id {
            select.order_by((Alias::new("item"), Alias::new("id")), Order::Asc);
        }
    }
}

/// Escape SQL LIKE wildcard characters (`%`, `_`, `\`) in a value.
fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
