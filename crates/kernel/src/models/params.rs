//! Listing request parameters and their validators.
//!
//! Each listing endpoint carries the same five parameters. Validation runs
//! over the raw query-string values before any content query is built; a
//! request with a failing value never reaches the query translator.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Sort field accepted by `orderby`. Matching is case-sensitive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderBy {
    #[default]
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "title")]
    Title,
    #[serde(rename = "modified")]
    Modified,
    #[serde(rename = "ID")]
    Id,
}

impl OrderBy {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderBy::Date => "date",
            OrderBy::Title => "title",
            OrderBy::Modified => "modified",
            OrderBy::Id => "ID",
        }
    }
}

impl FromStr for OrderBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date" => Ok(OrderBy::Date),
            "title" => Ok(OrderBy::Title),
            "modified" => Ok(OrderBy::Modified),
            "ID" => Ok(OrderBy::Id),
            other => Err(format!(
                "'{other}' is not one of date, title, modified, ID"
            )),
        }
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction accepted by `order`. Matching is case-insensitive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ASC" => Ok(SortOrder::Asc),
            "DESC" => Ok(SortOrder::Desc),
            _ => Err(format!("'{s}' is not one of ASC, DESC")),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated listing parameters, defaults applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingParams {
    pub per_page: u32,
    pub page: u32,
    pub search: String,
    pub orderby: OrderBy,
    pub order: SortOrder,
}

impl Default for ListingParams {
    fn default() -> Self {
        Self {
            per_page: DEFAULT_PER_PAGE,
            page: DEFAULT_PAGE,
            search: String::new(),
            orderby: OrderBy::default(),
            order: SortOrder::default(),
        }
    }
}

pub const DEFAULT_PER_PAGE: u32 = 10;
pub const DEFAULT_PAGE: u32 = 1;

/// A validated parameter value, ready to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    PerPage(u32),
    Page(u32),
    Search(String),
    OrderBy(OrderBy),
    Order(SortOrder),
}

impl ListingParams {
    /// Set the field a validated value belongs to.
    pub fn apply(&mut self, value: ParamValue) {
        match value {
            ParamValue::PerPage(n) => self.per_page = n,
            ParamValue::Page(n) => self.page = n,
            ParamValue::Search(s) => self.search = s,
            ParamValue::OrderBy(o) => self.orderby = o,
            ParamValue::Order(o) => self.order = o,
        }
    }
}

/// One declared request parameter: name, default, and validator.
///
/// The validator parses the raw value; a parameter is only ever applied
/// through the value its validator returned.
#[derive(Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub default: Option<&'static str>,
    pub validate: fn(&str) -> Result<ParamValue, String>,
}

impl fmt::Debug for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamSpec")
            .field("name", &self.name)
            .field("default", &self.default)
            .finish()
    }
}

/// The parameter set every listing endpoint carries.
pub const LISTING_PARAMS: &[ParamSpec] = &[
    ParamSpec {
        name: "per_page",
        default: Some("10"),
        validate: validate_per_page,
    },
    ParamSpec {
        name: "page",
        default: Some("1"),
        validate: validate_page,
    },
    ParamSpec {
        name: "search",
        default: None,
        validate: validate_search,
    },
    ParamSpec {
        name: "orderby",
        default: Some("date"),
        validate: validate_orderby,
    },
    ParamSpec {
        name: "order",
        default: Some("DESC"),
        validate: validate_order,
    },
];

/// Per-parameter failure reasons, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParamErrors(pub IndexMap<String, String>);

impl ParamErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }
}

impl fmt::Display for ParamErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.names();
        write!(f, "invalid parameter(s): {}", names.join(", "))
    }
}

/// Parse a base-10 positive integer that fits in u32.
pub fn parse_positive(raw: &str) -> Result<u32, String> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("'{raw}' is not a positive integer"));
    }
    match raw.parse::<u32>() {
        Ok(0) => Err("must be greater than zero".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("'{raw}' is out of range")),
    }
}

fn validate_per_page(raw: &str) -> Result<ParamValue, String> {
    parse_positive(raw).map(ParamValue::PerPage)
}

fn validate_page(raw: &str) -> Result<ParamValue, String> {
    parse_positive(raw).map(ParamValue::Page)
}

fn validate_search(raw: &str) -> Result<ParamValue, String> {
    Ok(ParamValue::Search(raw.to_string()))
}

fn validate_orderby(raw: &str) -> Result<ParamValue, String> {
    raw.parse().map(ParamValue::OrderBy)
}

fn validate_order(raw: &str) -> Result<ParamValue, String> {
    raw.parse().map(ParamValue::Order)
}

/// Run every declared validator over the raw query and apply the results.
///
/// Unknown query keys are ignored. Parameters absent from the query take
/// their declared default, which goes through the same validator. Every
/// failure is collected before returning.
pub fn validate_query(
    specs: &[ParamSpec],
    query: &HashMap<String, String>,
) -> Result<ListingParams, ParamErrors> {
    let mut errors = IndexMap::new();
    let mut params = ListingParams::default();

    for spec in specs {
        let Some(raw) = query.get(spec.name).map(String::as_str).or(spec.default) else {
            continue;
        };
        match (spec.validate)(raw) {
            Ok(value) => params.apply(value),
            Err(reason) => {
                errors.insert(spec.name.to_string(), reason);
            }
        }
    }

    if errors.is_empty() {
        Ok(params)
    } else {
        Err(ParamErrors(errors))
    }
}
