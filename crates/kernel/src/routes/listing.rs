//! Listing endpoint handler.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::response::{IntoResponse, Response};
use tracing::debug;
use url::form_urlencoded;

use crate::content::{ContentSource, ItemSerializer};
use crate::error::{AppError, AppResult};
use crate::metrics::Metrics;
use crate::models::{CategorySlug, ParamSpec, SerializedItem, params};
use crate::query::ItemQuery;

/// Everything a listing endpoint needs to answer a request.
#[derive(Clone)]
pub struct ListingContext {
    pub source: Arc<dyn ContentSource>,
    pub serializer: ItemSerializer,
    pub metrics: Arc<Metrics>,
}

impl ListingContext {
    pub fn new(source: Arc<dyn ContentSource>, metrics: Arc<Metrics>) -> Self {
        Self {
            serializer: ItemSerializer::new(source.clone()),
            source,
            metrics,
        }
    }
}

/// Decode a raw query string into key/value pairs.
///
/// Decoding is lossy and never fails: malformed percent escapes stay
/// literal and reach the validators as-is. A repeated key keeps its last
/// value.
pub fn decode_query(raw: Option<&str>) -> HashMap<String, String> {
    raw.map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// Answer one listing request for `slug`.
pub async fn list_category(
    ctx: ListingContext,
    slug: CategorySlug,
    specs: &'static [ParamSpec],
    raw_query: Option<String>,
) -> Response {
    let start = Instant::now();
    let query = decode_query(raw_query.as_deref());

    let response = match fetch(&ctx, &slug, specs, &query).await {
        Ok(items) => Json(items).into_response(),
        Err(e) => e.into_response(),
    };

    ctx.metrics.record_listing(
        slug.as_str(),
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}

async fn fetch(
    ctx: &ListingContext,
    slug: &CategorySlug,
    specs: &'static [ParamSpec],
    query: &HashMap<String, String>,
) -> AppResult<Vec<SerializedItem>> {
    let listing = params::validate_query(specs, query).map_err(|errors| {
        ctx.metrics.record_rejection();
        debug!(slug = %slug, params = ?errors.names(), "listing parameters rejected");
        AppError::Validation(errors)
    })?;

    let items = ctx
        .source
        .query(&ItemQuery::for_listing(slug, &listing))
        .await?;

    Ok(ctx.serializer.serialize_all(items).await?)
}
