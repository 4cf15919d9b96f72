//! Admin routes for the listing configuration.
//!
//! Writes go through the settings store and are followed by a registration
//! pass, so the route table always reflects the stored configuration.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppResult;
use crate::models::ListingConfig;
use crate::settings;
use crate::state::AppState;

/// Listing settings as shown to admins.
#[derive(Debug, Serialize)]
pub struct ListingSettingsResponse {
    pub category_slugs: String,
    /// Paths currently served.
    pub endpoints: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateListingSettings {
    pub category_slugs: String,
}

#[derive(Debug, Serialize)]
pub struct RebuildResponse {
    pub endpoints: Vec<String>,
}

/// Create the admin router. Callers add the auth layer.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/settings/listing",
            get(get_listing_settings).put(update_listing_settings),
        )
        .route("/api/routes/rebuild", post(rebuild_routes))
}

async fn get_listing_settings(
    State(state): State<AppState>,
) -> AppResult<Json<ListingSettingsResponse>> {
    let config = settings::load_listing_config(state.settings().as_ref()).await?;

    Ok(Json(ListingSettingsResponse {
        category_slugs: config.category_slugs,
        endpoints: state.route_table().paths(),
    }))
}

async fn update_listing_settings(
    State(state): State<AppState>,
    body: Result<Json<UpdateListingSettings>, JsonRejection>,
) -> AppResult<Json<ListingSettingsResponse>> {
    let Json(body) = body?;
    let config = ListingConfig::new(body.category_slugs);
    settings::save_listing_config(state.settings().as_ref(), &config).await?;
    info!(category_slugs = %config.category_slugs, "listing settings updated");

    let endpoints = state.rebuild_routes().await?;

    Ok(Json(ListingSettingsResponse {
        category_slugs: config.category_slugs,
        endpoints,
    }))
}

async fn rebuild_routes(State(state): State<AppState>) -> AppResult<Json<RebuildResponse>> {
    let endpoints = state.rebuild_routes().await?;
    Ok(Json(RebuildResponse { endpoints }))
}
