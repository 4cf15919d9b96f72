//! Content save hook.
//!
//! The content system reports saves here. Events are queued for the sync
//! worker and acknowledged immediately; the caller never waits on a push.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::AppResult;
use crate::state::AppState;
use crate::sync::ItemSaved;

/// Create the hook router. Callers add the auth layer.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/hooks/item-saved", post(item_saved))
}

async fn item_saved(
    State(state): State<AppState>,
    body: Result<Json<ItemSaved>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let Json(event) = body?;
    debug!(item_id = event.item_id, item_type = %event.item_type, "item save reported");
    state.sync_queue().enqueue(event)?;
    Ok((StatusCode::ACCEPTED, Json(json!({"queued": true}))))
}
