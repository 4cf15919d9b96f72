//! HTTP route handlers.

pub mod admin;
pub mod health;
pub mod hooks;
pub mod listing;
pub mod metrics;
pub mod registry;

pub use listing::ListingContext;
pub use registry::{
    AxumRegistry, Endpoint, Registration, RouteRegistrar, RouteRegistry, RouteTable,
    derive_endpoints,
};

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Method, Request};
use axum::response::Response;
use tower::ServiceExt;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::Config;
use crate::state::AppState;

/// Build the full application router.
///
/// Fixed routes are matched first; everything else is handed to the
/// listing route table current at request time.
pub fn app(state: AppState) -> Router {
    let admin = Router::new()
        .merge(admin::router())
        .merge(hooks::router())
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::require_admin_token,
        ));

    let cors = build_cors_layer(state.config());

    Router::new()
        .merge(health::router())
        .merge(metrics::router())
        .merge(admin)
        .fallback(dispatch_listing)
        // TraceLayer → CORS → routes
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn dispatch_listing(State(state): State<AppState>, request: Request<Body>) -> Response {
    let router = state.route_table().current();
    match router.oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    }
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::PUT, Method::OPTIONS];

    if config.cors_allowed_origins.len() == 1 && config.cors_allowed_origins[0] == "*" {
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(methods)
            .allow_headers(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_allowed_origins
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "ignoring unparseable CORS origin");
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(tower_http::cors::Any)
    }
}
