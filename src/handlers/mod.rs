pub mod analyze;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub const ANALYZE_ROUTE: &str = "/api/analyze";

// Base64 inflates photos by a third; leave headroom for ~9 MiB images.
const MAX_BODY_BYTES: usize = 12 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            ANALYZE_ROUTE,
            post(analyze::analyze_handler).fallback(analyze::method_not_allowed),
        )
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
