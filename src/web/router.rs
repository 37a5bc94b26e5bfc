//! Router configuration for the stats service.

use axum::{routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{not_found, report, status, AppState};

/// Create the stats router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/report", get(report))
        .fallback(not_found)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
