//! dnsconfig-webhook library
//!
//! A Kubernetes mutating admission webhook that sets `spec.dnsConfig` on every
//! admitted Pod to a configured value, reloading that value from a mounted
//! file without restarts.

pub mod admission;
pub mod api;
pub mod config;
pub mod dns;
pub mod error;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::admission::MAX_REVIEW_BYTES;
use crate::api::AppState;

/// Create the application router with the given state
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Admission
        .route(
            "/mutate",
            post(admission::mutate_handler).layer(DefaultBodyLimit::max(MAX_REVIEW_BYTES)),
        )
        // Metrics (Prometheus)
        .route("/metrics", get(api::metrics::metrics_handler))
        .layer(TraceLayer::new_for_http())
        // Health check, left out of request tracing
        .route("/health", get(api::health::health_check))
        .with_state(state)
}
