//! Route definitions grouped by resource.

use axum::routing::get;
use axum::Router;

use crate::web::handlers;
use crate::web::state::AppState;

/// Liveness and readiness probes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::liveness_check))
        .route("/health/ready", get(handlers::health::readiness_check))
}

pub fn storm_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/storms",
            get(handlers::storms::list_storms).post(handlers::storms::create_storm),
        )
        .route("/storms/count", get(handlers::storms::count_storms))
        .route("/storms/:id", get(handlers::storms::get_storm))
}
