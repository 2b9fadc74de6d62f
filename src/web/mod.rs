//! # Web API Module
//!
//! Axum REST API over the storm repository.
//!
//! - [`routes`] - route definitions
//! - [`handlers`] - health probes and storm endpoints
//! - [`state`] - shared application state
//! - [`errors`] - API errors and their HTTP responses
//! - [`extractors`] - path and body extractors rejecting with [`ApiError`]

pub mod errors;
pub mod extractors;
pub mod handlers;
pub mod routes;
pub mod state;

use axum::Router;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use errors::{ApiError, ApiResult};
pub use state::AppState;

/// Create the application router with all routes and middleware
pub fn create_app(app_state: AppState) -> Router {
    let request_timeout = Duration::from_millis(app_state.config.request_timeout_ms);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(routes::health_routes())
        .merge(routes::storm_routes())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    info!("Web application created");
    app
}
