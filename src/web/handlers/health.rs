//! # Health Check Handlers
//!
//! Liveness and readiness probes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, warn};

use crate::messaging::MessagingStatus;
use crate::web::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub timestamp: String,
    pub environment: String,
    pub database: DatabaseCheck,
    pub messaging: MessagingStatus,
}

#[derive(Debug, Serialize)]
pub struct DatabaseCheck {
    pub status: String,
    pub message: Option<String>,
    pub duration_ms: u64,
}

/// GET /health
///
/// Always 200 while the process is serving.
pub async fn liveness_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// GET /health/ready
///
/// 200 when the repository answers a count, 503 otherwise.
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let start = Instant::now();
    let result = state.repository.count().await;
    let duration_ms = start.elapsed().as_millis() as u64;

    let (status_code, database) = match result {
        Ok(count) => {
            debug!(count = count, duration_ms = duration_ms, "Readiness check passed");
            (
                StatusCode::OK,
                DatabaseCheck {
                    status: "healthy".to_string(),
                    message: None,
                    duration_ms,
                },
            )
        }
        Err(e) => {
            warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                DatabaseCheck {
                    status: "unhealthy".to_string(),
                    message: Some(e.to_string()),
                    duration_ms,
                },
            )
        }
    };

    let status = if status_code == StatusCode::OK {
        "ready"
    } else {
        "not_ready"
    };

    (
        status_code,
        Json(ReadinessResponse {
            status: status.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            environment: state.environment.clone(),
            database,
            messaging: state.messaging.clone(),
        }),
    )
}
