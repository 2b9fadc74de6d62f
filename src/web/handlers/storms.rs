//! # Storm Handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::info;

use crate::models::{NewStorm, Storm};
use crate::web::errors::{ApiError, ApiResult};
use crate::web::extractors::{JsonBody, StormId};
use crate::web::state::AppState;

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

/// GET /storms
pub async fn list_storms(State(state): State<AppState>) -> ApiResult<Json<Vec<Storm>>> {
    let storms = state.repository.find_all().await?;
    Ok(Json(storms))
}

/// GET /storms/count
pub async fn count_storms(State(state): State<AppState>) -> ApiResult<Json<CountResponse>> {
    let count = state.repository.count().await?;
    Ok(Json(CountResponse { count }))
}

/// GET /storms/:id
pub async fn get_storm(
    State(state): State<AppState>,
    StormId(id): StormId,
) -> ApiResult<Json<Storm>> {
    state
        .repository
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// POST /storms
///
/// The body carries no id; the stored record comes back with 201.
pub async fn create_storm(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<NewStorm>,
) -> ApiResult<(StatusCode, Json<Storm>)> {
    let saved = state.repository.save(&Storm::from(payload)).await?;
    info!(storm_id = ?saved.id(), storm_type = %saved.storm_type(), "Storm recorded");
    Ok((StatusCode::CREATED, Json(saved)))
}
