//! # Request Extractors
//!
//! Path and body extractors whose rejections render as [`ApiError`], so
//! malformed ids and bodies get the same JSON error body as every other
//! failure.

use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::web::errors::ApiError;

/// Numeric storm id taken from the `:id` path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StormId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for StormId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                debug!(path = %parts.uri.path(), "Rejected storm id");
                ApiError::bad_request(rejection.body_text())
            })?;
        Ok(Self(id))
    }
}

/// JSON request body
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        Ok(Self(value))
    }
}
