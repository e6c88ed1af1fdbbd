//! Upstream ingestion endpoint.

use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct ActivityAccepted {
    pub status: &'static str,
    /// Subscribers that accepted the frame.
    pub delivered: usize,
}

/// Handler for `POST /api/activity`.
///
/// Broadcasts the JSON object verbatim. Field validation happens on the
/// viewer side, so a malformed activity still reaches viewers as an error
/// event.
pub async fn post_activity_handler(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<ActivityAccepted>), ApiError> {
    let Json(payload) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    if !payload.is_object() {
        return Err(ApiError::BadRequest(
            "activity payload must be a JSON object".to_string(),
        ));
    }

    let frame = serde_json::to_string(&payload)
        .map_err(|e| ApiError::InternalServerError(e.to_string()))?;
    let delivered = state.hub.broadcast(frame).await;
    tracing::debug!(delivered, "activity broadcast");

    Ok((
        StatusCode::ACCEPTED,
        Json(ActivityAccepted {
            status: "accepted",
            delivered,
        }),
    ))
}
