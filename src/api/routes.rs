//! HTTP route handlers for Axum.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use tracing::warn;

use crate::{
    api::types::{HealthResponse, PredictRequest, PredictResponse},
    error::ServiceError,
};

use super::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

/// Label a batch of texts. A body that is not `{"texts": [string]}` is rejected whole.
pub async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> ApiResult<PredictResponse> {
    let service = Arc::clone(&state.service);
    let prediction = tokio::task::spawn_blocking(move || service.predict(&request.texts))
        .await
        .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?
        .map_err(into_response_error)?;
    Ok(Json(prediction.into()))
}

pub async fn health(State(state): State<AppState>) -> ApiResult<HealthResponse> {
    let health = state.service.health().map_err(into_response_error)?;
    Ok(Json(health.into()))
}

fn into_response_error(err: ServiceError) -> (StatusCode, String) {
    let status = match err {
        ServiceError::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(%err, %status, "request failed");
    (status, err.to_string())
}
