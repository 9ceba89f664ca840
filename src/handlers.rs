use crate::error::AppError;
use crate::transfer::handle_transfer;
use crate::types::{AppState, TransferRequest, TransferResponse};

use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::trace;

/// Entry point for the conversation manager's transfer trigger. The body is parsed by hand so
/// that malformed input gets the same error response as every other failure.
pub async fn transfer_handler(
    State(app_state): State<Arc<AppState>>,
    body: String,
) -> Result<Json<TransferResponse>, AppError> {
    trace!(body=%body, "transfer request body");
    let request = TransferRequest::from_event(&body).map_err(|e| AppError::new(None, e))?;
    let response = handle_transfer(&app_state, request).await?;
    Ok(Json(response))
}

pub async fn health_handler() -> &'static str {
    "OK"
}
