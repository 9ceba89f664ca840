use crate::store::StoreError;
use crate::types::TransferResponse;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

/// Everything that stops a transfer invocation from being handled. Gateway failures are not in
/// here; they are recorded on the call and reported as a normal outcome.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("failed to read records: {0}")]
    StoreRead(#[source] StoreError),
    #[error("failed to persist call record: {0}")]
    StoreWrite(#[source] StoreError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

/// A handler error together with whatever call id we managed to extract before failing.
#[derive(Debug)]
pub struct AppError {
    pub call_id: Option<String>,
    pub error: HandlerError,
}

impl AppError {
    pub fn new(call_id: Option<String>, error: HandlerError) -> Self {
        Self { call_id, error }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

pub fn handle_error(e: &AppError) {
    match &e.call_id {
        Some(call_id) => error!(call_id = %call_id, error = %e, "transfer invocation failed"),
        None => error!(error = %e, "transfer invocation failed"),
    }
}

// Bad input and internal failures share one status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        handle_error(&self);
        let body = TransferResponse {
            message: format!("Error processing transfer: {}", self.error),
            call_id: self.call_id,
            success: false,
            transfer_details: None,
            status: Some("error".to_string()),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
