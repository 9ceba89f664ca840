pub mod config;
pub mod db_types;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod store;
pub mod transfer;
pub mod types;
pub mod vicidial_types;

use crate::types::AppState;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub fn app(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/transfer", post(handlers::transfer_handler))
        .route("/", get(handlers::health_handler))
        .with_state(app_state)
}
