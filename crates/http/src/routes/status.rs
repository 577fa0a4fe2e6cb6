//! Status and health check handlers

use crate::state::AppState;
use crate::types::StatusResponse;
use axum::{Router, extract::State, response::Json, routing::get};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Root endpoint reporting the listening port
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        message: format!("Server is running on port {}", state.port),
    })
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(status))
        .route("/health", get(health_check))
}
