//! Routes that require a signed-in caller

use crate::middleware::require_bearer;
use crate::services::Claims;
use crate::state::AppState;
use axum::{Extension, Router, middleware::from_fn_with_state, response::Json, routing::get};
use serde::{Deserialize, Serialize};

/// Path of the session introspection endpoint
pub const SESSION_PATH: &str = "/api/session";

/// Who the presented access token belongs to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub subject: String,
    pub audience: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: i64,
}

/// Envelope matching the refresh endpoint responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub data: SessionInfo,
    pub error: bool,
    pub success: bool,
}

pub async fn current_session(Extension(claims): Extension<Claims>) -> Json<SessionResponse> {
    Json(SessionResponse {
        data: SessionInfo {
            subject: claims.sub,
            audience: claims.aud.as_str().to_string(),
            expires_at: claims.exp,
        },
        error: false,
        success: true,
    })
}

/// Bearer-protected routes
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route(SESSION_PATH, get(current_session))
        .route_layer(from_fn_with_state(state, require_bearer))
}
