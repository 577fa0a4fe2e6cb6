//! HTTP route handlers

pub mod auth;
pub mod session;
pub mod status;

use crate::state::AppState;
use axum::Router;

/// Routes that need no bearer token: status, health and token refresh
pub fn router() -> Router<AppState> {
    Router::new().merge(status::router()).merge(auth::router())
}

/// Public routes plus the bearer-protected ones
pub fn api_router(state: AppState) -> Router<AppState> {
    router().merge(session::router(state))
}
