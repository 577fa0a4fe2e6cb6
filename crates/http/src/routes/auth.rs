//! Token refresh endpoints
//!
//! Both endpoints read the refresh token from the `x-refresh-token` header,
//! falling back to the session cookie, and answer with a new access token.

use crate::error::HttpError;
use crate::services::{Audience, TokenKind};
use crate::state::AppState;
use crate::types::{
    ADMIN_REFRESH_PATH, REFRESH_TOKEN_HEADER, RefreshTokenResponse, USER_REFRESH_PATH,
};
use axum::{Router, extract::State, response::Json, routing::post};
use http::HeaderMap;
use http::header::COOKIE;
use tracing::{info, warn};

/// Refresh a customer session
pub async fn refresh_user_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RefreshTokenResponse>, HttpError> {
    refresh(&state, &headers, Audience::User).map(Json)
}

/// Refresh an admin session
pub async fn refresh_admin_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RefreshTokenResponse>, HttpError> {
    refresh(&state, &headers, Audience::Admin).map(Json)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(USER_REFRESH_PATH, post(refresh_user_token))
        .route(ADMIN_REFRESH_PATH, post(refresh_admin_token))
}

fn refresh(
    state: &AppState,
    headers: &HeaderMap,
    audience: Audience,
) -> Result<RefreshTokenResponse, HttpError> {
    let token = refresh_token(headers, audience)
        .ok_or_else(|| HttpError::AuthenticationFailed("Refresh token is required".to_string()))?;

    let claims = state
        .jwt
        .validate(&token, &[audience], TokenKind::Refresh)
        .inspect_err(|e| warn!(audience = audience.as_str(), error = %e, "Refresh rejected"))?;

    let access_token = state.jwt.issue(&claims.sub, audience, TokenKind::Access)?;
    info!(subject = %claims.sub, audience = audience.as_str(), "Issued access token");

    Ok(RefreshTokenResponse::issued(access_token))
}

/// Cookie name the web frontends keep the refresh token under
fn cookie_name(audience: Audience) -> &'static str {
    match audience {
        Audience::User => "refreshToken",
        Audience::Admin => "adminRefreshToken",
    }
}

fn refresh_token(headers: &HeaderMap, audience: Audience) -> Option<String> {
    let from_header = headers
        .get(REFRESH_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = from_header {
        return Some(token.to_string());
    }

    let name = cookie_name(audience);
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
