use crate::error::HttpError;
use crate::services::{Audience, Claims, TokenKind};
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use http::header::AUTHORIZATION;

/// Reject requests without a valid access token
///
/// The validated [`Claims`] are inserted into the request extensions for
/// downstream handlers. Tokens from either application are accepted.
pub async fn require_bearer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, HttpError> {
    authorize(&state, req, next, &[Audience::User, Audience::Admin]).await
}

async fn authorize(
    state: &AppState,
    mut req: Request,
    next: Next,
    audiences: &[Audience],
) -> Result<Response, HttpError> {
    let claims = authenticate(state, &req, audiences)?;
    tracing::debug!(subject = %claims.sub, audience = ?claims.aud, "Request authenticated");

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

fn authenticate(
    state: &AppState,
    req: &Request,
    audiences: &[Audience],
) -> Result<Claims, HttpError> {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| HttpError::AuthenticationFailed("Missing authorization header".to_string()))?;

    let token = state.jwt.extract_bearer_token(auth_header)?;
    state.jwt.validate(token, audiences, TokenKind::Access)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{JwtConfig, JwtService};
    use axum::{Extension, Router, body::Body, middleware::from_fn_with_state, routing::get};
    use chrono::Duration;
    use http::StatusCode;
    use tower::ServiceExt;

    fn state() -> AppState {
        AppState::new(
            JwtService::new(JwtConfig {
                secret: "middleware-secret".to_string(),
                ..JwtConfig::default()
            }),
            0,
        )
    }

    fn app(state: AppState) -> Router {
        Router::new()
            .route(
                "/api/orders",
                get(|Extension(claims): Extension<Claims>| async move { claims.sub }),
            )
            .route_layer(from_fn_with_state(state.clone(), require_bearer))
            .with_state(state)
    }

    async fn call(app: Router, path: &str, token: Option<&str>) -> (StatusCode, String) {
        let mut builder = http::Request::builder().uri(path);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[tokio::test]
    async fn test_valid_access_token_reaches_handler() {
        let state = state();
        let token = state
            .jwt
            .issue("user-42", Audience::User, TokenKind::Access)
            .unwrap();

        let (status, body) = call(app(state), "/api/orders", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "user-42");
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        let (status, body) = call(app(state()), "/api/orders", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("Missing authorization header"));
    }

    #[tokio::test]
    async fn test_expired_and_refresh_tokens_are_unauthorized() {
        let state = state();
        let expired = state
            .jwt
            .issue_with_ttl("u", Audience::User, TokenKind::Access, Duration::minutes(-5))
            .unwrap();
        let refresh = state
            .jwt
            .issue("u", Audience::User, TokenKind::Refresh)
            .unwrap();

        let (status, _) = call(app(state.clone()), "/api/orders", Some(&expired)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(app(state), "/api/orders", Some(&refresh)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
