//! HTTP error types and implementations

#[cfg(feature = "server")]
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// HTTP-specific errors
#[derive(Error, Debug)]
pub enum HttpError {
    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl HttpError {
    /// Message meant for the API caller, without the category prefix
    pub fn message(&self) -> &str {
        match self {
            Self::AuthenticationFailed(message) | Self::InternalServerError(message) => message,
        }
    }
}

#[cfg(feature = "server")]
impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = match &self {
            HttpError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            HttpError::InternalServerError(message) => {
                tracing::error!("Internal server error: {}", message);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = crate::types::Failure::new(self.message());
        (status, Json(body)).into_response()
    }
}

/// Result type alias using HttpError
pub type Result<T> = std::result::Result<T, HttpError>;

#[cfg(all(test, feature = "server"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = HttpError::AuthenticationFailed("Token has expired".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"message": "Token has expired", "error": true, "success": false})
        );
    }
}
