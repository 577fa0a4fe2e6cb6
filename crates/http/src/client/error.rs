//! Client error types

use crate::types::Failure;
use reqwest::StatusCode;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Error body returned by the server, with the message extracted from it
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorBody {
    /// Server-provided `message`, else the raw body, else the status reason
    pub message: String,
    /// Parsed JSON body, when the server sent one
    pub payload: Option<Value>,
}

impl ErrorBody {
    /// Build from a status code and the raw response text
    pub fn from_response(status: StatusCode, text: &str) -> Self {
        let payload = serde_json::from_str::<Value>(text).ok();

        let message = payload
            .as_ref()
            .and_then(|body| body.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| (!text.trim().is_empty()).then(|| text.trim().to_string()))
            .unwrap_or_else(|| status.to_string());

        Self { message, payload }
    }
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Why a refresh attempt produced no access token
///
/// Cloned to every request waiting on the same refresh.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RefreshError {
    /// No refresh token in storage; no network call was made
    #[error("Missing refresh token")]
    MissingRefreshToken,

    /// Refresh endpoint answered with an error status
    #[error("{message}")]
    Rejected {
        status: u16,
        message: String,
        payload: Option<Value>,
    },

    /// Refresh endpoint answered 2xx without `data.accessToken`
    #[error("Unable to refresh access token")]
    MissingAccessToken,

    /// Refresh call never produced a response
    #[error("Refresh request failed: {0}")]
    Transport(String),

    /// The task driving the refresh was dropped before it settled
    #[error("Token refresh was abandoned")]
    Abandoned,
}

impl RefreshError {
    /// Server body attached to the failure, if any
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Rejected { payload, .. } => payload.as_ref(),
            _ => None,
        }
    }
}

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(ErrorBody),

    /// Authentication failed and could not be recovered
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(ErrorBody),

    /// Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(ErrorBody),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(ErrorBody),

    /// Server returned any other error status
    #[error("Server error {status}: {body}")]
    ServerError { status: u16, body: ErrorBody },

    /// Session could not be refreshed; stored tokens have been cleared
    #[error("Session expired: {0}")]
    Refresh(#[from] RefreshError),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Create error from HTTP status code and response text
    pub fn from_status(status: StatusCode, text: &str) -> Self {
        let body = ErrorBody::from_response(status, text);
        match status.as_u16() {
            400 => Self::BadRequest(body),
            401 => Self::AuthenticationFailed(body),
            403 => Self::Forbidden(body),
            404 => Self::NotFound(body),
            status => Self::ServerError { status, body },
        }
    }

    /// HTTP status behind this error, if it came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::BadRequest(_) => Some(400),
            Self::AuthenticationFailed(_) => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::ServerError { status, .. } => Some(*status),
            Self::Refresh(RefreshError::Rejected { status, .. }) => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Server-provided body, if any
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::BadRequest(body)
            | Self::AuthenticationFailed(body)
            | Self::Forbidden(body)
            | Self::NotFound(body)
            | Self::ServerError { body, .. } => body.payload.as_ref(),
            Self::Refresh(e) => e.payload(),
            _ => None,
        }
    }

    /// Whether the caller has to sign in again
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthenticationFailed(_) | Self::Refresh(_))
    }

    /// Collapse into the `{message, error, success}` failure shape
    ///
    /// A server body that already has that shape is passed through.
    pub fn to_failure(&self) -> Failure {
        if let Some(failure) = self.payload().and_then(Failure::from_server_body) {
            return failure;
        }

        let message = match self {
            Self::BadRequest(body)
            | Self::AuthenticationFailed(body)
            | Self::Forbidden(body)
            | Self::NotFound(body)
            | Self::ServerError { body, .. } => body.message.clone(),
            other => other.to_string(),
        };

        Failure {
            details: self.payload().cloned(),
            ..Failure::new(message)
        }
    }
}

impl From<ClientError> for Failure {
    fn from(error: ClientError) -> Self {
        error.to_failure()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_status_prefers_server_message() {
        let error = ClientError::from_status(
            StatusCode::NOT_FOUND,
            r#"{"message":"Order not found","error":true,"success":false}"#,
        );
        assert!(matches!(&error, ClientError::NotFound(body) if body.message == "Order not found"));
        assert_eq!(error.status(), Some(404));
        assert_eq!(error.payload().unwrap()["success"], false);
    }

    #[test]
    fn test_from_status_falls_back_to_text_then_reason() {
        let error = ClientError::from_status(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(
            matches!(&error, ClientError::ServerError { status: 502, body } if body.message == "upstream down")
        );

        let error = ClientError::from_status(StatusCode::UNAUTHORIZED, "");
        assert!(
            matches!(&error, ClientError::AuthenticationFailed(body) if body.message == "401 Unauthorized")
        );
        assert!(error.is_auth_expired());
    }

    #[test]
    fn test_to_failure_passes_shaped_bodies_through() {
        let error = ClientError::from_status(
            StatusCode::CONFLICT,
            r#"{"message":"Already in cart","error":true,"success":false}"#,
        );
        let failure = error.to_failure();
        assert_eq!(failure.message, "Already in cart");
        assert!(failure.details.is_some());
    }

    #[test]
    fn test_to_failure_normalizes_everything_else() {
        let failure = ClientError::Refresh(RefreshError::MissingRefreshToken).to_failure();
        assert_eq!(failure.message, "Session expired: Missing refresh token");
        assert!(failure.error);
        assert!(!failure.success);
        assert!(failure.details.is_none());

        let failure = ClientError::from_status(StatusCode::BAD_REQUEST, r#"{"message":"Bad sku"}"#)
            .to_failure();
        assert_eq!(failure.message, "Bad sku");
        assert_eq!(failure.details, Some(json!({"message": "Bad sku"})));
    }

    #[test]
    fn test_refresh_rejection_uses_server_message() {
        let error = RefreshError::Rejected {
            status: 401,
            message: "Refresh token expired".into(),
            payload: Some(json!({"message": "Refresh token expired", "error": true})),
        };
        assert_eq!(error.to_string(), "Refresh token expired");

        let failure = ClientError::from(error).to_failure();
        assert_eq!(failure.message, "Refresh token expired");
    }
}
