//! Common types used by both client and server

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Header carrying the refresh token on refresh calls
pub const REFRESH_TOKEN_HEADER: &str = "x-refresh-token";

/// Refresh endpoint for customer sessions
pub const USER_REFRESH_PATH: &str = "/api/user/refresh-token";

/// Refresh endpoint for admin sessions
pub const ADMIN_REFRESH_PATH: &str = "/api/admin/auth/refresh-token";

/// Body returned by the refresh endpoints
///
/// ```json
/// { "data": { "accessToken": "..." }, "error": false, "success": true }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshTokenResponse {
    #[serde(default)]
    pub data: RefreshTokenData,
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub success: bool,
}

/// Payload of a refresh response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshTokenData {
    /// Newly minted access token
    #[serde(rename = "accessToken", default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl RefreshTokenResponse {
    /// Successful response carrying `access_token`
    pub fn issued(access_token: impl Into<String>) -> Self {
        Self {
            data: RefreshTokenData {
                access_token: Some(access_token.into()),
            },
            error: false,
            success: true,
        }
    }
}

/// Failure shape shared by the server's error bodies and the client's
/// normalized errors: `{ "message": "...", "error": true, "success": false }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub message: String,
    #[serde(default = "default_true")]
    pub error: bool,
    #[serde(default)]
    pub success: bool,
    /// Full server body, when the failure came from one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

fn default_true() -> bool {
    true
}

impl Failure {
    /// Failure carrying only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: true,
            success: false,
            details: None,
        }
    }

    /// Reuse a server body that already has the failure shape
    ///
    /// Returns `None` when `body` is not an object with an `error` field.
    pub fn from_server_body(body: &JsonValue) -> Option<Self> {
        let object = body.as_object()?;
        let error = object.get("error")?;

        let message = object
            .get("message")
            .and_then(JsonValue::as_str)
            .unwrap_or("Request failed")
            .to_string();

        Some(Self {
            message,
            error: error.as_bool().unwrap_or(true),
            success: object
                .get("success")
                .and_then(JsonValue::as_bool)
                .unwrap_or(false),
            details: Some(body.clone()),
        })
    }
}

/// Response of the root status route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_refresh_response_wire_shape() {
        let body = serde_json::to_value(RefreshTokenResponse::issued("new123")).unwrap();
        assert_eq!(body["data"]["accessToken"], "new123");
        assert_eq!(body["success"], true);

        let parsed: RefreshTokenResponse = serde_json::from_value(json!({"data": {}})).unwrap();
        assert!(parsed.data.access_token.is_none());

        let parsed: RefreshTokenResponse = serde_json::from_value(json!({})).unwrap();
        assert!(parsed.data.access_token.is_none());
    }

    #[test]
    fn test_failure_from_server_body() {
        let body = json!({"message": "Out of stock", "error": true, "success": false, "sku": 7});
        let failure = Failure::from_server_body(&body).unwrap();
        assert_eq!(failure.message, "Out of stock");
        assert!(failure.error);
        assert!(!failure.success);
        assert_eq!(failure.details.unwrap()["sku"], 7);

        assert!(Failure::from_server_body(&json!({"message": "plain"})).is_none());
        assert!(Failure::from_server_body(&json!("text")).is_none());
    }

    #[test]
    fn test_failure_serializes_without_details() {
        let body = serde_json::to_value(Failure::new("Request failed")).unwrap();
        assert_eq!(
            body,
            json!({"message": "Request failed", "error": true, "success": false})
        );
    }
}
