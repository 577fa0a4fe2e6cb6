//! JWT service for access and refresh tokens

use crate::error::HttpError;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which application a token was issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    User,
    Admin,
}

impl Audience {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

/// Short-lived bearer token or long-lived refresh token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT Claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Application the token belongs to
    pub aud: Audience,
    /// Access or refresh
    pub kind: TokenKind,
    /// Expiration time (as UTC timestamp)
    pub exp: i64,
    /// Issued at (as UTC timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
}

/// JWT service configuration
#[derive(Clone, Debug)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: String,
    /// Lifetime of access tokens
    pub access_ttl: Duration,
    /// Lifetime of refresh tokens
    pub refresh_ttl: Duration,
    /// Token issuer
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "your-secret-key-change-this-in-production".to_string(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
            issuer: "storefront".to_string(),
        }
    }
}

/// JWT service for token operations
pub struct JwtService {
    config: Arc<JwtConfig>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    /// Create a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config: Arc::new(config),
            encoding_key,
            decoding_key,
        }
    }

    /// Issue a token with the configured lifetime for its kind
    pub fn issue(
        &self,
        subject: &str,
        audience: Audience,
        kind: TokenKind,
    ) -> Result<String, HttpError> {
        let ttl = match kind {
            TokenKind::Access => self.config.access_ttl,
            TokenKind::Refresh => self.config.refresh_ttl,
        };
        self.issue_with_ttl(subject, audience, kind, ttl)
    }

    /// Issue a token valid for `ttl` (negative values produce expired tokens)
    pub fn issue_with_ttl(
        &self,
        subject: &str,
        audience: Audience,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<String, HttpError> {
        let now = Utc::now();

        let claims = Claims {
            sub: subject.to_string(),
            aud: audience,
            kind,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| HttpError::InternalServerError(format!("Failed to generate token: {e}")))
    }

    /// Validate a token of `kind` issued for one of `audiences`
    pub fn validate(
        &self,
        token: &str,
        audiences: &[Audience],
        kind: TokenKind,
    ) -> Result<Claims, HttpError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expired means expired; no clock-skew grace
        validation.leeway = 0;
        validation.set_issuer(std::slice::from_ref(&self.config.issuer));
        let audiences: Vec<&str> = audiences.iter().map(|a| a.as_str()).collect();
        validation.set_audience(audiences.as_slice());

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|token_data| token_data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    HttpError::AuthenticationFailed("Token has expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    HttpError::AuthenticationFailed("Invalid token".to_string())
                }
                _ => HttpError::AuthenticationFailed(format!("Token validation failed: {e}")),
            })?;

        if claims.kind != kind {
            return Err(HttpError::AuthenticationFailed(format!(
                "Expected {} token",
                match kind {
                    TokenKind::Access => "an access",
                    TokenKind::Refresh => "a refresh",
                }
            )));
        }

        Ok(claims)
    }

    /// Extract token from Authorization header
    pub fn extract_bearer_token<'a>(&self, auth_header: &'a str) -> Result<&'a str, HttpError> {
        auth_header
            .strip_prefix("Bearer ")
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                HttpError::AuthenticationFailed("Invalid authorization header format".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new(JwtConfig {
            secret: "test-secret".to_string(),
            issuer: "test-issuer".to_string(),
            ..JwtConfig::default()
        })
    }

    #[test]
    fn test_token_generation_and_validation() {
        let service = service();

        let access = service
            .issue("user-123", Audience::User, TokenKind::Access)
            .unwrap();
        let refresh = service
            .issue("user-123", Audience::User, TokenKind::Refresh)
            .unwrap();

        let claims = service
            .validate(&access, &[Audience::User], TokenKind::Access)
            .unwrap();
        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.aud, Audience::User);

        let claims = service
            .validate(&refresh, &[Audience::User], TokenKind::Refresh)
            .unwrap();
        assert_eq!(claims.kind, TokenKind::Refresh);
        assert!(claims.exp - claims.iat > 24 * 3600);
    }

    #[test]
    fn test_expired_token() {
        let service = service();
        let token = service
            .issue_with_ttl("user", Audience::User, TokenKind::Access, Duration::hours(-1))
            .unwrap();

        match service.validate(&token, &[Audience::User], TokenKind::Access) {
            Err(HttpError::AuthenticationFailed(msg)) => {
                assert!(msg.to_lowercase().contains("expired"))
            }
            other => panic!("Expected authentication failed error, got {other:?}"),
        }
    }

    #[test]
    fn test_recently_expired_token_is_rejected() {
        let service = service();
        let token = service
            .issue_with_ttl("user", Audience::User, TokenKind::Access, Duration::seconds(-5))
            .unwrap();

        assert!(matches!(
            service.validate(&token, &[Audience::User], TokenKind::Access),
            Err(HttpError::AuthenticationFailed(msg)) if msg == "Token has expired"
        ));
    }

    #[test]
    fn test_kind_and_audience_are_enforced() {
        let service = service();
        let access = service
            .issue("admin-1", Audience::Admin, TokenKind::Access)
            .unwrap();
        let refresh = service
            .issue("admin-1", Audience::Admin, TokenKind::Refresh)
            .unwrap();

        // A refresh token is not a bearer credential
        assert!(
            service
                .validate(&refresh, &[Audience::Admin], TokenKind::Access)
                .is_err()
        );
        // Admin tokens do not refresh customer sessions
        assert!(
            service
                .validate(&refresh, &[Audience::User], TokenKind::Refresh)
                .is_err()
        );
        assert!(
            service
                .validate(
                    &access,
                    &[Audience::User, Audience::Admin],
                    TokenKind::Access
                )
                .is_ok()
        );
    }

    #[test]
    fn test_foreign_signature_is_rejected() {
        let other = JwtService::new(JwtConfig {
            secret: "other-secret".to_string(),
            issuer: "test-issuer".to_string(),
            ..JwtConfig::default()
        });
        let token = other.issue("user", Audience::User, TokenKind::Access).unwrap();

        assert!(
            service()
                .validate(&token, &[Audience::User], TokenKind::Access)
                .is_err()
        );
    }

    #[test]
    fn test_extract_bearer_token() {
        let service = service();

        assert_eq!(
            service.extract_bearer_token("Bearer abc123").unwrap(),
            "abc123"
        );

        assert!(service.extract_bearer_token("Bearer ").is_err());
        assert!(service.extract_bearer_token("Basic abc123").is_err());
        assert!(service.extract_bearer_token("abc123").is_err());
    }
}
