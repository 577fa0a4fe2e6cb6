//! Authentication configuration

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// JWT configuration that can be serialized
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JwtConfigData {
    /// Secret key for signing tokens
    pub secret: String,
    /// Access token lifetime in seconds
    pub access_ttl_seconds: i64,
    /// Refresh token lifetime in seconds
    pub refresh_ttl_seconds: i64,
    /// Token issuer
    pub issuer: String,
}

impl From<JwtConfigData> for crate::services::jwt::JwtConfig {
    fn from(data: JwtConfigData) -> Self {
        Self {
            secret: data.secret,
            access_ttl: Duration::seconds(data.access_ttl_seconds),
            refresh_ttl: Duration::seconds(data.refresh_ttl_seconds),
            issuer: data.issuer,
        }
    }
}

impl From<crate::services::jwt::JwtConfig> for JwtConfigData {
    fn from(config: crate::services::jwt::JwtConfig) -> Self {
        Self {
            secret: config.secret,
            access_ttl_seconds: config.access_ttl.num_seconds(),
            refresh_ttl_seconds: config.refresh_ttl.num_seconds(),
            issuer: config.issuer,
        }
    }
}

/// Complete authentication configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    /// JWT configuration
    pub jwt: JwtConfigData,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt: crate::services::jwt::JwtConfig::default().into(),
        }
    }
}

impl AuthConfig {
    /// Create auth config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(secret) = std::env::var("JWT_SECRET") {
            config.jwt.secret = secret;
        }
        if let Ok(issuer) = std::env::var("JWT_ISSUER") {
            config.jwt.issuer = issuer;
        }
        if let Ok(seconds) = std::env::var("ACCESS_TOKEN_TTL_SECONDS")
            && let Ok(seconds) = seconds.parse::<i64>()
        {
            config.jwt.access_ttl_seconds = seconds;
        }
        if let Ok(seconds) = std::env::var("REFRESH_TOKEN_TTL_SECONDS")
            && let Ok(seconds) = seconds.parse::<i64>()
        {
            config.jwt.refresh_ttl_seconds = seconds;
        }

        config
    }
}
