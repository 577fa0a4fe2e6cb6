//! Client profiles and settings
//!
//! The admin dashboard and the storefront share one client implementation;
//! everything that differs between them lives in a [`ClientProfile`].

use super::ClientError;
use crate::types::{ADMIN_REFRESH_PATH, REFRESH_TOKEN_HEADER, USER_REFRESH_PATH};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default API location when nothing is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Storage keys holding the two tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenKeys {
    pub access: String,
    pub refresh: String,
}

impl TokenKeys {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }
}

/// How request helpers report failures to their callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Return the [`ClientError`] as-is
    Propagate,
    /// Log the error and return a normalized [`crate::types::Failure`]
    Normalize,
}

/// Per-application client behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientProfile {
    /// Where the tokens are kept
    pub token_keys: TokenKeys,
    /// Path of the refresh endpoint, relative to the base URL
    pub refresh_path: String,
    /// Header carrying the refresh token
    pub refresh_header: String,
    /// Path fragments whose 401s are final (login, registration)
    pub excluded_paths: Vec<String>,
    /// Read tokens from same-named cookies when storage has none
    pub cookie_fallback: bool,
    /// Failure contract the integration uses
    pub failure_policy: FailurePolicy,
}

impl ClientProfile {
    /// Admin dashboard profile
    pub fn admin() -> Self {
        Self {
            token_keys: TokenKeys::new("adminAccessToken", "adminRefreshToken"),
            refresh_path: ADMIN_REFRESH_PATH.to_string(),
            refresh_header: REFRESH_TOKEN_HEADER.to_string(),
            excluded_paths: vec!["/api/admin/auth/login".to_string()],
            cookie_fallback: true,
            failure_policy: FailurePolicy::Propagate,
        }
    }

    /// Customer storefront profile
    pub fn customer() -> Self {
        Self {
            token_keys: TokenKeys::new("accessToken", "refreshToken"),
            refresh_path: USER_REFRESH_PATH.to_string(),
            refresh_header: REFRESH_TOKEN_HEADER.to_string(),
            excluded_paths: vec![
                "/api/user/login".to_string(),
                "/api/user/register".to_string(),
            ],
            cookie_fallback: false,
            failure_policy: FailurePolicy::Normalize,
        }
    }

    /// Whether a 401 on `path` must be returned without a refresh attempt
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded_paths
            .iter()
            .any(|excluded| path.contains(excluded.as_str()))
    }
}

impl Default for ClientProfile {
    fn default() -> Self {
        Self::customer()
    }
}

/// Which built-in profile a settings file selects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    Admin,
    #[default]
    Customer,
}

impl ProfileKind {
    pub fn profile(self) -> ClientProfile {
        match self {
            Self::Admin => ClientProfile::admin(),
            Self::Customer => ClientProfile::customer(),
        }
    }
}

/// Client settings loaded from files and the environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    /// API base URL
    pub api_url: String,
    /// Built-in profile to use
    #[serde(default)]
    pub profile: ProfileKind,
    /// Request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Token storage file; defaults to a per-profile file in the data dir
    #[serde(default)]
    pub storage_path: Option<PathBuf>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            profile: ProfileKind::default(),
            timeout_secs: Some(30),
            storage_path: None,
        }
    }
}

impl ClientSettings {
    /// Load settings from `STOREFRONT_*` environment variables
    ///
    /// `STOREFRONT_API_URL`, `STOREFRONT_PROFILE`, `STOREFRONT_TIMEOUT_SECS`,
    /// `STOREFRONT_STORAGE_PATH`.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::load(None)
    }

    /// Load settings from a file, with environment variables on top
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ClientError> {
        Self::load(Some(path.into()))
    }

    fn load(path: Option<PathBuf>) -> Result<Self, ClientError> {
        let defaults = Self::default();

        let mut builder = config::Config::builder()
            .set_default("api_url", defaults.api_url)
            .and_then(|b| b.set_default("profile", "customer"))
            .and_then(|b| b.set_default("timeout_secs", 30_u64))
            .map_err(config_error)?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        builder
            .add_source(config::Environment::with_prefix("STOREFRONT").try_parsing(true))
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(config_error)
    }

    /// Request timeout as a duration
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

fn config_error(e: config::ConfigError) -> ClientError {
    ClientError::Configuration(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_profile() {
        let profile = ClientProfile::admin();
        assert_eq!(profile.token_keys.access, "adminAccessToken");
        assert_eq!(profile.token_keys.refresh, "adminRefreshToken");
        assert_eq!(profile.refresh_path, "/api/admin/auth/refresh-token");
        assert_eq!(profile.refresh_header, "x-refresh-token");
        assert!(profile.cookie_fallback);
        assert_eq!(profile.failure_policy, FailurePolicy::Propagate);
        assert!(profile.is_excluded("/api/admin/auth/login"));
        assert!(!profile.is_excluded("/api/admin/orders"));
    }

    #[test]
    fn test_customer_profile() {
        let profile = ClientProfile::customer();
        assert_eq!(profile.token_keys, TokenKeys::new("accessToken", "refreshToken"));
        assert_eq!(profile.refresh_path, "/api/user/refresh-token");
        assert!(!profile.cookie_fallback);
        assert_eq!(profile.failure_policy, FailurePolicy::Normalize);
        assert!(profile.is_excluded("/api/user/login"));
        assert!(profile.is_excluded("/api/user/register?ref=home"));
        assert!(!profile.is_excluded("/api/user/orders"));
    }

    #[test]
    fn test_settings_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.toml");
        std::fs::write(
            &path,
            "api_url = \"https://shop.example.com\"\nprofile = \"admin\"\ntimeout_secs = 5\n",
        )
        .unwrap();

        let settings = ClientSettings::from_file(&path).unwrap();
        assert_eq!(settings.api_url, "https://shop.example.com");
        assert_eq!(settings.profile, ProfileKind::Admin);
        assert_eq!(settings.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(settings.profile.profile(), ClientProfile::admin());
    }
}
