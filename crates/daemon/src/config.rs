//! Configuration management for the storefront server

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use storefront_http::config::AuthConfig;

/// Port used when neither `PORT` nor the configuration sets one
pub const DEFAULT_PORT: u16 = 8080;

/// Main server settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// HTTP listener configuration
    pub server: ServerConfig,
    /// Token issuing configuration
    pub auth: AuthConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
    /// Mirror the request origin in CORS responses, with credentials
    pub cors_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            cors_enabled: true,
        }
    }
}

impl ServerConfig {
    /// Address to bind, as `host:port`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Settings {
    /// Load settings from defaults and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables cannot be parsed
    pub fn load() -> Result<Self> {
        Self::build(None)
    }

    /// Load settings from a file, with environment variables on top
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::build(Some(path.as_ref()))
    }

    /// Precedence, lowest first: built-in defaults and `JWT_*` variables,
    /// the file, `STOREFRONT_*` variables (`__` separates sections), `PORT`.
    fn build(path: Option<&Path>) -> Result<Self> {
        let server = ServerConfig::default();
        let auth = AuthConfig::from_env();

        let mut builder = config::Config::builder()
            .set_default("server.host", server.host)?
            .set_default("server.port", i64::from(server.port))?
            .set_default("server.cors_enabled", server.cors_enabled)?
            .set_default("auth.jwt.secret", auth.jwt.secret)?
            .set_default("auth.jwt.issuer", auth.jwt.issuer)?
            .set_default("auth.jwt.access_ttl_seconds", auth.jwt.access_ttl_seconds)?
            .set_default("auth.jwt.refresh_ttl_seconds", auth.jwt.refresh_ttl_seconds)?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("STOREFRONT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.port", std::env::var("PORT").ok())?
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
