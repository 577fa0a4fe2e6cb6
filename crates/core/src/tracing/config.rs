//! Configuration for tracing and instrumentation

use serde::{Deserialize, Serialize};

/// Output format for log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, one event per line
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Main instrumentation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentationConfig {
    /// Service name attached to startup logs
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Log level filter (e.g., "info", "storefront_http=debug")
    pub log_level: String,
    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self {
            service_name: "storefront".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl InstrumentationConfig {
    /// Create configuration from environment variables
    ///
    /// Supports the following environment variables:
    /// - `SERVICE_NAME`: Service name
    /// - `SERVICE_VERSION`: Service version
    /// - `RUST_LOG`: Log level filter
    /// - `LOG_FORMAT`: `json` for structured output, anything else for pretty
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let service_name = std::env::var("SERVICE_NAME").unwrap_or(defaults.service_name);
        let service_version = std::env::var("SERVICE_VERSION").unwrap_or(defaults.service_version);
        let log_level = std::env::var("RUST_LOG").unwrap_or(defaults.log_level);
        let format = match std::env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Self {
            service_name,
            service_version,
            log_level,
            format,
        }
    }

    /// Create configuration for a named service with a default filter
    pub fn for_service(name: impl Into<String>, log_level: impl Into<String>) -> Self {
        Self {
            service_name: name.into(),
            log_level: log_level.into(),
            ..Self::default()
        }
    }
}
