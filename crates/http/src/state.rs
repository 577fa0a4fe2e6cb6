//! Application state management

use crate::config::AuthConfig;
use crate::services::JwtService;
use std::sync::Arc;

/// Shared application state
///
/// Cloned into every handler and middleware invocation.
#[derive(Clone)]
pub struct AppState {
    /// Token issuing and validation
    pub jwt: Arc<JwtService>,
    /// Port the server listens on, reported by the status route
    pub port: u16,
}

impl AppState {
    /// Create a new AppState
    pub fn new(jwt: JwtService, port: u16) -> Self {
        Self {
            jwt: Arc::new(jwt),
            port,
        }
    }

    /// Create state from the authentication configuration
    pub fn from_config(auth: &AuthConfig, port: u16) -> Self {
        Self::new(JwtService::new(auth.jwt.clone().into()), port)
    }
}
