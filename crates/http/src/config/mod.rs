//! Server configuration

pub mod auth;

pub use auth::{AuthConfig, JwtConfigData};
