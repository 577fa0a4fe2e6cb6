//! Storefront HTTP layer
//!
//! With the `client` feature this crate provides the authenticated API client
//! used by the admin dashboard and the storefront. With the `server` feature
//! it provides the pieces of the API server that issue and check tokens.

pub mod error;
pub mod types;

#[cfg(feature = "client")]
pub mod client;

#[cfg(feature = "server")]
pub mod config;
#[cfg(feature = "server")]
pub mod middleware;
#[cfg(feature = "server")]
pub mod routes;
#[cfg(feature = "server")]
pub mod services;
#[cfg(feature = "server")]
pub mod state;

pub use error::{HttpError, Result};
pub use types::Failure;

#[cfg(feature = "server")]
pub use state::AppState;
