//! Shared tracing setup for Storefront binaries and tools

pub mod config;
#[cfg(feature = "tracing-init")]
pub mod init;

pub use config::InstrumentationConfig;
#[cfg(feature = "tracing-init")]
pub use init::init_tracing;
