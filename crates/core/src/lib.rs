//! Storefront core types and utilities

pub mod storage;
pub mod tracing;

pub use storage::{FileStore, KeyValueStore, MemoryStore};
