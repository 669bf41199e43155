//! Shared library for cross-cutting concerns in admin-platform Rust services.
//!
//! This crate provides centralized implementations for:
//! - A platform error type with retryability classification
//! - `tracing` subscriber initialisation
//! - A namespaced, TTL-bounded key/value cache client

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache_client;
pub mod error;
pub mod tracing_config;

pub use cache_client::{CacheClient, CacheClientConfig};
pub use error::PlatformError;
pub use tracing_config::{TracingConfig, init_tracing};
