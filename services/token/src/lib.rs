//! Token lifecycle library.
//!
//! Issues paired access/refresh JWTs, verifies access tokens against a
//! credential store, rotates refresh tokens single-use, and revokes pairs
//! together with their session-presence markers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod authz;
pub mod config;
pub mod error;
pub mod jwt;
pub mod lifecycle;
pub mod metrics;
pub mod presence;
pub mod service;
pub mod storage;

// Re-exports for convenience
pub use authz::{ClaimsProvider, RoleRegistry};
pub use config::Config;
pub use error::TokenError;
pub use lifecycle::TokenPair;
pub use service::TokenService;
