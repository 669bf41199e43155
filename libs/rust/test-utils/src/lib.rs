//! Shared test utilities for admin-platform Rust crates.
//!
//! This crate provides:
//! - Proptest generators for principals, role sets and secrets
//! - Fixed fixtures for deterministic tests

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

pub use generators::*;
