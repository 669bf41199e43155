//! Prometheus metrics for the token lifecycle.

use crate::error::TokenError;
use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, CounterVec, Encoder, TextEncoder};

/// Tokens issued counter.
pub static TOKENS_ISSUED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "token_lifecycle_tokens_issued_total",
        "Total number of tokens issued",
        &["token_type"]
    )
    .expect("Failed to register tokens_issued metric")
});

/// Rotation attempts counter.
pub static TOKENS_ROTATED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "token_lifecycle_tokens_rotated_total",
        "Total number of refresh token rotations",
        &["status"]
    )
    .expect("Failed to register tokens_rotated metric")
});

/// Token pairs revoked counter.
pub static TOKENS_REVOKED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "token_lifecycle_tokens_revoked_total",
        "Total number of token pairs revoked",
        &["reason"]
    )
    .expect("Failed to register tokens_revoked metric")
});

/// Liveness checks counter.
pub static LIVE_CHECKS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "token_lifecycle_live_checks_total",
        "Total number of access token liveness checks",
        &["result"]
    )
    .expect("Failed to register live_checks metric")
});

/// Record a token issuance.
pub fn record_token_issued(token_type: &str) {
    TOKENS_ISSUED.with_label_values(&[token_type]).inc();
}

/// Record a rotation outcome.
pub fn record_token_rotated(status: &str) {
    TOKENS_ROTATED.with_label_values(&[status]).inc();
}

/// Record a pair revocation.
pub fn record_token_revoked(reason: &str) {
    TOKENS_REVOKED.with_label_values(&[reason]).inc();
}

/// Record a liveness check.
pub fn record_live_check(live: bool) {
    let result = if live { "live" } else { "not_live" };
    LIVE_CHECKS.with_label_values(&[result]).inc();
}

/// Render the default registry in the Prometheus text format.
pub fn gather_text() -> Result<String, TokenError> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| TokenError::internal(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TokenError::internal(e.to_string()))
}
