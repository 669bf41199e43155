//! Issue, verify, rotate and revoke access/refresh token pairs.

pub mod issuer;
pub mod revoker;
pub mod rotator;
pub mod verifier;

pub use issuer::TokenIssuer;
pub use revoker::{RevokeReason, TokenRevoker};
pub use rotator::TokenRotator;
pub use verifier::TokenVerifier;

use crate::error::TokenError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Signed token pair handed to the client after login or refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    #[serde(rename = "token")]
    pub access_token: String,
    pub refresh_token: String,
}

pub(crate) fn expiry_after(ttl: Duration) -> Result<DateTime<Utc>, TokenError> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|delta| Utc::now().checked_add_signed(delta))
        .ok_or_else(|| TokenError::config(format!("token TTL out of range: {:?}", ttl)))
}
