use crate::error::TokenError;
use crate::jwt::{AccessClaims, TokenSigner};
use crate::metrics;
use crate::storage::{AccessTokenRecord, TokenStore};
use std::sync::Arc;
use tracing::{debug, warn};

/// Checks access tokens cryptographically and against the store.
#[derive(Clone)]
pub struct TokenVerifier {
    store: Arc<dyn TokenStore>,
    access_signer: Arc<TokenSigner>,
}

impl TokenVerifier {
    pub fn new(store: Arc<dyn TokenStore>, access_signer: Arc<TokenSigner>) -> Self {
        TokenVerifier {
            store,
            access_signer,
        }
    }

    /// Verify signature and expiry, returning the embedded claims.
    ///
    /// Expiry per the JWT clock check is reported as
    /// [`TokenError::InvalidToken`] like any other verification failure.
    pub fn verify(&self, access_token: &str) -> Result<AccessClaims, TokenError> {
        self.access_signer
            .verify(access_token)
            .map_err(|e| match e {
                TokenError::ExpiredToken => TokenError::invalid("access token expired"),
                other => other,
            })
    }

    /// Whether the token verifies and its record still exists.
    ///
    /// Never fails: verification and store errors both count as not live.
    pub async fn check_live(&self, access_token: &str) -> bool {
        let live = self.live_record(access_token).await.is_some();
        metrics::record_live_check(live);
        live
    }

    pub(crate) async fn live_record(&self, access_token: &str) -> Option<AccessTokenRecord> {
        if let Err(e) = self.verify(access_token) {
            debug!(error = %e, "Access token failed verification");
            return None;
        }

        match self.store.find_access_by_value(access_token).await {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Token store lookup failed; treating token as not live");
                None
            }
        }
    }
}
