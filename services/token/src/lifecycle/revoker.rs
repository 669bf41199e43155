use crate::error::TokenError;
use crate::jwt::PrincipalId;
use crate::metrics;
use crate::presence::SessionPresence;
use crate::storage::TokenStore;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Why a pair was revoked; used as a metrics label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeReason {
    Logout,
    Rotation,
    Expired,
    PrincipalRemoved,
    Compensation,
}

impl RevokeReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Logout => "logout",
            Self::Rotation => "rotation",
            Self::Expired => "expired",
            Self::PrincipalRemoved => "principal_removed",
            Self::Compensation => "compensation",
        }
    }
}

/// Removes token pairs and their presence markers. Revoking something that
/// is already gone is a no-op.
#[derive(Clone)]
pub struct TokenRevoker {
    store: Arc<dyn TokenStore>,
    presence: Arc<dyn SessionPresence>,
}

impl TokenRevoker {
    pub fn new(store: Arc<dyn TokenStore>, presence: Arc<dyn SessionPresence>) -> Self {
        TokenRevoker { store, presence }
    }

    /// Revoke the pair owning `access_token`. Returns whether a pair was
    /// removed by this call.
    pub async fn revoke_by_access_token(&self, access_token: &str) -> Result<bool, TokenError> {
        match self.store.find_access_by_value(access_token).await? {
            Some(access) => self.revoke_pair(access.id, RevokeReason::Logout).await,
            None => Ok(false),
        }
    }

    /// Revoke the pair owning `refresh_token`. Returns whether a pair was
    /// removed by this call.
    pub async fn revoke_by_refresh_token(&self, refresh_token: &str) -> Result<bool, TokenError> {
        match self.store.find_refresh_by_value(refresh_token).await? {
            Some(pair) => self.revoke_pair(pair.access.id, RevokeReason::Logout).await,
            None => Ok(false),
        }
    }

    /// Revoke every pair held by `principal_id`, e.g. when the user is
    /// deleted or disabled. Returns the number of pairs removed.
    pub async fn revoke_all_for_principal(&self, principal_id: PrincipalId) -> Result<usize, TokenError> {
        let records = self.store.find_access_by_principal(principal_id).await?;

        let mut removed = 0;
        for record in records {
            if self.revoke_pair(record.id, RevokeReason::PrincipalRemoved).await? {
                removed += 1;
            }
        }

        info!(principal_id = %principal_id, count = removed, "Revoked all principal token pairs");
        Ok(removed)
    }

    /// Clear presence, then delete both rows in one store call.
    pub(crate) async fn revoke_pair(&self, access_id: Uuid, reason: RevokeReason) -> Result<bool, TokenError> {
        // Presence goes first so a failed delete cannot leave a dangling flag.
        if let Err(e) = self.presence.clear(access_id).await {
            warn!(access_id = %access_id, error = %e, "Failed to clear presence marker");
        }

        let removed = self.store.delete_pair(access_id).await?;
        if removed {
            metrics::record_token_revoked(reason.as_str());
            info!(access_id = %access_id, reason = reason.as_str(), "Revoked token pair");
        }
        Ok(removed)
    }
}
