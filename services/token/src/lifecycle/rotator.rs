use crate::authz::ClaimsProvider;
use crate::config::RotationPolicy;
use crate::error::TokenError;
use crate::jwt::{RefreshClaims, TokenSigner};
use crate::lifecycle::{RevokeReason, TokenIssuer, TokenPair, TokenRevoker};
use crate::metrics;
use crate::storage::TokenStore;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Exchanges a refresh token for a new pair, consuming the old one.
#[derive(Clone)]
pub struct TokenRotator {
    refresh_signer: Arc<TokenSigner>,
    store: Arc<dyn TokenStore>,
    claims: Arc<dyn ClaimsProvider>,
    issuer: TokenIssuer,
    revoker: TokenRevoker,
    policy: RotationPolicy,
}

impl TokenRotator {
    pub fn new(
        refresh_signer: Arc<TokenSigner>,
        store: Arc<dyn TokenStore>,
        claims: Arc<dyn ClaimsProvider>,
        issuer: TokenIssuer,
        revoker: TokenRevoker,
        policy: RotationPolicy,
    ) -> Self {
        TokenRotator {
            refresh_signer,
            store,
            claims,
            issuer,
            revoker,
            policy,
        }
    }

    pub fn policy(&self) -> RotationPolicy {
        self.policy
    }

    /// Rotate `refresh_token` into a new pair.
    ///
    /// The old pair is gone once this returns `Ok`. Roles in the new access
    /// token come from the claims provider, not from the old token.
    ///
    /// # Errors
    ///
    /// - [`TokenError::InvalidToken`] for a bad signature, an unknown or
    ///   already rotated token, or a lost race against a concurrent rotation
    /// - [`TokenError::ExpiredToken`] when the refresh token has expired; the
    ///   pair is revoked as a side effect
    /// - storage or claims errors from the collaborators
    pub async fn rotate(&self, refresh_token: &str) -> Result<TokenPair, TokenError> {
        let result = self.try_rotate(refresh_token).await;

        let status = match &result {
            Ok(_) => "success",
            Err(TokenError::InvalidToken(_)) => "invalid",
            Err(TokenError::ExpiredToken) => "expired",
            Err(_) => "error",
        };
        metrics::record_token_rotated(status);

        result
    }

    async fn try_rotate(&self, refresh_token: &str) -> Result<TokenPair, TokenError> {
        // An expired JWT still proves the signature, so the record is looked
        // up and revoked below.
        let jwt_expired = match self.refresh_signer.verify::<RefreshClaims>(refresh_token) {
            Ok(_) => false,
            Err(TokenError::ExpiredToken) => true,
            Err(e) => return Err(e),
        };

        let old = self
            .store
            .find_refresh_by_value(refresh_token)
            .await?
            .ok_or_else(|| TokenError::invalid("unknown refresh token"))?;
        let old_id = old.access.id;
        let principal_id = old.principal_id();

        if jwt_expired || old.refresh.is_expired_at(Utc::now()) {
            self.revoker.revoke_pair(old_id, RevokeReason::Expired).await?;
            warn!(principal_id = %principal_id, access_id = %old_id, "Rejected expired refresh token");
            return Err(TokenError::ExpiredToken);
        }

        let roles = self.claims.roles_for(principal_id).await?;

        let pair = match self.policy {
            RotationPolicy::IssueThenRevoke => {
                let (pair, new_id) = self.issuer.issue_pair(principal_id, roles).await?;
                match self.revoker.revoke_pair(old_id, RevokeReason::Rotation).await {
                    Ok(true) => pair,
                    Ok(false) => {
                        self.compensate(new_id).await;
                        warn!(principal_id = %principal_id, access_id = %old_id, "Refresh token consumed concurrently");
                        return Err(TokenError::invalid("refresh token already used"));
                    }
                    Err(e) => {
                        self.compensate(new_id).await;
                        warn!(principal_id = %principal_id, error = %e, "Failed to revoke rotated pair");
                        return Err(e);
                    }
                }
            }
            RotationPolicy::RevokeThenIssue => {
                if !self.revoker.revoke_pair(old_id, RevokeReason::Rotation).await? {
                    warn!(principal_id = %principal_id, access_id = %old_id, "Refresh token consumed concurrently");
                    return Err(TokenError::invalid("refresh token already used"));
                }
                self.issuer.issue(principal_id, roles).await?
            }
        };

        info!(
            principal_id = %principal_id,
            policy = self.policy.as_str(),
            "Rotated refresh token"
        );
        Ok(pair)
    }

    /// Undo an issue whose rotation did not go through.
    async fn compensate(&self, new_access_id: Uuid) {
        if let Err(e) = self.revoker.revoke_pair(new_access_id, RevokeReason::Compensation).await {
            warn!(access_id = %new_access_id, error = %e, "Failed to revoke compensated pair");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::RoleRegistry;
    use crate::config::TokenSettings;
    use crate::jwt::{AccessClaims, PrincipalId, TokenKind};
    use crate::presence::CachePresence;
    use crate::storage::{
        AccessTokenRecord, MemoryTokenStore, RefreshTokenRecord, TokenPairRecord,
    };
    use async_trait::async_trait;
    use rust_common::CacheClientConfig;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    const ACCESS: &str = "access-secret-0123456789";
    const REFRESH: &str = "refresh-secret-0123456789";

    struct Harness {
        rotator: TokenRotator,
        issuer: TokenIssuer,
        access_signer: Arc<TokenSigner>,
        roles: Arc<RoleRegistry>,
    }

    fn harness(store: Arc<dyn TokenStore>, settings: TokenSettings) -> Harness {
        let access_signer = Arc::new(TokenSigner::hs256(TokenKind::Access, &settings.access_secret));
        let refresh_signer = Arc::new(TokenSigner::hs256(TokenKind::Refresh, &settings.refresh_secret));
        let presence = Arc::new(
            CachePresence::new(CacheClientConfig::default().with_namespace("rotator-test")).unwrap(),
        );
        let roles = Arc::new(RoleRegistry::new());

        let issuer = TokenIssuer::new(store.clone(), access_signer.clone(), refresh_signer.clone(), &settings);
        let revoker = TokenRevoker::new(store.clone(), presence);
        let rotator = TokenRotator::new(
            refresh_signer,
            store,
            roles.clone(),
            issuer.clone(),
            revoker,
            settings.rotation_policy,
        );

        Harness {
            rotator,
            issuer,
            access_signer,
            roles,
        }
    }

    fn settings() -> TokenSettings {
        TokenSettings::new(ACCESS, REFRESH)
            .with_access_ttl(Duration::from_secs(60))
            .with_refresh_ttl(Duration::from_secs(600))
    }

    #[tokio::test]
    async fn test_rotation_uses_current_roles() {
        let store = Arc::new(MemoryTokenStore::new());
        let h = harness(store.clone(), settings());
        let old = h.issuer.issue(42, vec!["admin".to_string()]).await.unwrap();
        h.roles.set_roles(42, vec!["viewer"]).await;

        let new = h.rotator.rotate(&old.refresh_token).await.unwrap();

        let claims: AccessClaims = h.access_signer.verify(&new.access_token).unwrap();
        assert_eq!(claims.principal_id, 42);
        assert_eq!(claims.roles, vec!["viewer".to_string()]);
        assert!(store.find_access_by_value(&old.access_token).await.unwrap().is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_second_rotation_is_invalid() {
        let store = Arc::new(MemoryTokenStore::new());
        let h = harness(store, settings());
        let old = h.issuer.issue(1, Vec::new()).await.unwrap();

        h.rotator.rotate(&old.refresh_token).await.unwrap();
        let second = h.rotator.rotate(&old.refresh_token).await;

        assert!(matches!(second, Err(TokenError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_revoke_then_issue_policy() {
        let store = Arc::new(MemoryTokenStore::new());
        let h = harness(
            store.clone(),
            settings().with_rotation_policy(RotationPolicy::RevokeThenIssue),
        );
        let old = h.issuer.issue(5, Vec::new()).await.unwrap();

        let new = h.rotator.rotate(&old.refresh_token).await.unwrap();

        assert_eq!(h.rotator.policy(), RotationPolicy::RevokeThenIssue);
        assert!(store.find_refresh_by_value(&new.refresh_token).await.unwrap().is_some());
        assert!(store.find_refresh_by_value(&old.refresh_token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_refresh_is_revoked() {
        let store = Arc::new(MemoryTokenStore::new());
        let h = harness(store.clone(), settings().with_refresh_ttl(Duration::ZERO));
        let old = h.issuer.issue(3, Vec::new()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let first = h.rotator.rotate(&old.refresh_token).await;
        let second = h.rotator.rotate(&old.refresh_token).await;

        assert!(matches!(first, Err(TokenError::ExpiredToken)));
        assert!(matches!(second, Err(TokenError::InvalidToken(_))));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_access_token_is_not_a_refresh_token() {
        let h = harness(Arc::new(MemoryTokenStore::new()), settings());
        let pair = h.issuer.issue(3, Vec::new()).await.unwrap();

        let result = h.rotator.rotate(&pair.access_token).await;

        assert!(matches!(result, Err(TokenError::InvalidToken(_))));
    }

    /// Wraps the memory store with one-shot failures armed by the test.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryTokenStore,
        lose_next_claim: AtomicBool,
        fail_next_delete: AtomicBool,
        fail_next_insert: AtomicBool,
    }

    #[async_trait]
    impl TokenStore for FlakyStore {
        async fn insert_pair(
            &self,
            access: &AccessTokenRecord,
            refresh: &RefreshTokenRecord,
        ) -> Result<(), TokenError> {
            if self.fail_next_insert.swap(false, Ordering::SeqCst) {
                return Err(TokenError::storage("insert failed"));
            }
            self.inner.insert_pair(access, refresh).await
        }

        async fn find_access_by_value(
            &self,
            value: &str,
        ) -> Result<Option<AccessTokenRecord>, TokenError> {
            self.inner.find_access_by_value(value).await
        }

        async fn find_refresh_by_value(
            &self,
            value: &str,
        ) -> Result<Option<TokenPairRecord>, TokenError> {
            self.inner.find_refresh_by_value(value).await
        }

        async fn find_access_by_principal(
            &self,
            principal_id: PrincipalId,
        ) -> Result<Vec<AccessTokenRecord>, TokenError> {
            self.inner.find_access_by_principal(principal_id).await
        }

        async fn delete_pair(&self, access_id: Uuid) -> Result<bool, TokenError> {
            if self.fail_next_delete.swap(false, Ordering::SeqCst) {
                return Err(TokenError::storage("delete failed"));
            }
            let removed = self.inner.delete_pair(access_id).await?;
            // Another rotation got there first.
            if self.lose_next_claim.swap(false, Ordering::SeqCst) {
                return Ok(false);
            }
            Ok(removed)
        }
    }

    #[tokio::test]
    async fn test_lost_claim_revokes_new_pair() {
        let store = Arc::new(FlakyStore::default());
        let h = harness(store.clone(), settings());
        let old = h.issuer.issue(8, Vec::new()).await.unwrap();
        store.lose_next_claim.store(true, Ordering::SeqCst);

        let result = h.rotator.rotate(&old.refresh_token).await;

        assert!(matches!(result, Err(TokenError::InvalidToken(_))));
        assert!(store.inner.is_empty().await);
    }

    #[tokio::test]
    async fn test_failed_revoke_keeps_old_pair() {
        let store = Arc::new(FlakyStore::default());
        let h = harness(store.clone(), settings());
        let old = h.issuer.issue(9, Vec::new()).await.unwrap();
        store.fail_next_delete.store(true, Ordering::SeqCst);

        let result = h.rotator.rotate(&old.refresh_token).await;

        assert!(matches!(result, Err(TokenError::Storage(_))));
        // The pair issued for the failed attempt was revoked again.
        assert_eq!(store.inner.len().await, 1);
        let remaining = store.inner.find_access_by_principal(9).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].value, old.access_token);

        let new = h.rotator.rotate(&old.refresh_token).await.unwrap();

        assert!(store.find_access_by_value(&new.access_token).await.unwrap().is_some());
        assert!(store.find_access_by_value(&old.access_token).await.unwrap().is_none());
        assert_eq!(store.inner.len().await, 1);
    }

    #[tokio::test]
    async fn test_failed_insert_leaves_old_pair_rotatable() {
        let store = Arc::new(FlakyStore::default());
        let h = harness(store.clone(), settings());
        let old = h.issuer.issue(10, Vec::new()).await.unwrap();
        store.fail_next_insert.store(true, Ordering::SeqCst);

        let result = h.rotator.rotate(&old.refresh_token).await;

        assert!(matches!(result, Err(TokenError::Storage(_))));
        assert_eq!(store.inner.len().await, 1);
        assert!(store.find_refresh_by_value(&old.refresh_token).await.unwrap().is_some());

        let new = h.rotator.rotate(&old.refresh_token).await.unwrap();

        assert!(store.find_access_by_value(&new.access_token).await.unwrap().is_some());
        assert!(store.find_refresh_by_value(&old.refresh_token).await.unwrap().is_none());
    }
}
