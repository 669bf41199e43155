use crate::config::TokenSettings;
use crate::error::TokenError;
use crate::jwt::{AccessClaims, PrincipalId, RefreshClaims, TokenSigner};
use crate::lifecycle::{expiry_after, TokenPair};
use crate::metrics;
use crate::storage::{AccessTokenRecord, RefreshTokenRecord, TokenStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// Creates signed token pairs and persists them as one unit.
#[derive(Clone)]
pub struct TokenIssuer {
    store: Arc<dyn TokenStore>,
    access_signer: Arc<TokenSigner>,
    refresh_signer: Arc<TokenSigner>,
    access_ttl: Duration,
    refresh_ttl: Duration,
    policy_version: u32,
}

impl TokenIssuer {
    pub fn new(
        store: Arc<dyn TokenStore>,
        access_signer: Arc<TokenSigner>,
        refresh_signer: Arc<TokenSigner>,
        settings: &TokenSettings,
    ) -> Self {
        TokenIssuer {
            store,
            access_signer,
            refresh_signer,
            access_ttl: settings.access_ttl,
            refresh_ttl: settings.refresh_ttl,
            policy_version: settings.policy_version,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub async fn issue(
        &self,
        principal_id: PrincipalId,
        roles: Vec<String>,
    ) -> Result<TokenPair, TokenError> {
        self.issue_pair(principal_id, roles)
            .await
            .map(|(pair, _)| pair)
    }

    /// Issue a pair and also return the new access record's id.
    pub(crate) async fn issue_pair(
        &self,
        principal_id: PrincipalId,
        roles: Vec<String>,
    ) -> Result<(TokenPair, Uuid), TokenError> {
        let claims = AccessClaims::new(principal_id, self.policy_version, roles, self.access_ttl);
        let access_token = self.access_signer.sign(&claims)?;
        let access = AccessTokenRecord::new(
            access_token.clone(),
            principal_id,
            expiry_after(self.access_ttl)?,
        );

        let refresh_token = self.refresh_signer.sign(&RefreshClaims::new(self.refresh_ttl))?;
        let refresh = RefreshTokenRecord::new(
            refresh_token.clone(),
            expiry_after(self.refresh_ttl)?,
            &access,
        );

        // Single write: no access row can outlive a failed refresh insert.
        self.store.insert_pair(&access, &refresh).await?;

        metrics::record_token_issued("access");
        metrics::record_token_issued("refresh");
        info!(
            principal_id = %principal_id,
            access_id = %access.id,
            roles = claims.roles.len(),
            "Issued token pair"
        );

        Ok((
            TokenPair {
                access_token,
                refresh_token,
            },
            access.id,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::TokenKind;
    use crate::storage::{MemoryTokenStore, TokenPairRecord};
    use async_trait::async_trait;
    use secrecy::SecretString;

    fn signers() -> (Arc<TokenSigner>, Arc<TokenSigner>) {
        (
            Arc::new(TokenSigner::hs256(
                TokenKind::Access,
                &SecretString::from("access-secret-0123456789".to_string()),
            )),
            Arc::new(TokenSigner::hs256(
                TokenKind::Refresh,
                &SecretString::from("refresh-secret-0123456789".to_string()),
            )),
        )
    }

    fn settings() -> TokenSettings {
        TokenSettings::new("access-secret-0123456789", "refresh-secret-0123456789")
            .with_access_ttl(Duration::from_secs(900))
            .with_refresh_ttl(Duration::from_secs(3600))
            .with_policy_version(2)
    }

    #[tokio::test]
    async fn test_issue_persists_linked_pair() {
        let store = Arc::new(MemoryTokenStore::new());
        let (access_signer, refresh_signer) = signers();
        let issuer = TokenIssuer::new(store.clone(), access_signer.clone(), refresh_signer, &settings());

        let pair = issuer.issue(42, vec!["admin".to_string()]).await.unwrap();

        let access = store.find_access_by_value(&pair.access_token).await.unwrap().unwrap();
        let linked = store.find_refresh_by_value(&pair.refresh_token).await.unwrap().unwrap();
        assert_eq!(access.principal_id, 42);
        assert_eq!(linked.access, access);
        assert!(linked.refresh.expires_at > access.expires_at);

        let claims: AccessClaims = access_signer.verify(&pair.access_token).unwrap();
        assert_eq!(claims.principal_id, 42);
        assert_eq!(claims.policy_version, 2);
        assert_eq!(claims.roles, vec!["admin".to_string()]);
    }

    #[tokio::test]
    async fn test_refresh_token_signed_with_refresh_secret() {
        let store = Arc::new(MemoryTokenStore::new());
        let (access_signer, refresh_signer) = signers();
        let issuer = TokenIssuer::new(store, access_signer.clone(), refresh_signer.clone(), &settings());

        let pair = issuer.issue(1, Vec::new()).await.unwrap();

        assert!(refresh_signer.verify::<RefreshClaims>(&pair.refresh_token).is_ok());
        assert!(access_signer.verify::<RefreshClaims>(&pair.refresh_token).is_err());
    }

    struct RejectingStore;

    #[async_trait]
    impl TokenStore for RejectingStore {
        async fn insert_pair(
            &self,
            _access: &AccessTokenRecord,
            _refresh: &RefreshTokenRecord,
        ) -> Result<(), TokenError> {
            Err(TokenError::storage("disk full"))
        }

        async fn find_access_by_value(
            &self,
            _value: &str,
        ) -> Result<Option<AccessTokenRecord>, TokenError> {
            Ok(None)
        }

        async fn find_refresh_by_value(
            &self,
            _value: &str,
        ) -> Result<Option<TokenPairRecord>, TokenError> {
            Ok(None)
        }

        async fn find_access_by_principal(
            &self,
            _principal_id: PrincipalId,
        ) -> Result<Vec<AccessTokenRecord>, TokenError> {
            Ok(Vec::new())
        }

        async fn delete_pair(&self, _access_id: Uuid) -> Result<bool, TokenError> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn test_store_failure_surfaces() {
        let (access_signer, refresh_signer) = signers();
        let issuer = TokenIssuer::new(Arc::new(RejectingStore), access_signer, refresh_signer, &settings());

        let result = issuer.issue(1, Vec::new()).await;

        assert!(matches!(result, Err(TokenError::Storage(_))));
    }
}
