//! Entry points used by the login, refresh and logout handlers.

use crate::authz::ClaimsProvider;
use crate::config::{Config, RotationPolicy, StoreBackend, TokenSettings};
use crate::error::TokenError;
use crate::jwt::{AccessClaims, PrincipalId, TokenKind, TokenSigner};
use crate::lifecycle::{TokenIssuer, TokenPair, TokenRevoker, TokenRotator, TokenVerifier};
use crate::presence::{CachePresence, RedisPresence, SessionPresence};
use crate::storage::{CachedTokenStore, MemoryTokenStore, RedisTokenStore, TokenStore};
use redis::aio::ConnectionManager;
use std::sync::Arc;
use tracing::{info, warn};

/// Token lifecycle with its collaborators wired together.
#[derive(Clone)]
pub struct TokenService {
    issuer: TokenIssuer,
    verifier: TokenVerifier,
    rotator: TokenRotator,
    revoker: TokenRevoker,
    presence: Arc<dyn SessionPresence>,
    claims: Arc<dyn ClaimsProvider>,
}

impl TokenService {
    /// Wire the lifecycle components over the given collaborators.
    pub fn new(
        settings: &TokenSettings,
        store: Arc<dyn TokenStore>,
        presence: Arc<dyn SessionPresence>,
        claims: Arc<dyn ClaimsProvider>,
    ) -> Self {
        let access_signer = Arc::new(TokenSigner::hs256(TokenKind::Access, &settings.access_secret));
        let refresh_signer = Arc::new(TokenSigner::hs256(TokenKind::Refresh, &settings.refresh_secret));

        let issuer = TokenIssuer::new(
            store.clone(),
            access_signer.clone(),
            refresh_signer.clone(),
            settings,
        );
        let verifier = TokenVerifier::new(store.clone(), access_signer);
        let revoker = TokenRevoker::new(store.clone(), presence.clone());
        let rotator = TokenRotator::new(
            refresh_signer,
            store,
            claims.clone(),
            issuer.clone(),
            revoker.clone(),
            settings.rotation_policy,
        );

        TokenService {
            issuer,
            verifier,
            rotator,
            revoker,
            presence,
            claims,
        }
    }

    /// Build the configured backends and wire the service over them.
    ///
    /// The Redis backend shares one connection between the record store
    /// and presence markers.
    ///
    /// # Errors
    ///
    /// Returns an error if a backend cannot be created or reached.
    pub async fn from_config(
        config: &Config,
        claims: Arc<dyn ClaimsProvider>,
    ) -> Result<Self, TokenError> {
        let (store, presence) = match &config.store {
            StoreBackend::Memory => {
                let store: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
                let presence: Arc<dyn SessionPresence> =
                    Arc::new(CachePresence::new(config.presence.clone())?);
                (store, presence)
            }
            StoreBackend::Redis { url } => {
                let client = redis::Client::open(url.as_str())?;
                let conn = ConnectionManager::new(client).await?;
                let store: Arc<dyn TokenStore> =
                    Arc::new(RedisTokenStore::from_connection(conn.clone(), &config.redis_prefix));
                let presence: Arc<dyn SessionPresence> =
                    Arc::new(RedisPresence::from_connection(conn, &config.redis_prefix));
                (store, presence)
            }
        };

        let store: Arc<dyn TokenStore> = if config.record_cache_ttl.is_zero() {
            store
        } else {
            Arc::new(CachedTokenStore::new(
                store,
                config.record_cache_size,
                config.record_cache_ttl,
            ))
        };

        info!(
            backend = match config.store {
                StoreBackend::Memory => "memory",
                StoreBackend::Redis { .. } => "redis",
            },
            rotation_policy = config.tokens.rotation_policy.as_str(),
            record_cache_ttl_secs = config.record_cache_ttl.as_secs(),
            "Token service initialized"
        );

        Ok(Self::new(&config.tokens, store, presence, claims))
    }

    /// Process-local service for embedders and tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the presence cache config is invalid.
    pub fn in_memory(
        settings: &TokenSettings,
        claims: Arc<dyn ClaimsProvider>,
    ) -> Result<Self, TokenError> {
        let presence = CachePresence::new(
            rust_common::CacheClientConfig::default().with_default_ttl(settings.access_ttl),
        )?;
        Ok(Self::new(
            settings,
            Arc::new(MemoryTokenStore::new()),
            Arc::new(presence),
            claims,
        ))
    }

    pub fn rotation_policy(&self) -> RotationPolicy {
        self.rotator.policy()
    }

    /// Issue a pair carrying the principal's current roles.
    pub async fn login(&self, principal_id: PrincipalId) -> Result<TokenPair, TokenError> {
        let roles = self.claims.roles_for(principal_id).await?;
        self.issuer.issue(principal_id, roles).await
    }

    pub async fn issue(
        &self,
        principal_id: PrincipalId,
        roles: Vec<String>,
    ) -> Result<TokenPair, TokenError> {
        self.issuer.issue(principal_id, roles).await
    }

    /// Exchange a refresh token for a new pair. See [`TokenRotator::rotate`].
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, TokenError> {
        self.rotator.rotate(refresh_token).await
    }

    pub async fn logout(&self, access_token: &str) -> Result<bool, TokenError> {
        self.revoker.revoke_by_access_token(access_token).await
    }

    pub async fn revoke_refresh(&self, refresh_token: &str) -> Result<bool, TokenError> {
        self.revoker.revoke_by_refresh_token(refresh_token).await
    }

    /// Force-logout every session of a principal being deleted or disabled.
    pub async fn remove_principal(&self, principal_id: PrincipalId) -> Result<usize, TokenError> {
        self.revoker.revoke_all_for_principal(principal_id).await
    }

    pub fn verify(&self, access_token: &str) -> Result<AccessClaims, TokenError> {
        self.verifier.verify(access_token)
    }

    pub async fn check_live(&self, access_token: &str) -> bool {
        self.verifier.check_live(access_token).await
    }

    /// Flag the session as online for the access TTL. Returns `false`
    /// without touching presence if the token is not live.
    pub async fn mark_online(&self, access_token: &str) -> Result<bool, TokenError> {
        match self.verifier.live_record(access_token).await {
            Some(record) => {
                self.presence.mark_online(record.id, self.issuer.access_ttl()).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Whether a live token's session is flagged online.
    pub async fn is_online(&self, access_token: &str) -> bool {
        let Some(record) = self.verifier.live_record(access_token).await else {
            return false;
        };
        match self.presence.is_online(record.id).await {
            Ok(online) => online,
            Err(e) => {
                warn!(access_id = %record.id, error = %e, "Presence lookup failed");
                false
            }
        }
    }
}
