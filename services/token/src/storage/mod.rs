//! Credential store for access/refresh token records.
//!
//! Backends must make [`TokenStore::insert_pair`] and
//! [`TokenStore::delete_pair`] atomic: a pair is written or removed as a
//! unit, never one row without the other. `delete_pair` doubles as the
//! claim used to keep refresh tokens single-use under concurrent rotation.

pub mod cache;
pub mod memory;
pub mod records;
pub mod redis;

pub use cache::CachedTokenStore;
pub use memory::MemoryTokenStore;
pub use records::{AccessTokenRecord, RefreshTokenRecord, TokenPairRecord};
pub use self::redis::RedisTokenStore;

use crate::error::TokenError;
use crate::jwt::PrincipalId;
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist an access record and its refresh record in one write.
    async fn insert_pair(
        &self,
        access: &AccessTokenRecord,
        refresh: &RefreshTokenRecord,
    ) -> Result<(), TokenError>;

    async fn find_access_by_value(
        &self,
        value: &str,
    ) -> Result<Option<AccessTokenRecord>, TokenError>;

    /// Look up a refresh record and traverse to its access record.
    async fn find_refresh_by_value(
        &self,
        value: &str,
    ) -> Result<Option<TokenPairRecord>, TokenError>;

    async fn find_access_by_principal(
        &self,
        principal_id: PrincipalId,
    ) -> Result<Vec<AccessTokenRecord>, TokenError>;

    /// Remove the access record with `access_id` and its refresh record.
    ///
    /// Returns `true` only for the caller that actually removed the rows;
    /// a concurrent or repeated delete returns `false`.
    async fn delete_pair(&self, access_id: Uuid) -> Result<bool, TokenError>;
}

#[async_trait]
impl<T: TokenStore + ?Sized> TokenStore for Arc<T> {
    async fn insert_pair(
        &self,
        access: &AccessTokenRecord,
        refresh: &RefreshTokenRecord,
    ) -> Result<(), TokenError> {
        (**self).insert_pair(access, refresh).await
    }

    async fn find_access_by_value(
        &self,
        value: &str,
    ) -> Result<Option<AccessTokenRecord>, TokenError> {
        (**self).find_access_by_value(value).await
    }

    async fn find_refresh_by_value(
        &self,
        value: &str,
    ) -> Result<Option<TokenPairRecord>, TokenError> {
        (**self).find_refresh_by_value(value).await
    }

    async fn find_access_by_principal(
        &self,
        principal_id: PrincipalId,
    ) -> Result<Vec<AccessTokenRecord>, TokenError> {
        (**self).find_access_by_principal(principal_id).await
    }

    async fn delete_pair(&self, access_id: Uuid) -> Result<bool, TokenError> {
        (**self).delete_pair(access_id).await
    }
}

/// Index key for a signed token value: SHA-256, URL-safe base64.
pub fn fingerprint(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

pub(crate) fn check_link(
    access: &AccessTokenRecord,
    refresh: &RefreshTokenRecord,
) -> Result<(), TokenError> {
    if refresh.access_token_id != access.id {
        return Err(TokenError::internal(format!(
            "refresh token {} does not belong to access token {}",
            refresh.id, access.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_deterministic() {
        assert_eq!(fingerprint("token"), fingerprint("token"));
        assert_ne!(fingerprint("token1"), fingerprint("token2"));
    }

    #[test]
    fn test_fingerprint_length() {
        // 32 bytes, base64 without padding
        assert_eq!(fingerprint("anything").len(), 43);
    }
}
