//! Read-through cache in front of a [`TokenStore`].
//!
//! Only positive access-token lookups are cached, each for at most `ttl`.
//! Refresh lookups, writes and deletes always hit the inner store, so
//! rotation sees authoritative single-use state. A revocation performed
//! through another process may go unnoticed here for up to `ttl`.

use crate::error::TokenError;
use crate::jwt::PrincipalId;
use crate::storage::{fingerprint, AccessTokenRecord, RefreshTokenRecord, TokenPairRecord, TokenStore};
use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

struct CachedRecord {
    record: AccessTokenRecord,
    cached_at: Instant,
}

pub struct CachedTokenStore<S> {
    inner: S,
    ttl: Duration,
    entries: Mutex<LruCache<String, CachedRecord>>,
    // Bumped before every delete; a lookup that saw another value must not
    // cache what it read.
    deletes: AtomicU64,
}

impl<S: TokenStore> CachedTokenStore<S> {
    pub fn new(inner: S, capacity: NonZeroUsize, ttl: Duration) -> Self {
        CachedTokenStore {
            inner,
            ttl,
            entries: Mutex::new(LruCache::new(capacity)),
            deletes: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of cached lookups, fresh or stale.
    pub fn cached_len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, CachedRecord>> {
        // A poisoned cache only holds lookups; keep using it.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn cached(&self, key: &str) -> Option<AccessTokenRecord> {
        let mut entries = self.lock();
        let fresh = entries
            .get(key)
            .map(|entry| (entry.cached_at.elapsed() < self.ttl).then(|| entry.record.clone()));

        match fresh {
            Some(Some(record)) => Some(record),
            Some(None) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    fn evict_access(&self, access_id: Uuid) {
        let mut entries = self.lock();
        let stale: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.record.id == access_id)
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            entries.pop(&key);
        }
    }
}

#[async_trait]
impl<S: TokenStore> TokenStore for CachedTokenStore<S> {
    async fn insert_pair(
        &self,
        access: &AccessTokenRecord,
        refresh: &RefreshTokenRecord,
    ) -> Result<(), TokenError> {
        self.inner.insert_pair(access, refresh).await
    }

    async fn find_access_by_value(
        &self,
        value: &str,
    ) -> Result<Option<AccessTokenRecord>, TokenError> {
        if self.ttl.is_zero() {
            return self.inner.find_access_by_value(value).await;
        }

        let key = fingerprint(value);
        if let Some(record) = self.cached(&key) {
            return Ok(Some(record));
        }

        let seen = self.deletes.load(Ordering::SeqCst);
        let found = self.inner.find_access_by_value(value).await?;
        if let Some(record) = &found {
            let mut entries = self.lock();
            if self.deletes.load(Ordering::SeqCst) == seen {
                entries.put(
                    key,
                    CachedRecord {
                        record: record.clone(),
                        cached_at: Instant::now(),
                    },
                );
            }
        }
        Ok(found)
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
        self.deletes.fetch_add(1, Ordering::SeqCst);
        let removed = self.inner.delete_pair(access_id).await;
        self.evict_access(access_id);
        removed
    }
}
