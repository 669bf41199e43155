//! Namespaced in-process key/value cache with per-entry TTL.
//!
//! Entries expire lazily: reads ignore expired entries, and writes sweep
//! them out once the configured capacity is reached.

use crate::PlatformError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Cache client configuration.
#[derive(Debug, Clone)]
pub struct CacheClientConfig {
    /// Namespace for key isolation
    pub namespace: String,
    /// TTL applied when a write does not specify one
    pub default_ttl: Duration,
    /// Maximum number of live entries
    pub capacity: usize,
}

impl Default for CacheClientConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            default_ttl: Duration::from_secs(3600),
            capacity: 10_000,
        }
    }
}

impl CacheClientConfig {
    /// Create config with custom namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Create config with custom TTL.
    #[must_use]
    pub const fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Create config with custom capacity.
    #[must_use]
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

struct CacheEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// Cache client shared between tasks; cloning shares the same entries.
#[derive(Clone)]
pub struct CacheClient {
    config: CacheClientConfig,
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl std::fmt::Debug for CacheClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheClient")
            .field("namespace", &self.config.namespace)
            .field("capacity", &self.config.capacity)
            .finish_non_exhaustive()
    }
}

impl CacheClient {
    /// Create a new cache client.
    ///
    /// # Errors
    ///
    /// Returns an error if the namespace is empty or the capacity is zero.
    pub fn new(config: CacheClientConfig) -> Result<Self, PlatformError> {
        if config.namespace.is_empty() {
            return Err(PlatformError::invalid_input("cache namespace must not be empty"));
        }
        if config.capacity == 0 {
            return Err(PlatformError::invalid_input("cache capacity must be positive"));
        }

        Ok(Self {
            config,
            entries: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Get a value from the cache.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let key = self.namespaced_key(key);
        let entries = self.entries.read().await;
        entries
            .get(&key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone())
    }

    /// Set a value in the cache.
    ///
    /// When the cache is full, expired entries are swept first; if it is
    /// still full, the entry closest to expiry is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if `key` is empty.
    pub async fn set(
        &self,
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> Result<(), PlatformError> {
        if key.is_empty() {
            return Err(PlatformError::invalid_input("cache key must not be empty"));
        }

        let key = self.namespaced_key(key);
        let ttl = ttl.unwrap_or(self.config.default_ttl);
        let now = Instant::now();

        let mut entries = self.entries.write().await;
        if !entries.contains_key(&key) && entries.len() >= self.config.capacity {
            entries.retain(|_, entry| entry.expires_at > now);
            if entries.len() >= self.config.capacity {
                let soonest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.expires_at)
                    .map(|(k, _)| k.clone());
                if let Some(soonest) = soonest {
                    entries.remove(&soonest);
                }
            }
        }

        entries.insert(
            key,
            CacheEntry {
                value: value.to_vec(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    /// Delete a value. Returns whether a live entry was removed.
    pub async fn delete(&self, key: &str) -> bool {
        let key = self.namespaced_key(key);
        let mut entries = self.entries.write().await;
        entries
            .remove(&key)
            .is_some_and(|entry| entry.expires_at > Instant::now())
    }

    /// Check if a live entry exists for `key`.
    pub async fn exists(&self, key: &str) -> bool {
        let key = self.namespaced_key(key);
        let entries = self.entries.read().await;
        entries
            .get(&key)
            .is_some_and(|entry| entry.expires_at > Instant::now())
    }

    /// Number of stored entries, expired ones included until swept.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Get the namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    fn namespaced_key(&self, key: &str) -> String {
        format!("{}:{}", self.config.namespace, key)
    }
}
