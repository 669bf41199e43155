//! Session-presence markers ("online" flags) keyed by access-token id.
//!
//! Presence is a best-effort side store: it is never consulted to decide
//! whether a token is valid.

pub mod cache;
pub mod redis;

pub use self::redis::RedisPresence;
pub use cache::CachePresence;

use crate::error::TokenError;
use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

#[async_trait]
pub trait SessionPresence: Send + Sync {
    async fn mark_online(&self, access_token_id: Uuid, ttl: Duration) -> Result<(), TokenError>;

    async fn is_online(&self, access_token_id: Uuid) -> Result<bool, TokenError>;

    /// Remove the marker. Clearing an absent marker is not an error.
    async fn clear(&self, access_token_id: Uuid) -> Result<(), TokenError>;
}

/// Presence key for an access token store id.
pub fn online_key(access_token_id: Uuid) -> String {
    format!("online:user:{}", access_token_id)
}
