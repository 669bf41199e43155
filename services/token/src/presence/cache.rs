use crate::error::TokenError;
use crate::presence::{online_key, SessionPresence};
use async_trait::async_trait;
use rust_common::{CacheClient, CacheClientConfig};
use std::time::Duration;
use uuid::Uuid;

/// In-process presence markers held in a namespaced [`CacheClient`].
#[derive(Debug, Clone)]
pub struct CachePresence {
    cache: CacheClient,
}

impl CachePresence {
    pub fn new(config: CacheClientConfig) -> Result<Self, TokenError> {
        Ok(CachePresence {
            cache: CacheClient::new(config)?,
        })
    }

    pub fn cache_client(&self) -> &CacheClient {
        &self.cache
    }
}

#[async_trait]
impl SessionPresence for CachePresence {
    async fn mark_online(&self, access_token_id: Uuid, ttl: Duration) -> Result<(), TokenError> {
        self.cache
            .set(&online_key(access_token_id), b"1", Some(ttl))
            .await
            .map_err(|e| TokenError::presence(e.to_string()))
    }

    async fn is_online(&self, access_token_id: Uuid) -> Result<bool, TokenError> {
        Ok(self.cache.exists(&online_key(access_token_id)).await)
    }

    async fn clear(&self, access_token_id: Uuid) -> Result<(), TokenError> {
        self.cache.delete(&online_key(access_token_id)).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn presence() -> CachePresence {
        CachePresence::new(CacheClientConfig::default().with_namespace("presence-test")).unwrap()
    }

    #[tokio::test]
    async fn test_mark_and_clear() {
        let presence = presence();
        let id = Uuid::new_v4();

        assert!(!presence.is_online(id).await.unwrap());

        presence.mark_online(id, Duration::from_secs(60)).await.unwrap();
        assert!(presence.is_online(id).await.unwrap());

        presence.clear(id).await.unwrap();
        assert!(!presence.is_online(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_absent_is_ok() {
        assert!(presence().clear(Uuid::new_v4()).await.is_ok());
    }

    #[tokio::test]
    async fn test_marker_expires() {
        let presence = presence();
        let id = Uuid::new_v4();

        presence.mark_online(id, Duration::from_millis(20)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(!presence.is_online(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_keys_are_namespaced() {
        let presence = presence();
        let id = Uuid::new_v4();
        presence.mark_online(id, Duration::from_secs(60)).await.unwrap();

        let other = CachePresence::new(CacheClientConfig::default().with_namespace("other")).unwrap();
        assert!(!other.is_online(id).await.unwrap());
        assert_eq!(presence.cache_client().namespace(), "presence-test");
    }
}
