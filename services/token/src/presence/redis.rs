use crate::error::TokenError;
use crate::presence::{online_key, SessionPresence};
use ::redis::aio::ConnectionManager;
use ::redis::AsyncCommands;
use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

/// Presence markers in Redis, shared by every instance of the backend.
pub struct RedisPresence {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisPresence {
    pub async fn new(redis_url: &str, prefix: impl Into<String>) -> Result<Self, TokenError> {
        let client = ::redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::from_connection(conn, prefix))
    }

    pub fn from_connection(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisPresence {
            conn,
            prefix: prefix.into(),
        }
    }

    fn key(&self, access_token_id: Uuid) -> String {
        format!("{}:{}", self.prefix, online_key(access_token_id))
    }
}

#[async_trait]
impl SessionPresence for RedisPresence {
    async fn mark_online(&self, access_token_id: Uuid, ttl: Duration) -> Result<(), TokenError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(self.key(access_token_id), "1", ttl.as_secs().max(1))
            .await
            .map_err(|e| TokenError::presence(e.to_string()))?;
        Ok(())
    }

    async fn is_online(&self, access_token_id: Uuid) -> Result<bool, TokenError> {
        let mut conn = self.conn.clone();
        conn.exists(self.key(access_token_id))
            .await
            .map_err(|e| TokenError::presence(e.to_string()))
    }

    async fn clear(&self, access_token_id: Uuid) -> Result<(), TokenError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .del(self.key(access_token_id))
            .await
            .map_err(|e| TokenError::presence(e.to_string()))?;
        Ok(())
    }
}
