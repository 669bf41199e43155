//! Redis-backed credential store.
//!
//! Key layout, under a configurable prefix:
//!
//! - `{prefix}:access:{access_id}` access record (JSON)
//! - `{prefix}:refresh:{access_id}` refresh record (JSON)
//! - `{prefix}:access_value:{fingerprint}` access id
//! - `{prefix}:refresh_value:{fingerprint}` access id
//! - `{prefix}:principal:{principal_id}` set of access ids
//!
//! Pair writes and deletes run as `MULTI/EXEC` pipelines. Keys expire a
//! retention window after the refresh token does, so lazily detected
//! expiry still finds the record for a while.

use crate::error::TokenError;
use crate::jwt::PrincipalId;
use crate::storage::{
    check_link, fingerprint, AccessTokenRecord, RefreshTokenRecord, TokenPairRecord, TokenStore,
};
use ::redis::aio::ConnectionManager;
use ::redis::AsyncCommands;
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

const RETENTION_SECONDS: u64 = 86_400;

#[derive(Debug, Clone)]
struct Keys {
    prefix: String,
}

impl Keys {
    fn access(&self, id: Uuid) -> String {
        format!("{}:access:{}", self.prefix, id)
    }

    fn refresh(&self, access_id: Uuid) -> String {
        format!("{}:refresh:{}", self.prefix, access_id)
    }

    fn access_value(&self, value: &str) -> String {
        format!("{}:access_value:{}", self.prefix, fingerprint(value))
    }

    fn refresh_value(&self, value: &str) -> String {
        format!("{}:refresh_value:{}", self.prefix, fingerprint(value))
    }

    fn principal(&self, principal_id: PrincipalId) -> String {
        format!("{}:principal:{}", self.prefix, principal_id)
    }
}

pub struct RedisTokenStore {
    conn: ConnectionManager,
    keys: Keys,
}

impl RedisTokenStore {
    pub async fn new(redis_url: &str, prefix: impl Into<String>) -> Result<Self, TokenError> {
        let client = ::redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::from_connection(conn, prefix))
    }

    /// Build on an existing connection, e.g. one shared with presence.
    pub fn from_connection(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisTokenStore {
            conn,
            keys: Keys {
                prefix: prefix.into(),
            },
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, TokenError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key).await?;
        raw.map(|raw| {
            serde_json::from_str(&raw)
                .map_err(|e| TokenError::internal(format!("corrupt record at {}: {}", key, e)))
        })
        .transpose()
    }

    async fn get_access_id(&self, index_key: &str) -> Result<Option<Uuid>, TokenError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(index_key).await?;
        raw.map(|raw| {
            Uuid::parse_str(&raw)
                .map_err(|e| TokenError::internal(format!("corrupt index at {}: {}", index_key, e)))
        })
        .transpose()
    }
}

fn retention_ttl(refresh: &RefreshTokenRecord) -> u64 {
    let remaining = (refresh.expires_at - Utc::now()).num_seconds().max(1);
    u64::try_from(remaining)
        .unwrap_or(1)
        .saturating_add(RETENTION_SECONDS)
}

fn to_json<T: serde::Serialize>(record: &T) -> Result<String, TokenError> {
    serde_json::to_string(record).map_err(|e| TokenError::internal(e.to_string()))
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn insert_pair(
        &self,
        access: &AccessTokenRecord,
        refresh: &RefreshTokenRecord,
    ) -> Result<(), TokenError> {
        check_link(access, refresh)?;

        let ttl = retention_ttl(refresh);
        let access_id = access.id.to_string();
        let principal_key = self.keys.principal(access.principal_id);

        let mut pipe = ::redis::pipe();
        pipe.atomic()
            .set_ex(self.keys.access(access.id), to_json(access)?, ttl)
            .ignore()
            .set_ex(self.keys.refresh(access.id), to_json(refresh)?, ttl)
            .ignore()
            .set_ex(self.keys.access_value(&access.value), &access_id, ttl)
            .ignore()
            .set_ex(self.keys.refresh_value(&refresh.value), &access_id, ttl)
            .ignore()
            .sadd(&principal_key, &access_id)
            .ignore()
            .expire(&principal_key, i64::try_from(ttl).unwrap_or(i64::MAX))
            .ignore();

        let mut conn = self.conn.clone();
        let _: () = pipe.query_async(&mut conn).await?;

        debug!(access_id = %access.id, "Stored token pair");
        Ok(())
    }

    async fn find_access_by_value(
        &self,
        value: &str,
    ) -> Result<Option<AccessTokenRecord>, TokenError> {
        let Some(access_id) = self.get_access_id(&self.keys.access_value(value)).await? else {
            return Ok(None);
        };

        let record: Option<AccessTokenRecord> = self.get_json(&self.keys.access(access_id)).await?;
        Ok(record.filter(|r| r.value == value))
    }

    async fn find_refresh_by_value(
        &self,
        value: &str,
    ) -> Result<Option<TokenPairRecord>, TokenError> {
        let Some(access_id) = self.get_access_id(&self.keys.refresh_value(value)).await? else {
            return Ok(None);
        };

        let refresh: Option<RefreshTokenRecord> = self.get_json(&self.keys.refresh(access_id)).await?;
        let Some(refresh) = refresh.filter(|r| r.value == value) else {
            return Ok(None);
        };
        let Some(access) = self.get_json(&self.keys.access(access_id)).await? else {
            return Ok(None);
        };

        Ok(Some(TokenPairRecord { access, refresh }))
    }

    async fn find_access_by_principal(
        &self,
        principal_id: PrincipalId,
    ) -> Result<Vec<AccessTokenRecord>, TokenError> {
        let principal_key = self.keys.principal(principal_id);
        let mut conn = self.conn.clone();
        let members: Vec<String> = conn.smembers(&principal_key).await?;

        let mut records = Vec::with_capacity(members.len());
        let mut dead = Vec::new();
        for member in members {
            let record = match Uuid::parse_str(&member) {
                Ok(id) => self.get_json::<AccessTokenRecord>(&self.keys.access(id)).await?,
                Err(_) => None,
            };
            match record {
                Some(record) => records.push(record),
                // Record keys expired on their own; the set entry has no TTL of its own.
                None => dead.push(member),
            }
        }

        if !dead.is_empty() {
            let _: () = conn.srem(&principal_key, &dead).await?;
            debug!(principal_id = %principal_id, pruned = dead.len(), "Pruned expired principal index entries");
        }
        Ok(records)
    }

    async fn delete_pair(&self, access_id: Uuid) -> Result<bool, TokenError> {
        let access: Option<AccessTokenRecord> = self.get_json(&self.keys.access(access_id)).await?;
        let Some(access) = access else {
            return Ok(false);
        };
        let refresh: Option<RefreshTokenRecord> = self.get_json(&self.keys.refresh(access_id)).await?;

        let mut pipe = ::redis::pipe();
        pipe.atomic()
            .del(self.keys.access(access_id))
            .del(self.keys.refresh(access_id))
            .del(self.keys.access_value(&access.value))
            .ignore()
            .srem(self.keys.principal(access.principal_id), access_id.to_string())
            .ignore();
        if let Some(refresh) = &refresh {
            pipe.del(self.keys.refresh_value(&refresh.value)).ignore();
        }

        let mut conn = self.conn.clone();
        let (access_deleted, _refresh_deleted): (i64, i64) = pipe.query_async(&mut conn).await?;

        // Whoever removed the access row owns the claim.
        Ok(access_deleted == 1)
    }
}
