//! In-process credential store.

use crate::error::TokenError;
use crate::jwt::PrincipalId;
use crate::storage::{check_link, AccessTokenRecord, RefreshTokenRecord, TokenPairRecord, TokenStore};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    access: HashMap<Uuid, AccessTokenRecord>,
    // keyed by access token id
    refresh: HashMap<Uuid, RefreshTokenRecord>,
    access_by_value: HashMap<String, Uuid>,
    // refresh value -> access token id
    refresh_by_value: HashMap<String, Uuid>,
}

/// Token store held in memory. Every operation runs under a single write or
/// read guard, which gives pair writes and deletes their atomicity.
#[derive(Default)]
pub struct MemoryTokenStore {
    tables: RwLock<Tables>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored pairs.
    pub async fn len(&self) -> usize {
        self.tables.read().await.access.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn insert_pair(
        &self,
        access: &AccessTokenRecord,
        refresh: &RefreshTokenRecord,
    ) -> Result<(), TokenError> {
        check_link(access, refresh)?;

        let mut tables = self.tables.write().await;
        if tables.access.contains_key(&access.id)
            || tables.access_by_value.contains_key(&access.value)
            || tables.refresh_by_value.contains_key(&refresh.value)
        {
            return Err(TokenError::storage("duplicate token record"));
        }

        tables.access_by_value.insert(access.value.clone(), access.id);
        tables.refresh_by_value.insert(refresh.value.clone(), access.id);
        tables.access.insert(access.id, access.clone());
        tables.refresh.insert(access.id, refresh.clone());
        Ok(())
    }

    async fn find_access_by_value(
        &self,
        value: &str,
    ) -> Result<Option<AccessTokenRecord>, TokenError> {
        let tables = self.tables.read().await;
        Ok(tables
            .access_by_value
            .get(value)
            .and_then(|id| tables.access.get(id))
            .cloned())
    }

    async fn find_refresh_by_value(
        &self,
        value: &str,
    ) -> Result<Option<TokenPairRecord>, TokenError> {
        let tables = self.tables.read().await;
        let Some(access_id) = tables.refresh_by_value.get(value) else {
            return Ok(None);
        };

        match (tables.access.get(access_id), tables.refresh.get(access_id)) {
            (Some(access), Some(refresh)) => Ok(Some(TokenPairRecord {
                access: access.clone(),
                refresh: refresh.clone(),
            })),
            _ => Err(TokenError::internal(format!(
                "dangling refresh index for access token {}",
                access_id
            ))),
        }
    }

    async fn find_access_by_principal(
        &self,
        principal_id: PrincipalId,
    ) -> Result<Vec<AccessTokenRecord>, TokenError> {
        let tables = self.tables.read().await;
        Ok(tables
            .access
            .values()
            .filter(|record| record.principal_id == principal_id)
            .cloned()
            .collect())
    }

    async fn delete_pair(&self, access_id: Uuid) -> Result<bool, TokenError> {
        let mut tables = self.tables.write().await;
        let Some(access) = tables.access.remove(&access_id) else {
            return Ok(false);
        };

        tables.access_by_value.remove(&access.value);
        if let Some(refresh) = tables.refresh.remove(&access_id) {
            tables.refresh_by_value.remove(&refresh.value);
        }
        Ok(true)
    }
}
