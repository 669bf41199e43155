//! Shared helpers for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use test_utils::fixtures::{sample_roles, ACCESS_SECRET, REFRESH_SECRET};
use token_lifecycle::config::{RotationPolicy, TokenSettings};
use token_lifecycle::jwt::PrincipalId;
use token_lifecycle::storage::{AccessTokenRecord, RefreshTokenRecord, TokenPairRecord, TokenStore};
use token_lifecycle::{RoleRegistry, TokenError, TokenService};
use uuid::Uuid;

pub fn settings() -> TokenSettings {
    TokenSettings::new(ACCESS_SECRET, REFRESH_SECRET)
        .with_access_ttl(Duration::from_secs(900))
        .with_refresh_ttl(Duration::from_secs(86_400))
}

pub fn registry() -> Arc<RoleRegistry> {
    Arc::new(RoleRegistry::with_roles(sample_roles()))
}

/// In-memory service plus a handle on its role registry.
pub fn service_with(settings: &TokenSettings) -> (TokenService, Arc<RoleRegistry>) {
    let roles = registry();
    let service = TokenService::in_memory(settings, roles.clone()).expect("in-memory service");
    (service, roles)
}

pub fn service(policy: RotationPolicy) -> (TokenService, Arc<RoleRegistry>) {
    service_with(&settings().with_rotation_policy(policy))
}

/// Store whose every operation fails, as if the backend were down.
pub struct UnavailableStore;

#[async_trait]
impl TokenStore for UnavailableStore {
    async fn insert_pair(
        &self,
        _access: &AccessTokenRecord,
        _refresh: &RefreshTokenRecord,
    ) -> Result<(), TokenError> {
        Err(TokenError::storage("connection refused"))
    }

    async fn find_access_by_value(&self, _value: &str) -> Result<Option<AccessTokenRecord>, TokenError> {
        Err(TokenError::storage("connection refused"))
    }

    async fn find_refresh_by_value(&self, _value: &str) -> Result<Option<TokenPairRecord>, TokenError> {
        Err(TokenError::storage("connection refused"))
    }

    async fn find_access_by_principal(
        &self,
        _principal_id: PrincipalId,
    ) -> Result<Vec<AccessTokenRecord>, TokenError> {
        Err(TokenError::storage("connection refused"))
    }

    async fn delete_pair(&self, _access_id: Uuid) -> Result<bool, TokenError> {
        Err(TokenError::storage("connection refused"))
    }
}
