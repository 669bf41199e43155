//! Source of a principal's current authorization claims.
//!
//! Rotation asks the provider again instead of copying roles out of the old
//! token, so a role change takes effect at the next refresh.

use crate::error::TokenError;
use crate::jwt::PrincipalId;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[async_trait]
pub trait ClaimsProvider: Send + Sync {
    /// Role values currently held by `principal_id`, in a stable order.
    async fn roles_for(&self, principal_id: PrincipalId) -> Result<Vec<String>, TokenError>;
}

/// In-process role assignments. Principals without an entry hold no roles.
#[derive(Debug, Default)]
pub struct RoleRegistry {
    roles: RwLock<HashMap<PrincipalId, Vec<String>>>,
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roles<I, R>(assignments: I) -> Self
    where
        I: IntoIterator<Item = (PrincipalId, Vec<R>)>,
        R: Into<String>,
    {
        let roles = assignments
            .into_iter()
            .map(|(id, roles)| (id, roles.into_iter().map(Into::into).collect()))
            .collect();
        RoleRegistry {
            roles: RwLock::new(roles),
        }
    }

    /// Replace the roles of `principal_id`.
    pub async fn set_roles<R: Into<String>>(&self, principal_id: PrincipalId, roles: Vec<R>) {
        let roles = roles.into_iter().map(Into::into).collect();
        self.roles.write().await.insert(principal_id, roles);
    }

    pub async fn remove(&self, principal_id: PrincipalId) {
        self.roles.write().await.remove(&principal_id);
    }
}

#[async_trait]
impl ClaimsProvider for RoleRegistry {
    async fn roles_for(&self, principal_id: PrincipalId) -> Result<Vec<String>, TokenError> {
        Ok(self
            .roles
            .read()
            .await
            .get(&principal_id)
            .cloned()
            .unwrap_or_default())
    }
}
