use crate::jwt::PrincipalId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted access token. Owned by one principal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessTokenRecord {
    pub id: Uuid,
    pub value: String,
    pub principal_id: PrincipalId,
    pub expires_at: DateTime<Utc>,
}

impl AccessTokenRecord {
    pub fn new(value: String, principal_id: PrincipalId, expires_at: DateTime<Utc>) -> Self {
        AccessTokenRecord {
            id: Uuid::new_v4(),
            value,
            principal_id,
            expires_at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Persisted refresh token. Exclusively owned by its access token; the two
/// are written and deleted together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub value: String,
    pub expires_at: DateTime<Utc>,
    pub access_token_id: Uuid,
}

impl RefreshTokenRecord {
    pub fn new(value: String, expires_at: DateTime<Utc>, access: &AccessTokenRecord) -> Self {
        RefreshTokenRecord {
            id: Uuid::new_v4(),
            value,
            expires_at,
            access_token_id: access.id,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// A refresh token together with the access token it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPairRecord {
    pub access: AccessTokenRecord,
    pub refresh: RefreshTokenRecord,
}

impl TokenPairRecord {
    pub fn principal_id(&self) -> PrincipalId {
        self.access.principal_id
    }
}
