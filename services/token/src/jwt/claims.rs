use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Numeric id of the principal (user) a token is issued for.
pub type PrincipalId = u64;

/// Payload of an access token.
///
/// Wire names follow the admin backend's existing tokens: `uid`, `pv`,
/// `roles`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    #[serde(rename = "uid")]
    pub principal_id: PrincipalId,
    #[serde(rename = "pv")]
    pub policy_version: u32,
    #[serde(default)]
    pub roles: Vec<String>,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl AccessClaims {
    pub fn new(
        principal_id: PrincipalId,
        policy_version: u32,
        roles: Vec<String>,
        ttl: Duration,
    ) -> Self {
        let iat = chrono::Utc::now().timestamp();
        AccessClaims {
            principal_id,
            policy_version,
            roles,
            jti: uuid::Uuid::new_v4().to_string(),
            iat,
            exp: iat.saturating_add(ttl_seconds(ttl)),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Payload of a refresh token: a random identifier and nothing else.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshClaims {
    pub uuid: String,
    pub iat: i64,
    pub exp: i64,
}

impl RefreshClaims {
    pub fn new(ttl: Duration) -> Self {
        let iat = chrono::Utc::now().timestamp();
        RefreshClaims {
            uuid: uuid::Uuid::new_v4().to_string(),
            iat,
            exp: iat.saturating_add(ttl_seconds(ttl)),
        }
    }
}

fn ttl_seconds(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_claims_creation() {
        let claims = AccessClaims::new(42, 1, vec!["admin".to_string()], Duration::from_secs(900));

        assert_eq!(claims.principal_id, 42);
        assert_eq!(claims.policy_version, 1);
        assert_eq!(claims.exp - claims.iat, 900);
        assert!(claims.has_role("admin"));
        assert!(!claims.has_role("viewer"));
    }

    #[test]
    fn test_access_claims_wire_names() {
        let claims = AccessClaims::new(42, 3, vec!["admin".to_string()], Duration::from_secs(60));
        let json = serde_json::to_value(&claims).unwrap();

        assert_eq!(json["uid"], 42);
        assert_eq!(json["pv"], 3);
        assert_eq!(json["roles"][0], "admin");
        assert!(json.get("principal_id").is_none());
    }

    #[test]
    fn test_jti_unique_within_same_second() {
        let a = AccessClaims::new(1, 1, Vec::new(), Duration::from_secs(60));
        let b = AccessClaims::new(1, 1, Vec::new(), Duration::from_secs(60));
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_refresh_claims_carry_no_application_data() {
        let claims = RefreshClaims::new(Duration::from_secs(3600));
        let json = serde_json::to_value(&claims).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();

        assert_eq!(keys.len(), 3);
        assert!(json.get("uid").is_none());
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let claims = RefreshClaims::new(Duration::from_secs(u64::MAX));
        assert_eq!(claims.exp, i64::MAX);
    }
}
