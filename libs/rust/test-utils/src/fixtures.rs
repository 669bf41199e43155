//! Fixed test data.

/// Access-token secret used by deterministic tests.
pub const ACCESS_SECRET: &str = "access-secret-for-tests-only-0123456789";

/// Refresh-token secret used by deterministic tests.
pub const REFRESH_SECRET: &str = "refresh-secret-for-tests-only-9876543210";

/// A principal that holds the `admin` role in [`sample_roles`].
pub const ADMIN_PRINCIPAL: u64 = 42;

/// A principal that holds the `viewer` role in [`sample_roles`].
pub const VIEWER_PRINCIPAL: u64 = 7;

/// Role assignments for a small admin backend.
#[must_use]
pub fn sample_roles() -> Vec<(u64, Vec<String>)> {
    vec![
        (ADMIN_PRINCIPAL, vec!["admin".to_string()]),
        (VIEWER_PRINCIPAL, vec!["viewer".to_string()]),
    ]
}

/// Environment for `Config::from_source`, as `(name, value)` pairs.
#[must_use]
pub fn sample_env() -> Vec<(&'static str, String)> {
    vec![
        ("JWT_SECRET", ACCESS_SECRET.to_string()),
        ("JWT_REFRESH_SECRET", REFRESH_SECRET.to_string()),
        ("JWT_EXPIRE", "900".to_string()),
        ("REFRESH_EXPIRE", "86400".to_string()),
    ]
}
