//! Shared proptest generators.

use proptest::prelude::*;

/// Generate principal ids, including the boundary values.
pub fn principal_id_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![
        Just(1u64),
        Just(u64::MAX),
        1u64..1_000_000,
    ]
}

/// Generate a single role value in the admin backend's naming style.
pub fn role_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("admin".to_string()),
        Just("viewer".to_string()),
        Just("operator".to_string()),
        "[a-z][a-z0-9_-]{0,23}",
    ]
}

/// Generate an ordered role list, possibly empty.
pub fn roles_strategy() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(role_strategy(), 0..6)
}

/// Generate HMAC secrets long enough for HS256.
pub fn secret_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9!@#%^&*_+=-]{32,64}"
}

/// Generate a pair of distinct access/refresh secrets.
pub fn secret_pair_strategy() -> impl Strategy<Value = (String, String)> {
    (secret_strategy(), secret_strategy()).prop_filter("secrets must differ", |(a, b)| a != b)
}
