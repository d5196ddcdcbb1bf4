//! Proptest strategies for lookup keys, values and failures.

use super::*;
use chrono::Utc;
use proptest::prelude::*;

/// Generate a short lookup key such as `user-42`.
pub fn arb_key() -> impl Strategy<Value = String> {
    "[a-z]{1,8}-[0-9]{1,4}"
}

/// Generate a value as the backend would return it (may be empty).
pub fn arb_value() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 _.-]{0,32}"
}

/// Generate a non-empty username.
pub fn arb_username() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,15}"
}

/// Generate a remote failure.
pub fn arb_remote_error() -> impl Strategy<Value = RemoteError> {
    ("[a-z-]{1,12}", "[a-z ]{0,24}")
        .prop_map(|(source_name, reason)| RemoteError::Unavailable { source_name, reason })
}

/// Generate a cache failure.
pub fn arb_cache_error() -> impl Strategy<Value = CacheError> {
    prop_oneof![
        "[a-z ]{0,24}".prop_map(|reason| CacheError::Unavailable { reason }),
        Just(CacheError::LockPoisoned),
    ]
}

/// Generate a cache timestamp up to `max_age_secs` in the past.
pub fn arb_cached_at(max_age_secs: i64) -> impl Strategy<Value = Timestamp> {
    (0..=max_age_secs).prop_map(|age| Utc::now() - chrono::Duration::seconds(age))
}

/// Generate a map of keys to values for a pre-populated remote or cache.
pub fn arb_entries(max: usize) -> impl Strategy<Value = Vec<(String, String)>> {
    proptest::collection::vec((arb_key(), arb_value()), 0..=max)
}
