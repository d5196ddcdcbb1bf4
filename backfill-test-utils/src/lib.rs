//! Backfill Test Utilities
//!
//! Shared test infrastructure for the backfill workspace:
//! - In-memory fakes of the remote source and cache capabilities
//! - Proptest generators for keys, values and errors
//! - Fixtures for common scenarios

pub mod fakes;
pub mod generators;

pub use fakes::{FakeCache, FakeRemoteSource};

// Re-export core types for convenience
pub use backfill_core::{
    Cache, CacheError, CachedValue, LookupConfig, RemoteError, RemoteSource, Timestamp,
};

// ============================================================================
// FIXTURES
// ============================================================================

/// Username served by the backend in the canonical scenario.
pub const USERNAME: &str = "oleksii";

/// Name of the fake remote source used in fixtures and error messages.
pub const FAKE_REMOTE_NAME: &str = "fake-remote";

/// Lookup config used by fixture lookups.
pub fn username_config() -> LookupConfig {
    LookupConfig::new().with_name("username")
}

/// A remote that always returns [`USERNAME`] for the implicit key.
pub fn username_remote() -> FakeRemoteSource<(), String> {
    FakeRemoteSource::constant(USERNAME.to_string())
}

/// A remote that is always unavailable.
pub fn unavailable_remote<K: 'static, V: 'static>() -> FakeRemoteSource<K, V> {
    FakeRemoteSource::from_fn(|_, _| Err(RemoteError::unavailable(FAKE_REMOTE_NAME, "offline")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_username_remote_fixture() {
        let remote = username_remote();
        assert_eq!(remote.fetch(&()).await.unwrap(), USERNAME);
        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_remote_fixture() {
        let remote: FakeRemoteSource<u32, String> = unavailable_remote();
        let err = remote.fetch(&1).await.unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(remote.calls(), 1);
    }

    #[test]
    fn test_username_config_is_valid() {
        assert!(username_config().validate().is_ok());
    }
}
