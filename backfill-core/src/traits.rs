//! Capability traits for the read-through lookup.
//!
//! A lookup only ever talks to its collaborators through these traits. Real
//! backends and in-memory test doubles implement the same two capabilities,
//! so the consumer never changes between production and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{CacheError, RemoteError};
use crate::CachedValue;

/// Remote source capability: the authoritative, expensive side.
#[async_trait]
pub trait RemoteSource<K, V>: Send + Sync
where
    K: Send + Sync,
    V: Send,
{
    /// Fetch the authoritative value for `key`.
    ///
    /// Fails with [`RemoteError::Unavailable`] when the remote call cannot
    /// complete.
    async fn fetch(&self, key: &K) -> Result<V, RemoteError>;
}

/// Cache capability: the cheap, local side.
///
/// Implementations must be safe for concurrent use. A `put` replaces the
/// whole entry for a key; readers never observe a partially written value.
#[async_trait]
pub trait Cache<K, V>: Send + Sync
where
    K: Send + Sync,
    V: Send,
{
    /// Get the cached value for `key`, or `None` if absent.
    async fn get(&self, key: &K) -> Result<Option<CachedValue<V>>, CacheError>;

    /// Store `value` for `key`, replacing any previous entry.
    ///
    /// The `cached_at` timestamp is stored alongside the value to support
    /// staleness calculations.
    async fn put(&self, key: K, value: V, cached_at: DateTime<Utc>) -> Result<(), CacheError>;

    /// Remove the entry for `key`. Returns true if an entry was removed.
    async fn invalidate(&self, key: &K) -> Result<bool, CacheError>;
}
