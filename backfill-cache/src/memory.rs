//! In-memory cache backend.

use async_trait::async_trait;
use backfill_core::{Cache, CacheError, CachedValue, Timestamp};
use std::collections::HashMap;
use std::hash::Hash;
use tokio::sync::RwLock;

/// Thread-safe in-memory implementation of [`Cache`].
///
/// Entries never expire on their own; they are replaced by `put` and removed
/// by `invalidate` or `clear`.
#[derive(Debug)]
pub struct InMemoryCache<K, V> {
    entries: RwLock<HashMap<K, CachedValue<V>>>,
}

impl<K, V> Default for InMemoryCache<K, V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> InMemoryCache<K, V>
where
    K: Eq + Hash,
{
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache pre-populated with `entries`, all stamped `cached_at`.
    pub fn with_entries(entries: impl IntoIterator<Item = (K, V)>, cached_at: Timestamp) -> Self {
        let entries = entries
            .into_iter()
            .map(|(key, value)| (key, CachedValue::new(value, cached_at)))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Number of cached entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// True when nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// True when `key` has a cached value, however old.
    pub async fn contains_key(&self, key: &K) -> bool {
        self.entries.read().await.contains_key(key)
    }

    /// Remove every entry, returning how many were removed.
    pub async fn clear(&self) -> usize {
        let mut entries = self.entries.write().await;
        let count = entries.len();
        entries.clear();
        count
    }
}

#[async_trait]
impl<K, V> Cache<K, V> for InMemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &K) -> Result<Option<CachedValue<V>>, CacheError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: K, value: V, cached_at: Timestamp) -> Result<(), CacheError> {
        self.entries
            .write()
            .await
            .insert(key, CachedValue::new(value, cached_at));
        Ok(())
    }

    async fn invalidate(&self, key: &K) -> Result<bool, CacheError> {
        Ok(self.entries.write().await.remove(key).is_some())
    }
}
