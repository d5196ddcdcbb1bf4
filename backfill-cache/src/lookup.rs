//! Read-through lookup.
//!
//! Consults the cache first; on a miss, fetches from the remote source and
//! backfills the cache before returning.

use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use backfill_core::{Cache, CacheError, LookupConfig, RemoteError, RemoteSource};
use chrono::Utc;

use crate::freshness::{CacheRead, Freshness};
use crate::stats::{LookupStats, LookupStatsSnapshot};

/// Read-through lookup over a remote source and a cache.
///
/// # Type Parameters
///
/// - `K`: lookup key (`()` for a single implicit value)
/// - `V`: looked-up value
/// - `R`: the remote source consulted on a miss
/// - `C`: the cache consulted first
///
/// # Concurrency
///
/// Calls may run concurrently. In-flight fetches are not de-duplicated: two
/// concurrent misses for the same key both fetch and both backfill, and the
/// last write wins.
///
/// # Example
///
/// ```ignore
/// let lookup = CacheBackedLookup::with_defaults(Arc::new(api), Arc::new(InMemoryCache::new()));
///
/// let username = lookup.get_value().await?;
/// ```
pub struct CacheBackedLookup<K, V, R, C> {
    remote: Arc<R>,
    cache: Arc<C>,
    config: LookupConfig,
    freshness: Freshness,
    stats: Arc<LookupStats>,
    _marker: PhantomData<fn(K) -> V>,
}

impl<K, V, R, C> CacheBackedLookup<K, V, R, C>
where
    K: Clone + Debug + Send + Sync,
    V: Clone + Send + Sync,
    R: RemoteSource<K, V>,
    C: Cache<K, V>,
{
    /// Create a new lookup.
    pub fn new(remote: Arc<R>, cache: Arc<C>, config: LookupConfig) -> Self {
        let freshness = Freshness::from_max_staleness(config.max_staleness);
        Self {
            remote,
            cache,
            config,
            freshness,
            stats: Arc::new(LookupStats::new()),
            _marker: PhantomData,
        }
    }

    /// Create a new lookup with default configuration.
    pub fn with_defaults(remote: Arc<R>, cache: Arc<C>) -> Self {
        Self::new(remote, cache, LookupConfig::default())
    }

    /// Get the lookup configuration.
    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    /// Freshness applied by [`get`](Self::get) and [`read`](Self::read).
    pub fn freshness(&self) -> Freshness {
        self.freshness
    }

    /// Get the remote source consulted on a miss.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Get the cache consulted first.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Snapshot of the counters shared by this lookup and its clones.
    pub fn stats(&self) -> LookupStatsSnapshot {
        self.stats.snapshot()
    }

    /// Resolve `key`, preferring the cache.
    ///
    /// A failure to store the fetched value is logged and the value is
    /// still returned; use [`read`](Self::read) to observe it.
    pub async fn get(&self, key: &K) -> Result<V, RemoteError> {
        self.read(key).await.map(CacheRead::into_value)
    }

    /// Resolve `key` with the configured freshness, returning read metadata.
    pub async fn read(&self, key: &K) -> Result<CacheRead<V>, RemoteError> {
        self.read_with(key, self.freshness).await
    }

    /// Resolve `key` with an explicit freshness requirement.
    ///
    /// A hit never touches the remote source. A miss fetches, backfills, and
    /// returns the fetched value. A remote failure is returned unchanged and
    /// leaves the cache untouched.
    pub async fn read_with(
        &self,
        key: &K,
        freshness: Freshness,
    ) -> Result<CacheRead<V>, RemoteError> {
        match self.cache.get(key).await {
            Ok(Some(entry)) => {
                let age = entry.age();
                if freshness.accepts(age) {
                    self.stats.record_hit();
                    tracing::debug!(lookup = %self.config.name, ?key, "cache hit");
                    return Ok(CacheRead::from_cache(entry.value, entry.cached_at));
                }
                self.stats.record_stale_refresh();
                tracing::debug!(
                    lookup = %self.config.name,
                    ?key,
                    age_ms = age.as_millis() as u64,
                    "cached value too stale, refetching"
                );
            }
            Ok(None) => {
                tracing::debug!(lookup = %self.config.name, ?key, "cache miss");
            }
            Err(e) => {
                self.stats.record_cache_read_failure();
                tracing::warn!(
                    lookup = %self.config.name,
                    ?key,
                    error = %e,
                    "cache read failed, treating as miss"
                );
            }
        }

        self.stats.record_miss();
        self.fetch_and_backfill(key).await
    }

    /// Fetch from the remote source and store the result.
    async fn fetch_and_backfill(&self, key: &K) -> Result<CacheRead<V>, RemoteError> {
        self.stats.record_remote_fetch();
        let value = match self.remote.fetch(key).await {
            Ok(value) => value,
            Err(e) => {
                self.stats.record_remote_failure();
                tracing::warn!(lookup = %self.config.name, ?key, error = %e, "remote fetch failed");
                return Err(e);
            }
        };

        let cached_at = Utc::now();
        match self.cache.put(key.clone(), value.clone(), cached_at).await {
            Ok(()) => {
                self.stats.record_backfill();
                tracing::trace!(lookup = %self.config.name, ?key, "backfilled");
                Ok(CacheRead::from_remote(value, cached_at))
            }
            Err(e) => {
                self.stats.record_backfill_failure();
                tracing::warn!(
                    lookup = %self.config.name,
                    ?key,
                    error = %e,
                    "backfill failed, returning fetched value"
                );
                Ok(CacheRead::from_remote_unbackfilled(value, cached_at, e))
            }
        }
    }

    /// Put a value into the cache ahead of any lookup.
    pub async fn put(&self, key: K, value: V) -> Result<(), CacheError> {
        self.cache.put(key, value, Utc::now()).await
    }

    /// Remove the cached value for `key`. Returns true if one was removed.
    pub async fn invalidate(&self, key: &K) -> Result<bool, CacheError> {
        self.cache.invalidate(key).await
    }
}

impl<V, R, C> CacheBackedLookup<(), V, R, C>
where
    V: Clone + Send + Sync,
    R: RemoteSource<(), V>,
    C: Cache<(), V>,
{
    /// Resolve the single implicit value.
    pub async fn get_value(&self) -> Result<V, RemoteError> {
        self.get(&()).await
    }

    /// Resolve the single implicit value, returning read metadata.
    pub async fn read_value(&self) -> Result<CacheRead<V>, RemoteError> {
        self.read(&()).await
    }
}

impl<K, V, R, C> Clone for CacheBackedLookup<K, V, R, C> {
    fn clone(&self) -> Self {
        Self {
            remote: Arc::clone(&self.remote),
            cache: Arc::clone(&self.cache),
            config: self.config.clone(),
            freshness: self.freshness,
            stats: Arc::clone(&self.stats),
            _marker: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryCache;
    use async_trait::async_trait;
    use backfill_core::CachedValue;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    // Remote source that hands out a fixed value and counts calls.
    struct CountingRemote {
        value: Option<String>,
        calls: AtomicU64,
    }

    impl CountingRemote {
        fn returning(value: &str) -> Self {
            Self {
                value: Some(value.to_string()),
                calls: AtomicU64::new(0),
            }
        }

        fn unavailable() -> Self {
            Self {
                value: None,
                calls: AtomicU64::new(0),
            }
        }

        fn calls(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RemoteSource<(), String> for CountingRemote {
        async fn fetch(&self, _key: &()) -> Result<String, RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.value
                .clone()
                .ok_or_else(|| RemoteError::unavailable("user-api", "connection refused"))
        }
    }

    // Cache whose reads and writes always fail.
    struct BrokenCache;

    #[async_trait]
    impl Cache<(), String> for BrokenCache {
        async fn get(&self, _key: &()) -> Result<Option<CachedValue<String>>, CacheError> {
            Err(CacheError::unavailable("read refused"))
        }

        async fn put(
            &self,
            _key: (),
            _value: String,
            _cached_at: backfill_core::Timestamp,
        ) -> Result<(), CacheError> {
            Err(CacheError::unavailable("write refused"))
        }

        async fn invalidate(&self, _key: &()) -> Result<bool, CacheError> {
            Err(CacheError::unavailable("invalidate refused"))
        }
    }

    fn lookup_with(
        remote: CountingRemote,
        cache: InMemoryCache<(), String>,
    ) -> CacheBackedLookup<(), String, CountingRemote, InMemoryCache<(), String>> {
        CacheBackedLookup::with_defaults(Arc::new(remote), Arc::new(cache))
    }

    #[tokio::test]
    async fn test_hit_skips_remote() {
        let cache = InMemoryCache::with_entries([((), "oleksii".to_string())], Utc::now());
        let lookup = lookup_with(CountingRemote::returning("backend"), cache);

        let read = lookup.read_value().await.unwrap();

        assert!(read.was_cache_hit());
        assert_eq!(read.into_value(), "oleksii");
        assert_eq!(lookup.remote().calls(), 0);
    }

    #[tokio::test]
    async fn test_miss_fetches_and_backfills() {
        let lookup = lookup_with(CountingRemote::returning("oleksii"), InMemoryCache::new());

        let read = lookup.read_value().await.unwrap();

        assert!(read.was_cache_miss());
        assert!(read.is_backfilled());
        assert_eq!(read.value(), "oleksii");
        assert_eq!(lookup.remote().calls(), 1);
        let cached = lookup.cache().get(&()).await.unwrap().unwrap();
        assert_eq!(cached.value, "oleksii");
        assert_eq!(cached.cached_at, read.cached_at());
    }

    #[tokio::test]
    async fn test_second_call_is_a_hit() {
        let lookup = lookup_with(CountingRemote::returning("oleksii"), InMemoryCache::new());

        assert_eq!(lookup.get_value().await.unwrap(), "oleksii");
        assert_eq!(lookup.get_value().await.unwrap(), "oleksii");

        assert_eq!(lookup.remote().calls(), 1);
        let stats = lookup.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.backfills, 1);
    }

    #[tokio::test]
    async fn test_remote_failure_propagates_and_leaves_cache_empty() {
        let lookup = lookup_with(CountingRemote::unavailable(), InMemoryCache::new());

        let err = lookup.get_value().await.unwrap_err();

        assert_eq!(err, RemoteError::unavailable("user-api", "connection refused"));
        assert!(lookup.cache().is_empty().await);
        assert_eq!(lookup.stats().remote_failures, 1);
        assert_eq!(lookup.stats().backfills, 0);
    }

    #[tokio::test]
    async fn test_broken_cache_reads_as_miss_and_keeps_value() {
        let lookup: CacheBackedLookup<(), String, _, _> = CacheBackedLookup::with_defaults(
            Arc::new(CountingRemote::returning("oleksii")),
            Arc::new(BrokenCache),
        );

        let read = lookup.read_value().await.unwrap();

        assert_eq!(read.value(), "oleksii");
        assert_eq!(
            read.backfill_error(),
            Some(&CacheError::unavailable("write refused"))
        );
        let stats = lookup.stats();
        assert_eq!(stats.cache_read_failures, 1);
        assert_eq!(stats.backfill_failures, 1);
        assert_eq!(lookup.get_value().await.unwrap(), "oleksii");
    }

    #[tokio::test]
    async fn test_stale_entry_is_refetched_under_max_age() {
        let old = Utc::now() - chrono::Duration::seconds(120);
        let cache = InMemoryCache::with_entries([((), "old".to_string())], old);
        let config = LookupConfig::new()
            .with_name("username")
            .with_max_staleness(Duration::from_secs(60));
        let lookup: CacheBackedLookup<(), String, _, _> = CacheBackedLookup::new(
            Arc::new(CountingRemote::returning("new")),
            Arc::new(cache),
            config,
        );

        let read = lookup.read_value().await.unwrap();

        assert!(read.was_cache_miss());
        assert_eq!(read.value(), "new");
        assert_eq!(lookup.stats().stale_refreshes, 1);
        assert_eq!(lookup.cache().get(&()).await.unwrap().unwrap().value, "new");
    }

    #[tokio::test]
    async fn test_any_freshness_serves_old_entry() {
        let old = Utc::now() - chrono::Duration::days(365);
        let cache = InMemoryCache::with_entries([((), "old".to_string())], old);
        let lookup = lookup_with(CountingRemote::returning("new"), cache);

        assert_eq!(lookup.freshness(), Freshness::Any);
        assert_eq!(lookup.get_value().await.unwrap(), "old");
        assert_eq!(lookup.remote().calls(), 0);
    }

    #[tokio::test]
    async fn test_put_and_invalidate() {
        let lookup = lookup_with(CountingRemote::returning("backend"), InMemoryCache::new());

        lookup.put((), "warmed".to_string()).await.unwrap();
        assert_eq!(lookup.get_value().await.unwrap(), "warmed");

        assert!(lookup.invalidate(&()).await.unwrap());
        assert_eq!(lookup.get_value().await.unwrap(), "backend");
        assert_eq!(lookup.remote().calls(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_cache_and_stats() {
        let lookup = lookup_with(CountingRemote::returning("oleksii"), InMemoryCache::new());
        let clone = lookup.clone();

        lookup.get_value().await.unwrap();
        clone.get_value().await.unwrap();

        assert_eq!(lookup.remote().calls(), 1);
        assert_eq!(clone.stats().lookups(), 2);
        assert_eq!(lookup.stats().hits, 1);
    }
}
