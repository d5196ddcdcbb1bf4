//! Freshness requirements and lookup results.
//!
//! A read returns [`CacheRead<V>`], which tells the caller whether the value
//! came from the cache or the remote source, how old it is, and whether the
//! backfill after a miss succeeded.

use backfill_core::{CacheError, Timestamp};
use chrono::Utc;
use std::time::Duration;

/// Freshness requirement for a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Freshness {
    /// Any cached value is a hit, however old.
    #[default]
    Any,

    /// A cached value older than `max_staleness` is treated as a miss and
    /// refetched from the remote source.
    MaxAge {
        /// Maximum acceptable age of a cached value.
        max_staleness: Duration,
    },
}

impl Freshness {
    /// Accept any cached value.
    pub fn any() -> Self {
        Self::Any
    }

    /// Accept cached values no older than `max_staleness`.
    pub fn max_age(max_staleness: Duration) -> Self {
        Self::MaxAge { max_staleness }
    }

    /// Freshness implied by an optional staleness bound.
    pub fn from_max_staleness(max_staleness: Option<Duration>) -> Self {
        max_staleness.map_or(Self::Any, Self::max_age)
    }

    /// Returns true if a value of the given age satisfies this requirement.
    pub fn accepts(&self, age: Duration) -> bool {
        match self {
            Self::Any => true,
            Self::MaxAge { max_staleness } => age <= *max_staleness,
        }
    }

    /// The staleness bound, if any.
    pub fn max_staleness(&self) -> Option<Duration> {
        match self {
            Self::Any => None,
            Self::MaxAge { max_staleness } => Some(*max_staleness),
        }
    }
}

/// Result of a lookup, carrying where the value came from.
#[derive(Debug, Clone)]
pub struct CacheRead<V> {
    value: V,
    /// When the value was cached, or fetched on a miss.
    cached_at: Timestamp,
    was_cache_hit: bool,
    /// Set when a miss fetched the value but storing it failed.
    backfill_error: Option<CacheError>,
}

impl<V> CacheRead<V> {
    /// A value served from the cache.
    pub fn from_cache(value: V, cached_at: Timestamp) -> Self {
        Self {
            value,
            cached_at,
            was_cache_hit: true,
            backfill_error: None,
        }
    }

    /// A value fetched from the remote source and backfilled at `cached_at`.
    pub fn from_remote(value: V, cached_at: Timestamp) -> Self {
        Self {
            value,
            cached_at,
            was_cache_hit: false,
            backfill_error: None,
        }
    }

    /// A value fetched from the remote source at `cached_at` that could not
    /// be stored.
    pub fn from_remote_unbackfilled(value: V, cached_at: Timestamp, error: CacheError) -> Self {
        Self {
            value,
            cached_at,
            was_cache_hit: false,
            backfill_error: Some(error),
        }
    }

    /// Consume the read and return the underlying value.
    pub fn into_value(self) -> V {
        self.value
    }

    /// Get a reference to the underlying value.
    pub fn value(&self) -> &V {
        &self.value
    }

    /// When the value was cached, or fetched if this read was a miss.
    pub fn cached_at(&self) -> Timestamp {
        self.cached_at
    }

    /// Time elapsed since the value was cached or fetched.
    pub fn staleness(&self) -> Duration {
        Utc::now()
            .signed_duration_since(self.cached_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// True when the value was served from the cache.
    pub fn was_cache_hit(&self) -> bool {
        self.was_cache_hit
    }

    /// True when the value was fetched from the remote source.
    pub fn was_cache_miss(&self) -> bool {
        !self.was_cache_hit
    }

    /// The error from storing a freshly fetched value, if storing failed.
    pub fn backfill_error(&self) -> Option<&CacheError> {
        self.backfill_error.as_ref()
    }

    /// True when the value was fetched on a miss and written to the cache.
    pub fn is_backfilled(&self) -> bool {
        !self.was_cache_hit && self.backfill_error.is_none()
    }

    /// Map the inner value to a new type.
    pub fn map<U, F>(self, f: F) -> CacheRead<U>
    where
        F: FnOnce(V) -> U,
    {
        CacheRead {
            value: f(self.value),
            cached_at: self.cached_at,
            was_cache_hit: self.was_cache_hit,
            backfill_error: self.backfill_error,
        }
    }
}

impl<V> AsRef<V> for CacheRead<V> {
    fn as_ref(&self) -> &V {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freshness_default_is_any() {
        assert_eq!(Freshness::default(), Freshness::Any);
        assert_eq!(Freshness::default().max_staleness(), None);
    }

    #[test]
    fn test_freshness_any_accepts_everything() {
        let freshness = Freshness::any();
        assert!(freshness.accepts(Duration::ZERO));
        assert!(freshness.accepts(Duration::from_secs(u32::MAX as u64)));
    }

    #[test]
    fn test_freshness_max_age_boundary() {
        let freshness = Freshness::max_age(Duration::from_secs(60));
        assert!(freshness.accepts(Duration::from_secs(59)));
        assert!(freshness.accepts(Duration::from_secs(60)));
        assert!(!freshness.accepts(Duration::from_secs(61)));
        assert_eq!(freshness.max_staleness(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_freshness_from_max_staleness() {
        assert_eq!(Freshness::from_max_staleness(None), Freshness::Any);
        assert_eq!(
            Freshness::from_max_staleness(Some(Duration::from_millis(5))),
            Freshness::max_age(Duration::from_millis(5))
        );
    }

    #[test]
    fn test_cache_read_from_cache() {
        let cached_at = Utc::now();
        let read = CacheRead::from_cache("oleksii".to_string(), cached_at);

        assert!(read.was_cache_hit());
        assert!(!read.was_cache_miss());
        assert!(!read.is_backfilled());
        assert_eq!(read.value(), "oleksii");
        assert_eq!(read.cached_at(), cached_at);
    }

    #[test]
    fn test_cache_read_from_remote() {
        let read = CacheRead::from_remote(42i32, Utc::now());

        assert!(read.was_cache_miss());
        assert!(read.is_backfilled());
        assert!(read.backfill_error().is_none());
        assert_eq!(read.into_value(), 42);
    }

    #[test]
    fn test_cache_read_unbackfilled_keeps_value() {
        let fetched_at = Utc::now() - chrono::Duration::milliseconds(250);
        let read =
            CacheRead::from_remote_unbackfilled(7u8, fetched_at, CacheError::unavailable("down"));

        assert!(read.was_cache_miss());
        assert_eq!(read.cached_at(), fetched_at);
        assert!(!read.is_backfilled());
        assert_eq!(read.backfill_error(), Some(&CacheError::unavailable("down")));
        assert_eq!(*read.as_ref(), 7);
    }

    #[test]
    fn test_cache_read_staleness() {
        let past = Utc::now() - chrono::Duration::seconds(5);
        let read = CacheRead::from_cache("test", past);

        let staleness = read.staleness();
        assert!(staleness >= Duration::from_secs(4));
        assert!(staleness <= Duration::from_secs(10));
    }

    #[test]
    fn test_cache_read_map() {
        let read = CacheRead::from_remote_unbackfilled(42i32, Utc::now(), CacheError::LockPoisoned);
        let mapped = read.map(|v| v.to_string());

        assert_eq!(mapped.backfill_error(), Some(&CacheError::LockPoisoned));
        assert_eq!(mapped.into_value(), "42");
    }
}
