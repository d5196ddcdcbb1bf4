//! Backfill Cache - Read-Through Lookup
//!
//! A lookup that prefers a cheap local cache and falls back to an expensive
//! remote source, writing the fetched value back into the cache on a miss.
//!
//! # Contract
//!
//! - A cache hit returns immediately; the remote source is not called.
//! - A miss fetches from the remote source, stores the value, then returns it.
//! - A remote failure is returned to the caller unchanged and the cache is
//!   not written.
//! - A failing cache read counts as a miss. A failing cache write after a
//!   successful fetch does not lose the value: it is returned together with
//!   the backfill error ([`CacheRead::backfill_error`]).
//!
//! # Example
//!
//! ```ignore
//! let lookup = CacheBackedLookup::new(
//!     Arc::new(user_api),
//!     Arc::new(InMemoryCache::new()),
//!     LookupConfig::new().with_name("username"),
//! );
//!
//! let read = lookup.read(&user_id).await?;
//! if read.was_cache_miss() {
//!     tracing::debug!("fetched from the backend");
//! }
//! ```

pub mod freshness;
pub mod lookup;
pub mod memory;
pub mod stats;

pub use freshness::{CacheRead, Freshness};
pub use lookup::CacheBackedLookup;
pub use memory::InMemoryCache;
pub use stats::{LookupStats, LookupStatsSnapshot};

// Re-export the capability surface so callers need a single dependency.
pub use backfill_core::{
    Cache, CacheError, CachedValue, LookupConfig, RemoteError, RemoteSource, Timestamp,
};
