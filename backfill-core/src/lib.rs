//! Backfill Core - Shared Types and Capabilities
//!
//! Data types, error taxonomy, capability traits, configuration and telemetry
//! setup shared by the lookup crate and the test utilities.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod traits;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use config::{BackfillConfig, LookupConfig, TelemetryConfig};
pub use error::{
    BackfillError, BackfillResult, CacheError, ConfigError, RemoteError, TelemetryError,
};
pub use telemetry::init_tracing;
pub use traits::{Cache, RemoteSource};

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// A value held by a cache, stamped with when it was stored.
///
/// Absence is modeled as `Option<CachedValue<V>>::None`; a `CachedValue`
/// always holds a present value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedValue<V> {
    pub value: V,
    pub cached_at: Timestamp,
}

impl<V> CachedValue<V> {
    /// Wrap `value` stamped with `cached_at`.
    pub fn new(value: V, cached_at: Timestamp) -> Self {
        Self { value, cached_at }
    }

    /// Stamp `value` with the current time.
    pub fn now(value: V) -> Self {
        Self::new(value, Utc::now())
    }

    /// Age of the entry relative to `now`. Entries stamped in the future
    /// report zero.
    pub fn age_at(&self, now: Timestamp) -> Duration {
        now.signed_duration_since(self.cached_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Age of the entry relative to the current time.
    pub fn age(&self) -> Duration {
        self.age_at(Utc::now())
    }

    /// Consume the entry and return the value.
    pub fn into_value(self) -> V {
        self.value
    }
}
