//! Error types for backfill operations

use thiserror::Error;

/// Remote source errors.
///
/// A remote failure is returned to the caller of a lookup as-is. The lookup
/// never retries and never writes to the cache when the fetch fails.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Remote source {source_name} unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },
}

impl RemoteError {
    /// Build an `Unavailable` error for the named source.
    pub fn unavailable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if the remote could not be reached.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Cache backend errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Cache lock poisoned")]
    LockPoisoned,
}

impl CacheError {
    /// Build an `Unavailable` error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Telemetry setup errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("Invalid log filter {filter:?}: {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("Failed to init subscriber: {reason}")]
    Init { reason: String },
}

/// Master error type for all backfill errors.
#[derive(Debug, Error)]
pub enum BackfillError {
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
}

/// Result type alias for backfill operations.
pub type BackfillResult<T> = Result<T, BackfillError>;

// =============================================================================
// TESTS
// =============================================================================
