//! Configuration loading for backfill lookups.
//!
//! Configuration is passed explicitly into each lookup; nothing here is
//! process-wide. A config file looks like:
//!
//! ```toml
//! [lookup]
//! name = "username"
//! max_staleness_ms = 60000   # optional, omit to accept any cached value
//!
//! [telemetry]
//! filter = "backfill_cache=debug,info"
//! json = false
//! ```

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Default lookup name used in logs when none is configured.
pub const DEFAULT_LOOKUP_NAME: &str = "lookup";

/// Default `EnvFilter` directive when neither the environment nor the config
/// provides one.
pub const DEFAULT_LOG_FILTER: &str = "backfill_cache=info,warn";

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackfillConfig {
    pub lookup: LookupConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Configuration for a single read-through lookup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LookupConfig {
    /// Name used in log fields to tell lookups apart.
    pub name: String,
    /// Upper bound on the age of a cached value before it is refetched.
    /// `None` accepts any cached value.
    #[serde(default, rename = "max_staleness_ms", with = "duration_ms")]
    pub max_staleness: Option<Duration>,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_LOOKUP_NAME.to_string(),
            max_staleness: None,
        }
    }
}

impl LookupConfig {
    /// Create a new lookup config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the lookup name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Bound the age of cached values.
    pub fn with_max_staleness(mut self, duration: Duration) -> Self {
        self.max_staleness = Some(duration);
        self
    }

    /// Reject an empty name or a zero staleness bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "lookup.name",
                reason: "must not be empty".to_string(),
            });
        }
        if self.max_staleness == Some(Duration::ZERO) {
            return Err(ConfigError::InvalidValue {
                field: "lookup.max_staleness_ms",
                reason: "must be greater than zero (omit it to accept any cached value)"
                    .to_string(),
            });
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive, used when `RUST_LOG` is not set.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            json: false,
        }
    }
}

impl TelemetryConfig {
    /// Reject an empty filter directive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.filter.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "telemetry.filter",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

impl BackfillConfig {
    /// Read, parse and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::from_path(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a config file without validating it.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse config from a TOML string without validating it.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: BackfillConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.lookup.validate()?;
        self.telemetry.validate()?;
        Ok(())
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
