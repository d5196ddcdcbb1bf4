//! Tracing subscriber initialization.
//!
//! Lookups emit `tracing` events with structured fields. Binaries and test
//! harnesses call [`init_tracing`] once to route them somewhere.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::TelemetryConfig;
use crate::error::{BackfillResult, TelemetryError};

/// Build the event filter: `RUST_LOG` wins, the configured directive is the
/// fallback.
pub fn build_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    let env_directive = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    filter_from(env_directive.as_deref(), config)
}

/// Pick the filter from an environment directive, falling back to the
/// configured one when the directive is absent or does not parse.
fn filter_from(
    env_directive: Option<&str>,
    config: &TelemetryConfig,
) -> Result<EnvFilter, TelemetryError> {
    if let Some(filter) = env_directive.and_then(|d| EnvFilter::try_new(d).ok()) {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.filter).map_err(|e| TelemetryError::InvalidFilter {
        filter: config.filter.clone(),
        reason: e.to_string(),
    })
}

/// Install the global tracing subscriber.
///
/// Fails if the filter is invalid or a global subscriber is already set.
pub fn init_tracing(config: &TelemetryConfig) -> BackfillResult<()> {
    let env_filter = build_filter(config)?;

    let json_layer = config.json.then(|| tracing_subscriber::fmt::layer().json());
    let text_layer = (!config.json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| TelemetryError::Init {
            reason: e.to_string(),
        })?;

    tracing::info!(
        filter = %config.filter,
        json = config.json,
        "Telemetry initialized"
    );

    Ok(())
}
