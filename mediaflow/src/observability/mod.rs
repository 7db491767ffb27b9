//! Log subscriber setup for binaries embedding mediaflow.
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is left to the host.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::errors::ConfigError;

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Builds the filter: `RUST_LOG` when set, otherwise `default_directive`.
///
/// # Errors
///
/// Returns `ConfigError::Invalid` if the directive cannot be parsed.
pub fn env_filter(default_directive: &str) -> Result<EnvFilter, ConfigError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .map_err(|e| ConfigError::Invalid(format!("log filter '{default_directive}': {e}")))
}

/// Installs a global fmt subscriber.
///
/// # Errors
///
/// Returns `ConfigError::Invalid` for a bad directive or if a global
/// subscriber is already installed.
pub fn init_tracing(default_directive: &str, format: LogFormat) -> Result<(), ConfigError> {
    let filter = env_filter(default_directive)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let result = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| ConfigError::Invalid(format!("tracing subscriber: {e}")))
}
