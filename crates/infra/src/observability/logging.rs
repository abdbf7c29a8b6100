//! Logging initialization.

use poolstats_domain::{LogFormat, LoggingConfig, PoolStatsError, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber described by `config`.
///
/// `RUST_LOG` takes precedence over `config.level`. Returns `Ok(false)` when
/// a subscriber was already installed, so repeated calls are harmless.
///
/// # Errors
/// Returns `PoolStatsError::InvalidConfiguration` if `config.level` is not a
/// valid filter directive.
pub fn init_tracing(config: &LoggingConfig) -> Result<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| {
            PoolStatsError::InvalidConfiguration(format!(
                "Invalid log level '{}': {e}",
                config.level
            ))
        })?,
    };

    let installed = match config.format {
        LogFormat::Json => fmt().json().with_env_filter(filter).try_init().is_ok(),
        LogFormat::Pretty => fmt().with_env_filter(filter).try_init().is_ok(),
    };

    if installed {
        tracing::debug!(level = %config.level, format = %config.format, "Tracing initialized");
    }
    Ok(installed)
}
