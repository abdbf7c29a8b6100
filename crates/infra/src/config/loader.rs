//! Configuration loader
//!
//! Loads exporter configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Loads a `.env` file into the process environment, if one exists
//! 2. Attempts to load from environment variables
//! 3. If the identity is missing, falls back to loading from file
//! 4. Probes multiple paths for config files
//! 5. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `POOLSTATS_IDENTITY`: Identity label value (required)
//! - `POOLSTATS_NAMESPACE`: Metric namespace
//! - `POOLSTATS_SUBSYSTEM`: Metric subsystem
//! - `POOLSTATS_LABEL_NAME`: Identity label name
//! - `POOLSTATS_SAMPLE_INTERVAL_MS`: Sampling interval in milliseconds
//! - `POOLSTATS_SAMPLER_ENABLED`: Whether the sampling loop runs (true/false)
//! - `POOLSTATS_LOG_LEVEL`: Default log filter when `RUST_LOG` is unset
//! - `POOLSTATS_LOG_FORMAT`: `pretty` or `json`
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./poolstats.toml` or `./poolstats.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. The same names in the parent and grandparent directories
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use poolstats_domain::{
    CollectorConfig, Config, LogFormat, LoggingConfig, PoolStatsError, Result, SamplerConfig,
};

const CONFIG_FILE_NAMES: [&str; 4] =
    ["poolstats.toml", "poolstats.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the identity is
/// missing, falls back to loading from a config file. Invalid values in the
/// environment are returned as errors rather than falling back.
///
/// # Errors
/// Returns `PoolStatsError::InvalidConfiguration` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - A value fails validation
pub fn load() -> Result<Config> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) if std::env::var("POOLSTATS_IDENTITY").is_err() => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
        Err(e) => Err(e),
    }
}

/// Load configuration from environment variables
///
/// Only `POOLSTATS_IDENTITY` is required; every other variable falls back
/// to its default when unset.
///
/// # Environment Variables
/// See module documentation for the complete list.
///
/// # Errors
/// Returns `PoolStatsError::InvalidConfiguration` if the identity is missing
/// or a variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let identity = env_var("POOLSTATS_IDENTITY")?;

    let mut collector = CollectorConfig::new(identity);
    if let Some(namespace) = env_opt("POOLSTATS_NAMESPACE") {
        collector = collector.with_namespace(namespace);
    }
    if let Some(subsystem) = env_opt("POOLSTATS_SUBSYSTEM") {
        collector = collector.with_subsystem(subsystem);
    }
    if let Some(label_name) = env_opt("POOLSTATS_LABEL_NAME") {
        collector = collector.with_label_name(label_name);
    }

    let mut sampler = SamplerConfig::default();
    if let Some(interval) = env_opt("POOLSTATS_SAMPLE_INTERVAL_MS") {
        sampler.interval_ms = interval.parse::<u64>().map_err(|e| {
            PoolStatsError::InvalidConfiguration(format!("Invalid sample interval: {e}"))
        })?;
    }
    sampler.enabled = env_bool("POOLSTATS_SAMPLER_ENABLED", sampler.enabled)?;

    let mut logging = LoggingConfig::default();
    if let Some(level) = env_opt("POOLSTATS_LOG_LEVEL") {
        logging.level = level;
    }
    if let Some(format) = env_opt("POOLSTATS_LOG_FORMAT") {
        logging.format = LogFormat::from_str(&format).map_err(PoolStatsError::InvalidConfiguration)?;
    }

    let config = Config { collector, sampler, logging };
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Arguments
/// * `path` - Optional path to config file. If `None`, uses
///   [`probe_config_paths`].
///
/// # Errors
/// Returns `PoolStatsError::InvalidConfiguration` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - A value fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(PoolStatsError::InvalidConfiguration(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            PoolStatsError::InvalidConfiguration(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path).map_err(|e| {
        PoolStatsError::InvalidConfiguration(format!("Failed to read config file: {e}"))
    })?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| PoolStatsError::InvalidConfiguration(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| PoolStatsError::InvalidConfiguration(format!("Invalid JSON format: {e}"))),
        _ => Err(PoolStatsError::InvalidConfiguration(format!(
            "Unsupported config format: {extension}"
        ))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the working directory, its parent and grandparent, then the
/// executable's directory and its parent, for each name in
/// `poolstats.{toml,json}`, `config.{toml,json}`.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.extend([exe_dir.to_path_buf(), exe_dir.join("..")]);
        }
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `PoolStatsError::InvalidConfiguration` if the variable is not set
/// or blank.
fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| {
        PoolStatsError::InvalidConfiguration(format!(
            "Missing required environment variable: {key}"
        ))
    })
}

/// Optional environment variable; blank values count as unset.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
///
/// # Errors
/// Returns `PoolStatsError::InvalidConfiguration` for any other value.
fn env_bool(key: &str, default: bool) -> Result<bool> {
    let Some(value) = env_opt(key) else {
        return Ok(default);
    };

    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(PoolStatsError::InvalidConfiguration(format!(
            "Invalid boolean for {key}: {other}"
        ))),
    }
}
