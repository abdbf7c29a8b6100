//! Configuration structures
//!
//! Loaded by `poolstats-infra::config` from environment variables or a
//! TOML/JSON file. Every section except `collector.identity` has defaults;
//! `validate` rejects values that would otherwise be silently wrong.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_JOIN_TIMEOUT_MS, DEFAULT_LABEL_NAME, DEFAULT_LOG_LEVEL, DEFAULT_NAMESPACE,
    DEFAULT_SAMPLE_INTERVAL_MS, DEFAULT_SUBSYSTEM, DEFAULT_TICK_TIMEOUT_MS,
};
use crate::errors::{PoolStatsError, Result};
use crate::impl_domain_enum_conversions;
use crate::types::metrics::DescriptorSetKey;
use crate::utils::naming::{validate_label_name, validate_metric_part};

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub collector: CollectorConfig,
    #[serde(default)]
    pub sampler: SamplerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validate every section.
    ///
    /// # Errors
    /// Returns the first `PoolStatsError::InvalidConfiguration` found.
    pub fn validate(&self) -> Result<()> {
        self.collector.validate()?;
        self.sampler.validate()?;
        Ok(())
    }
}

/* -------------------------------------------------------------------------- */
/* Collector */
/* -------------------------------------------------------------------------- */

/// Construction parameters of a metric collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Label value distinguishing this pool (e.g. the database name).
    pub identity: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_subsystem")]
    pub subsystem: String,
    #[serde(default = "default_label_name")]
    pub label_name: String,
}

impl CollectorConfig {
    /// Collector config with default naming for the given identity.
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            namespace: default_namespace(),
            subsystem: default_subsystem(),
            label_name: default_label_name(),
        }
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    #[must_use]
    pub fn with_subsystem(mut self, subsystem: impl Into<String>) -> Self {
        self.subsystem = subsystem.into();
        self
    }

    #[must_use]
    pub fn with_label_name(mut self, label_name: impl Into<String>) -> Self {
        self.label_name = label_name.into();
        self
    }

    /// Key of the descriptor set this collector belongs to.
    pub fn descriptor_key(&self) -> DescriptorSetKey {
        DescriptorSetKey::new(&self.namespace, &self.subsystem, &self.label_name)
    }

    /// # Errors
    /// Returns `PoolStatsError::InvalidConfiguration` for a blank identity or
    /// an invalid metric/label name.
    pub fn validate(&self) -> Result<()> {
        if self.identity.trim().is_empty() {
            return Err(PoolStatsError::InvalidConfiguration(
                "collector identity label value is required".into(),
            ));
        }
        validate_metric_part("namespace", &self.namespace)?;
        validate_metric_part("subsystem", &self.subsystem)?;
        validate_label_name(&self.label_name)
    }
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_subsystem() -> String {
    DEFAULT_SUBSYSTEM.to_string()
}

fn default_label_name() -> String {
    DEFAULT_LABEL_NAME.to_string()
}

/* -------------------------------------------------------------------------- */
/* Sampler */
/* -------------------------------------------------------------------------- */

/// Periodic sampling loop settings.
///
/// The loop is optional: with `enabled = false` every scrape collects live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    pub enabled: bool,
    pub interval_ms: u64,
    /// Upper bound on a single tick's snapshot read.
    pub tick_timeout_ms: u64,
    /// Upper bound on waiting for the task during `stop`.
    pub join_timeout_ms: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            tick_timeout_ms: DEFAULT_TICK_TIMEOUT_MS,
            join_timeout_ms: DEFAULT_JOIN_TIMEOUT_MS,
        }
    }
}

impl SamplerConfig {
    /// Sampler settings with the given interval and default timeouts.
    ///
    /// Intervals are kept in whole milliseconds; a fractional part above
    /// 1ms is dropped.
    ///
    /// # Errors
    /// Returns `PoolStatsError::InvalidConfiguration` for an interval below
    /// 1ms, including zero.
    pub fn with_interval(interval: Duration) -> Result<Self> {
        if interval < Duration::from_millis(1) {
            return Err(PoolStatsError::InvalidConfiguration(format!(
                "sampling interval must be at least 1ms, got {interval:?}"
            )));
        }
        Ok(Self {
            enabled: true,
            interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            ..Self::default()
        })
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn tick_timeout(&self) -> Duration {
        Duration::from_millis(self.tick_timeout_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    /// # Errors
    /// Returns `PoolStatsError::InvalidConfiguration` when the interval or a
    /// timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(PoolStatsError::InvalidConfiguration(
                "sampling interval must be at least 1ms".into(),
            ));
        }
        if self.tick_timeout_ms == 0 || self.join_timeout_ms == 0 {
            return Err(PoolStatsError::InvalidConfiguration(
                "sampler timeouts must be positive".into(),
            ));
        }
        Ok(())
    }
}

/* -------------------------------------------------------------------------- */
/* Logging */
/* -------------------------------------------------------------------------- */

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl_domain_enum_conversions!(LogFormat {
    Pretty => "pretty",
    Json => "json",
});

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: DEFAULT_LOG_LEVEL.into(), format: LogFormat::Pretty }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_config_defaults() {
        let config = CollectorConfig::new("orders");
        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
        assert_eq!(config.subsystem, DEFAULT_SUBSYSTEM);
        assert_eq!(config.label_name, DEFAULT_LABEL_NAME);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_identity_rejected() {
        let err = CollectorConfig::new("   ").validate().unwrap_err();
        assert!(matches!(err, PoolStatsError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_sampler_zero_interval_rejected() {
        let config = SamplerConfig { interval_ms: 0, ..SamplerConfig::default() };
        assert!(matches!(config.validate(), Err(PoolStatsError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_sampler_with_interval() {
        let config = SamplerConfig::with_interval(Duration::from_millis(50)).unwrap();
        assert!(config.enabled);
        assert_eq!(config.interval(), Duration::from_millis(50));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sampler_interval_millisecond_boundary() {
        let config = SamplerConfig::with_interval(Duration::from_millis(1)).unwrap();
        assert_eq!(config.interval_ms, 1);

        let err = SamplerConfig::with_interval(Duration::from_micros(999)).unwrap_err();
        assert!(matches!(err, PoolStatsError::InvalidConfiguration(_)));
        assert!(err.to_string().contains("at least 1ms"));

        assert!(SamplerConfig::with_interval(Duration::ZERO).is_err());
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: Config = serde_json::from_str(r#"{"collector": {"identity": "orders"}}"#).unwrap();

        assert_eq!(config.collector.identity, "orders");
        assert_eq!(config.collector.namespace, DEFAULT_NAMESPACE);
        assert!(!config.sampler.enabled);
        assert_eq!(config.sampler.interval_ms, DEFAULT_SAMPLE_INTERVAL_MS);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_descriptor_key_from_config() {
        let key = CollectorConfig::new("orders").with_namespace("app").with_subsystem("pg").descriptor_key();
        assert_eq!(key, DescriptorSetKey::new("app", "pg", DEFAULT_LABEL_NAME));
    }
}
