//! # PoolStats Infrastructure
//!
//! Infrastructure implementations of the core collector ports.
//!
//! This crate contains:
//! - Prometheus exposition sink and the `/metrics` HTTP route
//! - Snapshot source over `r2d2` connection pools
//! - The tokio sampling loop with start/stop lifecycle
//! - Configuration loading and tracing initialisation
//!
//! ## Architecture
//! - Implements traits defined in `poolstats-core`
//! - Depends on `poolstats-domain` and `poolstats-core`
//! - Contains all "impure" code (I/O, runtime, metrics transport)

pub mod config;
pub mod database;
pub mod errors;
pub mod exposition;
pub mod http;
pub mod observability;
pub mod sampling;

use std::sync::Arc;

use poolstats_core::{CollectorRegistry, ExpositionSink, PoolStatsCollector, SnapshotSource};
use poolstats_domain::{CollectorConfig, Result};

// Re-export commonly used items
pub use database::{PoolEventCounter, R2d2PoolSource};
pub use errors::InfraError;
pub use exposition::PrometheusExporter;
pub use http::metrics_router;
pub use observability::init_tracing;
pub use sampling::{LoopHandle, LoopState, LoopStatsSnapshot, SamplerError, SamplingLoop};

/// Process-wide collector registry.
///
/// Bound to `prometheus::default_registry()` unless another registry was
/// installed first with `CollectorRegistry::install_global`.
pub fn global_registry() -> &'static CollectorRegistry {
    CollectorRegistry::global_or_init(|| PrometheusExporter::global() as Arc<dyn ExpositionSink>)
}

/// Collector for `identity` with the default namespace and subsystem,
/// registered with the process-wide registry.
///
/// # Errors
/// Returns `PoolStatsError::InvalidConfiguration` for a blank identity, or
/// the registration error of the descriptor set.
pub fn new_pool_stats(
    identity: impl Into<String>,
    source: Arc<dyn SnapshotSource>,
) -> Result<Arc<PoolStatsCollector>> {
    global_registry().register_collector(&CollectorConfig::new(identity), source)
}

/// Like [`new_pool_stats`] with an explicit namespace and subsystem.
///
/// # Errors
/// See [`new_pool_stats`]; invalid names are `InvalidConfiguration`.
pub fn new_pool_stats_extended(
    identity: impl Into<String>,
    source: Arc<dyn SnapshotSource>,
    namespace: impl Into<String>,
    subsystem: impl Into<String>,
) -> Result<Arc<PoolStatsCollector>> {
    let config =
        CollectorConfig::new(identity).with_namespace(namespace).with_subsystem(subsystem);
    global_registry().register_collector(&config, source)
}
