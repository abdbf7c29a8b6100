//! Shared helpers for infra integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use poolstats_core::testing::RecordingSink;
use poolstats_core::{CollectorRegistry, PoolStatsCollector, SnapshotSource};
use poolstats_domain::{CollectorConfig, SamplerConfig};

/// Collector named `identity` in a fresh registry over a recording sink.
pub fn collector_with(identity: &str, source: Arc<dyn SnapshotSource>) -> Arc<PoolStatsCollector> {
    let registry = CollectorRegistry::new(Arc::new(RecordingSink::default()));
    registry
        .register_collector(&CollectorConfig::new(identity), source)
        .expect("collector should register")
}

/// Sampler settings with short timeouts suitable for tests.
pub fn sampler(interval_ms: u64) -> SamplerConfig {
    SamplerConfig {
        enabled: true,
        interval_ms,
        tick_timeout_ms: 1_000,
        join_timeout_ms: 2_000,
    }
}

/// Poll `condition` every 5ms until it holds or `timeout` elapses.
pub async fn wait_for<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
