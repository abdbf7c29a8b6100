//! Sampling loop with explicit start/stop lifecycle.
//!
//! Every tick reads one snapshot through `PoolStatsCollector::try_collect`
//! on the blocking pool and publishes the resulting batch as a unit. A failed
//! tick is logged and counted; the loop keeps running. `LoopHandle::stop`
//! cancels the loop, waits for the in-flight tick, and closes the publish
//! gate so nothing is published once it returns.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use poolstats_core::CollectorRegistry;
//! use poolstats_domain::{CollectorConfig, PoolStatsSnapshot};
//! use poolstats_infra::exposition::PrometheusExporter;
//! use poolstats_infra::sampling::SamplingLoop;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = CollectorRegistry::new(Arc::new(PrometheusExporter::new()));
//! let collector = registry.register_collector(
//!     &CollectorConfig::new("orders"),
//!     Arc::new(|| -> poolstats_domain::Result<_> { Ok(PoolStatsSnapshot::zeroed()) }),
//! )?;
//!
//! let handle = SamplingLoop::spawn(collector, Duration::from_secs(10))?;
//! // ... application runs ...
//! handle.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use poolstats_core::{BatchPublisher, PoolStatsCollector};
use poolstats_domain::{PoolStatsError, Result, SampleBatch, SamplerConfig};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::sampling::error::{SamplerError, SamplerResult};
use crate::sampling::stats::{LoopState, LoopStats, LoopStatsSnapshot};

/// A sampling loop that has not been started yet.
pub struct SamplingLoop {
    collector: Arc<PoolStatsCollector>,
    publisher: Arc<dyn BatchPublisher>,
    config: SamplerConfig,
}

impl SamplingLoop {
    /// Create a loop for `collector`, publishing to the collector's group.
    ///
    /// # Errors
    /// Returns `SamplerError::InvalidConfiguration` for a zero interval or
    /// timeout.
    pub fn new(collector: Arc<PoolStatsCollector>, config: SamplerConfig) -> SamplerResult<Self> {
        config.validate().map_err(config_error)?;

        let publisher = collector.publisher();
        Ok(Self { collector, publisher, config })
    }

    /// Start a loop with default timeouts in one call.
    ///
    /// # Errors
    /// See [`SamplingLoop::new`] and [`SamplingLoop::start`].
    pub fn spawn(collector: Arc<PoolStatsCollector>, interval: Duration) -> SamplerResult<LoopHandle> {
        let config = SamplerConfig::with_interval(interval).map_err(config_error)?;
        Self::new(collector, config)?.start()
    }

    /// Publish batches somewhere other than the collector's own group.
    #[must_use]
    pub fn with_publisher(mut self, publisher: Arc<dyn BatchPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    pub const fn state(&self) -> LoopState {
        LoopState::Created
    }

    /// Spawn the background task on the current tokio runtime.
    ///
    /// The first tick fires one interval after start.
    ///
    /// # Errors
    /// Returns `SamplerError::NoRuntime` when called outside a runtime.
    pub fn start(self) -> SamplerResult<LoopHandle> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SamplerError::NoRuntime(e.to_string()))?;

        let identity = self.collector.identity().to_string();
        let shared = Arc::new(LoopShared {
            stats: LoopStats::default(),
            publish_open: Mutex::new(true),
        });
        let cancellation = CancellationToken::new();

        let task = runtime.spawn(run_loop(
            Arc::clone(&self.collector),
            Arc::clone(&self.publisher),
            Arc::clone(&shared),
            self.config.interval(),
            self.config.tick_timeout(),
            cancellation.clone(),
        ));

        info!(
            identity = %identity,
            interval_ms = self.config.interval_ms,
            "Sampling loop started"
        );

        Ok(LoopHandle {
            identity,
            publisher: self.publisher,
            shared,
            cancellation,
            state: Mutex::new(LoopState::Running),
            task: tokio::sync::Mutex::new(Some(task)),
            join_timeout: self.config.join_timeout(),
        })
    }
}

impl std::fmt::Debug for SamplingLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplingLoop")
            .field("identity", &self.collector.identity())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/* -------------------------------------------------------------------------- */
/* Handle */
/* -------------------------------------------------------------------------- */

struct LoopShared {
    stats: LoopStats,
    publish_open: Mutex<bool>,
}

impl LoopShared {
    /// Publish unless the gate was closed by `stop`.
    fn publish(&self, publisher: &dyn BatchPublisher, batch: SampleBatch) -> bool {
        let open = self.publish_open.lock();
        if *open {
            let sampled_at = batch.sampled_at;
            publisher.publish(batch);
            self.stats.record_published(sampled_at);
        }
        *open
    }

    fn close_gate(&self) {
        *self.publish_open.lock() = false;
    }
}

/// Handle to a running sampling loop.
///
/// `stop` takes `&self`, so the handle can be shared and stopped from
/// several tasks; every call after the first returns once the loop is
/// stopped.
pub struct LoopHandle {
    identity: String,
    publisher: Arc<dyn BatchPublisher>,
    shared: Arc<LoopShared>,
    cancellation: CancellationToken,
    state: Mutex<LoopState>,
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    join_timeout: Duration,
}

impl LoopHandle {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn state(&self) -> LoopState {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == LoopState::Running
    }

    pub fn stats(&self) -> LoopStatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Stop the loop and wait for the in-flight tick to finish.
    ///
    /// A snapshot read left running by a timed-out tick is awaited too, so
    /// no read is in flight once `stop` returns unless the join timeout
    /// elapsed first. No batch is published by this handle once `stop`
    /// returns, even when the task overruns the join timeout. Calling `stop`
    /// again is a no-op.
    ///
    /// # Errors
    /// Returns `SamplerError::JoinTimeout` or `SamplerError::TaskJoinFailed`
    /// when the task could not be joined cleanly; the loop is stopped either
    /// way.
    pub async fn stop(&self) -> SamplerResult<()> {
        let mut task = self.task.lock().await;
        let Some(mut handle) = task.take() else {
            debug!(identity = %self.identity, "Sampling loop already stopped");
            return Ok(());
        };

        *self.state.lock() = LoopState::Stopping;
        info!(identity = %self.identity, "Stopping sampling loop");
        self.cancellation.cancel();

        let outcome = match tokio::time::timeout(self.join_timeout, &mut handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                warn!(identity = %self.identity, error = %e, "Sampling task failed");
                Err(SamplerError::TaskJoinFailed(e.to_string()))
            }
            Err(_) => {
                warn!(identity = %self.identity, "Sampling task did not complete within timeout");
                handle.abort();
                Err(SamplerError::JoinTimeout { millis: duration_millis(self.join_timeout) })
            }
        };

        self.shared.close_gate();
        self.publisher.withdraw(&self.identity);
        *self.state.lock() = LoopState::Stopped;

        let stats = self.shared.stats.snapshot();
        info!(
            identity = %self.identity,
            ticks = stats.ticks,
            published = stats.published,
            failed_ticks = stats.failed_ticks,
            "Sampling loop stopped"
        );
        outcome
    }
}

impl Drop for LoopHandle {
    fn drop(&mut self) {
        if self.is_running() {
            warn!(identity = %self.identity, "LoopHandle dropped while running; cancelling loop");
            self.cancellation.cancel();
            self.shared.close_gate();
            self.publisher.withdraw(&self.identity);
        }
    }
}

impl std::fmt::Debug for LoopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopHandle")
            .field("identity", &self.identity)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/* -------------------------------------------------------------------------- */
/* Background task */
/* -------------------------------------------------------------------------- */

type SnapshotRead = JoinHandle<Result<SampleBatch>>;

async fn run_loop(
    collector: Arc<PoolStatsCollector>,
    publisher: Arc<dyn BatchPublisher>,
    shared: Arc<LoopShared>,
    interval: Duration,
    tick_timeout: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut in_flight: Option<SnapshotRead> = None;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(identity = %collector.identity(), "Sampling loop cancelled");
                break;
            }
            _ = ticker.tick() => {
                if cancel.is_cancelled() {
                    break;
                }
                in_flight =
                    run_tick(&collector, publisher.as_ref(), &shared, tick_timeout, in_flight).await;
            }
        }
    }

    if let Some(read) = in_flight {
        debug!(identity = %collector.identity(), "Waiting for in-flight snapshot read");
        if let Err(e) = read.await {
            warn!(identity = %collector.identity(), error = %e, "In-flight snapshot read failed");
        }
    }
}

/// Run one tick. Returns the snapshot read if it outlived `tick_timeout`.
///
/// At most one read per loop is running: while a timed-out read is still
/// in flight, later ticks are skipped and counted as failed.
async fn run_tick(
    collector: &Arc<PoolStatsCollector>,
    publisher: &dyn BatchPublisher,
    shared: &LoopShared,
    tick_timeout: Duration,
    in_flight: Option<SnapshotRead>,
) -> Option<SnapshotRead> {
    shared.stats.record_tick();

    if let Some(read) = in_flight {
        if !read.is_finished() {
            warn!(identity = %collector.identity(), "Previous snapshot read still running, skipping tick");
            shared.stats.record_failure(SamplerError::ReadInFlight.to_string());
            return Some(read);
        }
        debug!(identity = %collector.identity(), "Discarding result of timed-out snapshot read");
    }

    let sampler = Arc::clone(collector);
    let mut read = tokio::task::spawn_blocking(move || sampler.try_collect());

    let failure = match tokio::time::timeout(tick_timeout, &mut read).await {
        Ok(Ok(Ok(batch))) => {
            if !shared.publish(publisher, batch) {
                debug!(identity = %collector.identity(), "Publish gate closed; batch dropped");
            }
            return None;
        }
        Ok(Ok(Err(e))) => {
            error!(identity = %collector.identity(), error = %e, "Sampling tick failed");
            SamplerError::Snapshot(e)
        }
        Ok(Err(e)) => {
            error!(identity = %collector.identity(), error = %e, "Sampling tick task failed");
            SamplerError::TaskJoinFailed(e.to_string())
        }
        Err(_) => {
            warn!(
                identity = %collector.identity(),
                timeout_ms = duration_millis(tick_timeout),
                "Sampling tick timed out"
            );
            let failure = SamplerError::TickTimeout { millis: duration_millis(tick_timeout) };
            shared.stats.record_failure(failure.to_string());
            return Some(read);
        }
    };
    shared.stats.record_failure(failure.to_string());
    None
}

fn config_error(err: PoolStatsError) -> SamplerError {
    match err {
        PoolStatsError::InvalidConfiguration(message) => SamplerError::InvalidConfiguration(message),
        other => SamplerError::InvalidConfiguration(other.to_string()),
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use poolstats_core::testing::{fixture_snapshot, RecordingPublisher, RecordingSink, StaticSource};
    use poolstats_core::CollectorRegistry;
    use poolstats_domain::{CollectorConfig, PoolStatsSnapshot, Statistic};

    use super::*;

    fn collector_over(source: Arc<StaticSource>) -> Arc<PoolStatsCollector> {
        let registry = CollectorRegistry::new(Arc::new(RecordingSink::default()));
        registry.register_collector(&CollectorConfig::new("orders"), source).unwrap()
    }

    fn collector() -> Arc<PoolStatsCollector> {
        collector_over(Arc::new(StaticSource::new(fixture_snapshot())))
    }

    fn every(millis: u64) -> SamplerConfig {
        SamplerConfig::with_interval(Duration::from_millis(millis)).unwrap()
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = SamplerConfig { interval_ms: 0, ..SamplerConfig::default() };
        let err = SamplingLoop::new(collector(), config).unwrap_err();
        assert!(matches!(err, SamplerError::InvalidConfiguration(_)));
    }

    #[test]
    fn sub_millisecond_interval_is_rejected_with_its_value() {
        let err = SamplingLoop::spawn(collector(), Duration::from_micros(500)).unwrap_err();

        let SamplerError::InvalidConfiguration(message) = err else {
            panic!("expected InvalidConfiguration, got {err:?}");
        };
        assert!(message.contains("at least 1ms"), "{message}");
        assert!(message.contains("500"), "{message}");
    }

    #[test]
    fn start_outside_runtime_fails() {
        let sampling_loop = SamplingLoop::new(collector(), every(10)).unwrap();
        assert_eq!(sampling_loop.state(), LoopState::Created);
        assert!(matches!(sampling_loop.start(), Err(SamplerError::NoRuntime(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_transitions_to_stopped_and_is_idempotent() {
        let publisher = Arc::new(RecordingPublisher::new());
        let handle = SamplingLoop::new(collector(), every(20))
            .unwrap()
            .with_publisher(publisher.clone())
            .start()
            .unwrap();
        assert_eq!(handle.state(), LoopState::Running);

        handle.stop().await.unwrap();
        assert_eq!(handle.state(), LoopState::Stopped);
        handle.stop().await.unwrap();
        assert_eq!(handle.state(), LoopState::Stopped);
        assert_eq!(publisher.withdrawn(), vec!["orders".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn ticks_publish_to_collector_group_by_default() {
        let collector = collector();
        let handle = SamplingLoop::spawn(Arc::clone(&collector), Duration::from_millis(20)).unwrap();

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(handle.stats().published >= 1);
        assert_eq!(collector.group().scrape().len(), 1);

        handle.stop().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn dropping_running_handle_cancels_loop() {
        let publisher = Arc::new(RecordingPublisher::new());
        let handle = SamplingLoop::new(collector(), every(20))
            .unwrap()
            .with_publisher(publisher.clone())
            .start()
            .unwrap();
        drop(handle);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(publisher.count(), 0);
        assert_eq!(publisher.withdrawn(), vec!["orders".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn scrape_after_dropping_handle_reads_live_source() {
        let source = Arc::new(StaticSource::new(fixture_snapshot()));
        let collector = collector_over(Arc::clone(&source));
        let handle = SamplingLoop::spawn(Arc::clone(&collector), Duration::from_millis(20)).unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while handle.stats().published == 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(handle.stats().published >= 1);

        drop(handle);
        source.set(PoolStatsSnapshot { max_open_connections: 99, ..fixture_snapshot() });
        tokio::time::sleep(Duration::from_millis(100)).await;

        let batches = collector.group().scrape();
        assert_eq!(batches.len(), 1);
        let max_open = batches[0].get(Statistic::MaxOpen).unwrap().value;
        assert!((max_open - 99.0).abs() < f64::EPSILON, "scrape served {max_open}");
    }
}
