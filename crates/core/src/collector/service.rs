//! Metric collector
//!
//! Maps one pool snapshot to one `SampleBatch`. Collectors are built by
//! `CollectorRegistry::register_collector`, which also owns registration of
//! the descriptor set with the exposition sink.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use poolstats_domain::{
    DescriptorSet, LabeledSample, MetricDescriptor, PoolStatsSnapshot, Result, SampleBatch,
};
use tracing::warn;

use crate::collector::ports::{BatchPublisher, SnapshotSource};
use crate::collector::registry::DescriptorGroup;

/// Converts snapshots of one pool into labeled samples.
///
/// Holds no mutable state: `collect` can run from any number of threads at
/// once, including alongside a sampling loop driving the same instance.
pub struct PoolStatsCollector {
    identity: String,
    source: Arc<dyn SnapshotSource>,
    group: Arc<DescriptorGroup>,
}

impl PoolStatsCollector {
    pub(crate) fn new(
        identity: String,
        source: Arc<dyn SnapshotSource>,
        group: Arc<DescriptorGroup>,
    ) -> Self {
        Self { identity, source, group }
    }

    /// Label value carried by every sample of this collector.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// All seven descriptors, in emission order.
    pub fn describe(&self) -> &[Arc<MetricDescriptor>] {
        self.group.descriptors().descriptors()
    }

    pub fn descriptor_set(&self) -> &DescriptorSet {
        self.group.descriptors()
    }

    /// Group this collector is served through.
    pub fn group(&self) -> &Arc<DescriptorGroup> {
        &self.group
    }

    /// Sample the source and build a batch, surfacing source failures.
    ///
    /// # Errors
    /// Returns whatever the snapshot source returned, typically
    /// `PoolStatsError::SnapshotUnavailable`.
    pub fn try_collect(&self) -> Result<SampleBatch> {
        let snapshot = self.source.sample()?;
        Ok(self.to_batch(&snapshot, false))
    }

    /// Sample the source and build a batch.
    ///
    /// Never fails: when the source cannot be read the batch is built from a
    /// zeroed snapshot and flagged `stale`.
    pub fn collect(&self) -> SampleBatch {
        match self.try_collect() {
            Ok(batch) => batch,
            Err(error) => {
                warn!(
                    identity = %self.identity,
                    error = %error,
                    "snapshot source failed, emitting zeroed batch"
                );
                self.to_batch(&PoolStatsSnapshot::zeroed(), true)
            }
        }
    }

    /// Map a snapshot to exactly one sample per descriptor.
    #[allow(clippy::cast_precision_loss)]
    pub fn to_batch(&self, snapshot: &PoolStatsSnapshot, stale: bool) -> SampleBatch {
        let samples = self
            .describe()
            .iter()
            .map(|descriptor| LabeledSample {
                descriptor: Arc::clone(descriptor),
                label_values: vec![self.identity.clone()],
                value: snapshot.value_of(descriptor.statistic) as f64,
                kind: descriptor.kind,
            })
            .collect();

        SampleBatch { identity: self.identity.clone(), samples, stale, sampled_at: Utc::now() }
    }

    /// Hand a batch to this collector's group, replacing its cached batch.
    pub fn publish(&self, batch: SampleBatch) {
        self.group.publish(batch);
    }

    /// Publisher a sampling loop should forward batches to by default.
    pub fn publisher(&self) -> Arc<dyn BatchPublisher> {
        Arc::clone(&self.group) as Arc<dyn BatchPublisher>
    }
}

impl fmt::Debug for PoolStatsCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolStatsCollector")
            .field("identity", &self.identity)
            .field("descriptor_set", self.group.descriptors().key())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use poolstats_domain::{CollectorConfig, PoolStatsError, Statistic, ValueKind};

    use super::*;
    use crate::collector::registry::CollectorRegistry;
    use crate::testing::{fixture_snapshot, RecordingSink, ScriptedSource, StaticSource};

    fn collector_with(source: Arc<dyn SnapshotSource>) -> Arc<PoolStatsCollector> {
        let registry = CollectorRegistry::new(Arc::new(RecordingSink::default()));
        registry.register_collector(&CollectorConfig::new("orders"), source).unwrap()
    }

    #[test]
    fn test_collect_emits_seven_samples_with_kinds() {
        let collector = collector_with(Arc::new(StaticSource::new(fixture_snapshot())));
        let batch = collector.collect();

        assert_eq!(batch.len(), 7);
        assert!(!batch.stale);
        assert_eq!(batch.identity, "orders");
        for (sample, statistic) in batch.samples.iter().zip(Statistic::ALL) {
            assert_eq!(sample.statistic(), statistic);
            assert_eq!(sample.kind, statistic.kind());
            assert_eq!(sample.label_values, vec!["orders".to_string()]);
        }
    }

    #[test]
    fn test_idle_gauge_and_waited_for_counter() {
        let snapshot = PoolStatsSnapshot {
            max_open_connections: 10,
            open_connections: 3,
            in_use: 0,
            idle: 3,
            ..PoolStatsSnapshot::zeroed()
        };
        let collector = collector_with(Arc::new(StaticSource::new(snapshot)));
        let batch = collector.collect();

        let idle = batch.by_name("database_sql_stats_rust_idle").unwrap();
        assert!((idle.value - 3.0).abs() < f64::EPSILON);
        assert_eq!(idle.kind, ValueKind::Gauge);

        let waited = batch.by_name("database_sql_stats_rust_waited_for").unwrap();
        assert!(waited.value.abs() < f64::EPSILON);
        assert_eq!(waited.kind, ValueKind::Counter);
    }

    #[test]
    fn test_emitted_idle_equals_open_minus_in_use() {
        let snapshots = [
            fixture_snapshot(),
            PoolStatsSnapshot { open_connections: 8, in_use: 8, idle: 0, ..fixture_snapshot() },
            PoolStatsSnapshot { open_connections: 5, in_use: 0, idle: 5, ..fixture_snapshot() },
            PoolStatsSnapshot::zeroed(),
        ];
        let source = StaticSource::new(fixture_snapshot());
        let collector = collector_with(Arc::new(source.clone()));

        for snapshot in snapshots {
            assert!(snapshot.is_consistent());
            source.set(snapshot);
            let batch = collector.collect();

            let value = |statistic| batch.get(statistic).unwrap().value;
            assert!(
                (value(Statistic::Idle)
                    - (value(Statistic::OpenConnections) - value(Statistic::InUse)))
                .abs()
                    < f64::EPSILON,
                "inconsistent batch for {snapshot:?}"
            );
        }
    }

    #[test]
    fn test_source_failure_yields_zeroed_stale_batch() {
        let source = ScriptedSource::new(vec![Err(PoolStatsError::SnapshotUnavailable(
            "pool closed".into(),
        ))]);
        let collector = collector_with(Arc::new(source));

        let batch = collector.collect();
        assert!(batch.stale);
        assert_eq!(batch.len(), 7);
        assert!(batch.samples.iter().all(|s| s.value == 0.0));
    }

    #[test]
    fn test_try_collect_surfaces_failure() {
        let source = ScriptedSource::new(vec![Err(PoolStatsError::SnapshotUnavailable(
            "pool closed".into(),
        ))]);
        let collector = collector_with(Arc::new(source));

        assert!(matches!(collector.try_collect(), Err(PoolStatsError::SnapshotUnavailable(_))));
    }

    #[test]
    fn test_closure_source() {
        let collector = collector_with(Arc::new(|| -> Result<PoolStatsSnapshot> {
            Ok(PoolStatsSnapshot { open_connections: 4, in_use: 4, ..PoolStatsSnapshot::zeroed() })
        }));

        let batch = collector.collect();
        assert!((batch.get(Statistic::InUse).unwrap().value - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_concurrent_collect_batches_are_consistent() {
        let collector = collector_with(Arc::new(StaticSource::new(fixture_snapshot())));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let collector = Arc::clone(&collector);
                thread::spawn(move || collector.collect())
            })
            .collect();

        let expected: Vec<f64> = Statistic::ALL
            .iter()
            .map(|s| fixture_snapshot().value_of(*s) as f64)
            .collect();
        for handle in handles {
            let batch = handle.join().unwrap();
            let values: Vec<f64> = batch.samples.iter().map(|s| s.value).collect();
            assert_eq!(values, expected);
            assert!(!batch.stale);
        }
    }

    #[test]
    fn test_describe_matches_batch_order() {
        let collector = collector_with(Arc::new(StaticSource::new(fixture_snapshot())));
        let names: Vec<String> = collector.describe().iter().map(|d| d.fq_name.clone()).collect();
        let batch_names: Vec<String> =
            collector.collect().samples.iter().map(|s| s.name().to_string()).collect();

        assert_eq!(names, batch_names);
    }
}
