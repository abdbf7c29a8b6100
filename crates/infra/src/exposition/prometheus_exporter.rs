//! Prometheus sink for descriptor groups
//!
//! Each registered `DescriptorGroup` becomes one `prometheus::core::Collector`
//! declaring the group's seven descriptors. Families are rebuilt from
//! `DescriptorGroup::scrape` on every gather, so a scrape always sees whole
//! batches and never a mix of two ticks.
//!
//! Next to the seven statistics every group exports a `{namespace}_{subsystem}_stale`
//! gauge per identity: 1 while the pool could not be read and its values are
//! zeroed, 0 otherwise.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use poolstats_core::{DescriptorGroup, ExpositionSink};
use poolstats_domain::{
    build_fq_name, DescriptorSetKey, LabeledSample, MetricDescriptor, PoolStatsError, Result, SampleBatch,
    ValueKind,
};
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{CounterVec, GaugeVec, Opts, Registry, TextEncoder};
use tracing::{debug, warn};

use crate::errors::InfraError;

static GLOBAL_EXPORTER: OnceLock<Arc<PrometheusExporter>> = OnceLock::new();

const STALE_METRIC: &str = "stale";
const STALE_HELP: &str =
    "1 when the pool could not be read and its statistics are reported as zero.";

/// Exposition sink backed by a `prometheus::Registry`.
pub struct PrometheusExporter {
    registry: Registry,
    registered: Mutex<HashMap<DescriptorSetKey, GroupCollector>>,
}

impl PrometheusExporter {
    /// Exporter with its own, empty registry.
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    pub fn with_registry(registry: Registry) -> Self {
        Self { registry, registered: Mutex::new(HashMap::new()) }
    }

    /// Process-wide exporter bound to `prometheus::default_registry()`.
    pub fn global() -> Arc<Self> {
        Arc::clone(
            GLOBAL_EXPORTER
                .get_or_init(|| Arc::new(Self::with_registry(prometheus::default_registry().clone()))),
        )
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Gather every family of the underlying registry.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Render the registry in the text exposition format.
    ///
    /// # Errors
    /// Returns `PoolStatsError::Exposition` if encoding fails.
    pub fn render(&self) -> Result<String> {
        TextEncoder::new()
            .encode_to_string(&self.gather())
            .map_err(|e| PoolStatsError::from(InfraError::from(e)))
    }

    /// Number of descriptor groups registered through this exporter.
    pub fn group_count(&self) -> usize {
        self.registered.lock().len()
    }
}

impl Default for PrometheusExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PrometheusExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusExporter").field("groups", &self.group_count()).finish_non_exhaustive()
    }
}

impl ExpositionSink for PrometheusExporter {
    fn register(&self, group: Arc<DescriptorGroup>) -> Result<()> {
        let key = group.key().clone();
        let collector =
            GroupCollector::new(group).map_err(|e| PoolStatsError::from(InfraError::from(e)))?;

        let mut registered = self.registered.lock();
        if registered.contains_key(&key) {
            return Err(PoolStatsError::DuplicateRegistration(key.to_string()));
        }

        self.registry
            .register(Box::new(collector.clone()))
            .map_err(|e| PoolStatsError::from(InfraError::from(e)))?;
        registered.insert(key.clone(), collector);
        debug!(descriptor_set = %key, "descriptor group registered with prometheus");
        Ok(())
    }

    fn unregister(&self, group: &DescriptorGroup) -> Result<()> {
        let Some(collector) = self.registered.lock().remove(group.key()) else {
            return Ok(());
        };

        self.registry
            .unregister(Box::new(collector))
            .map_err(|e| PoolStatsError::from(InfraError::from(e)))?;
        debug!(descriptor_set = %group.key(), "descriptor group unregistered from prometheus");
        Ok(())
    }
}

/* -------------------------------------------------------------------------- */
/* Group collector */
/* -------------------------------------------------------------------------- */

#[derive(Clone)]
struct GroupCollector {
    group: Arc<DescriptorGroup>,
    descs: Vec<Desc>,
    stale_name: String,
}

impl GroupCollector {
    fn new(group: Arc<DescriptorGroup>) -> std::result::Result<Self, prometheus::Error> {
        let key = group.key();
        let stale_name = build_fq_name(&key.namespace, &key.subsystem, STALE_METRIC);

        let mut descs = group
            .descriptors()
            .descriptors()
            .iter()
            .map(|d| Desc::new(d.fq_name.clone(), d.help.clone(), d.label_names.clone(), HashMap::new()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        descs.push(Desc::new(
            stale_name.clone(),
            STALE_HELP.to_string(),
            vec![key.label_name.clone()],
            HashMap::new(),
        )?);
        Ok(Self { group, descs, stale_name })
    }
}

impl Collector for GroupCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let batches = self.group.scrape();
        if batches.is_empty() {
            return Vec::new();
        }

        let mut families = Vec::with_capacity(self.descs.len());
        for descriptor in self.group.descriptors().descriptors() {
            match materialise(descriptor, &batches) {
                Ok(mut family) => families.append(&mut family),
                Err(error) => {
                    warn!(metric = %descriptor.fq_name, error = %error, "failed to materialise metric family");
                }
            }
        }
        match materialise_stale(&self.stale_name, &self.group.key().label_name, &batches) {
            Ok(mut family) => families.append(&mut family),
            Err(error) => {
                warn!(metric = %self.stale_name, error = %error, "failed to materialise metric family");
            }
        }
        families
    }
}

fn materialise(
    descriptor: &MetricDescriptor,
    batches: &[SampleBatch],
) -> std::result::Result<Vec<MetricFamily>, prometheus::Error> {
    let opts = Opts::new(descriptor.fq_name.clone(), descriptor.help.clone());
    let label_names: Vec<&str> = descriptor.label_names.iter().map(String::as_str).collect();
    let samples = batches.iter().filter_map(|batch| batch.get(descriptor.statistic));

    match descriptor.kind {
        ValueKind::Gauge => {
            let gauges = GaugeVec::new(opts, &label_names)?;
            for sample in samples {
                gauges.get_metric_with_label_values(&label_values(sample))?.set(sample.value);
            }
            Ok(gauges.collect())
        }
        ValueKind::Counter => {
            let counters = CounterVec::new(opts, &label_names)?;
            for sample in samples {
                counters.get_metric_with_label_values(&label_values(sample))?.inc_by(sample.value);
            }
            Ok(counters.collect())
        }
    }
}

fn materialise_stale(
    fq_name: &str,
    label_name: &str,
    batches: &[SampleBatch],
) -> std::result::Result<Vec<MetricFamily>, prometheus::Error> {
    let gauges = GaugeVec::new(Opts::new(fq_name, STALE_HELP), &[label_name])?;
    for batch in batches {
        let value = if batch.stale { 1.0 } else { 0.0 };
        gauges.get_metric_with_label_values(&[batch.identity.as_str()])?.set(value);
    }
    Ok(gauges.collect())
}

fn label_values(sample: &LabeledSample) -> Vec<&str> {
    sample.label_values.iter().map(String::as_str).collect()
}
