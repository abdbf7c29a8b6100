//! Metric descriptors and samples
//!
//! A `DescriptorSet` is built once per (namespace, subsystem, label name) and
//! never changes afterwards; it is the identity of a collector group in the
//! exposition sink. `SampleBatch` is what one collection produces: exactly
//! one `LabeledSample` per descriptor, in `Statistic` order.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_LABEL_NAME, DEFAULT_NAMESPACE, DEFAULT_SUBSYSTEM};
use crate::errors::Result;
use crate::impl_domain_enum_conversions;
use crate::types::stats::Statistic;
use crate::utils::naming::{build_fq_name, validate_label_name, validate_metric_part};

/* -------------------------------------------------------------------------- */
/* Value kind */
/* -------------------------------------------------------------------------- */

/// How a sample's value evolves over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Point-in-time value, may go up or down
    Gauge,
    /// Monotonically non-decreasing total
    Counter,
}

impl_domain_enum_conversions!(ValueKind {
    Gauge => "gauge",
    Counter => "counter",
});

/* -------------------------------------------------------------------------- */
/* Descriptors */
/* -------------------------------------------------------------------------- */

/// Immutable (name, help, label schema) triple for one exported metric.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricDescriptor {
    /// `{namespace}_{subsystem}_{metric}`
    pub fq_name: String,
    pub help: String,
    /// Ordered label names; every descriptor in a set shares them.
    pub label_names: Vec<String>,
    pub kind: ValueKind,
    pub statistic: Statistic,
}

/// Key identifying a descriptor set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorSetKey {
    pub namespace: String,
    pub subsystem: String,
    pub label_name: String,
}

impl DescriptorSetKey {
    pub fn new(
        namespace: impl Into<String>,
        subsystem: impl Into<String>,
        label_name: impl Into<String>,
    ) -> Self {
        Self { namespace: namespace.into(), subsystem: subsystem.into(), label_name: label_name.into() }
    }
}

impl Default for DescriptorSetKey {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE, DEFAULT_SUBSYSTEM, DEFAULT_LABEL_NAME)
    }
}

impl std::fmt::Display for DescriptorSetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{{{}}}", build_fq_name(&self.namespace, &self.subsystem, "*"), self.label_name)
    }
}

/// The seven descriptors of one collector group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorSet {
    key: DescriptorSetKey,
    descriptors: Vec<Arc<MetricDescriptor>>,
}

impl DescriptorSet {
    /// Build the descriptor set for a key.
    ///
    /// # Errors
    /// Returns `PoolStatsError::InvalidConfiguration` if the namespace,
    /// subsystem or label name is not a valid metric identifier.
    pub fn build(key: DescriptorSetKey) -> Result<Self> {
        validate_metric_part("namespace", &key.namespace)?;
        validate_metric_part("subsystem", &key.subsystem)?;
        validate_label_name(&key.label_name)?;

        let descriptors = Statistic::ALL
            .iter()
            .map(|statistic| {
                Arc::new(MetricDescriptor {
                    fq_name: build_fq_name(
                        &key.namespace,
                        &key.subsystem,
                        statistic.metric_name(),
                    ),
                    help: statistic.help().to_string(),
                    label_names: vec![key.label_name.clone()],
                    kind: statistic.kind(),
                    statistic: *statistic,
                })
            })
            .collect();

        Ok(Self { key, descriptors })
    }

    pub fn key(&self) -> &DescriptorSetKey {
        &self.key
    }

    /// Label name shared by every descriptor in the set.
    pub fn label_name(&self) -> &str {
        &self.key.label_name
    }

    /// Descriptors in `Statistic` order.
    pub fn descriptors(&self) -> &[Arc<MetricDescriptor>] {
        &self.descriptors
    }

    pub fn get(&self, statistic: Statistic) -> Option<&Arc<MetricDescriptor>> {
        self.descriptors.iter().find(|d| d.statistic == statistic)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/* -------------------------------------------------------------------------- */
/* Samples */
/* -------------------------------------------------------------------------- */

/// A materialised (descriptor, label values, value, kind) tuple.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSample {
    pub descriptor: Arc<MetricDescriptor>,
    /// Values for `descriptor.label_names`, same order.
    pub label_values: Vec<String>,
    pub value: f64,
    pub kind: ValueKind,
}

impl LabeledSample {
    pub fn name(&self) -> &str {
        &self.descriptor.fq_name
    }

    pub fn statistic(&self) -> Statistic {
        self.descriptor.statistic
    }
}

/// Everything one collection produced for one identity.
///
/// Published and scraped as a unit; never merged with another batch.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBatch {
    pub identity: String,
    pub samples: Vec<LabeledSample>,
    /// True when built from a zeroed snapshot after the source failed.
    pub stale: bool,
    pub sampled_at: DateTime<Utc>,
}

impl SampleBatch {
    pub fn get(&self, statistic: Statistic) -> Option<&LabeledSample> {
        self.samples.iter().find(|s| s.statistic() == statistic)
    }

    /// Look a sample up by its fully-qualified name.
    pub fn by_name(&self, fq_name: &str) -> Option<&LabeledSample> {
        self.samples.iter().find(|s| s.name() == fq_name)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
