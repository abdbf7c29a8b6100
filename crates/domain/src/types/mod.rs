//! Domain types
//!
//! - `stats`: the pool snapshot and the statistic schema table
//! - `metrics`: descriptors, labeled samples and sample batches

pub mod metrics;
pub mod stats;

pub use metrics::{
    DescriptorSet, DescriptorSetKey, LabeledSample, MetricDescriptor, SampleBatch, ValueKind,
};
pub use stats::{PoolStatsSnapshot, Statistic};
