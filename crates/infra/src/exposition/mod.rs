//! Prometheus exposition of descriptor groups.

pub mod prometheus_exporter;

pub use prometheus_exporter::PrometheusExporter;
