//! HTTP scrape endpoint

pub mod metrics;

pub use metrics::metrics_router;
