//! Metric collector, its ports, and the registry that owns registration.

pub mod ports;
pub mod registry;
pub mod service;
