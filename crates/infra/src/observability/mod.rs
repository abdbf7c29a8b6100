//! Observability infrastructure
//!
//! Tracing subscriber initialisation driven by `LoggingConfig`. Components
//! log through `tracing` macros with structured fields; this module only
//! decides where and how those events are written.

pub mod logging;

pub use logging::init_tracing;
