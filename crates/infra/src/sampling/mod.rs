//! Periodic sampling of pool statistics
//!
//! `SamplingLoop` drives a collector on a fixed interval and forwards each
//! batch to a publisher. Loops follow the workspace runtime rules:
//! - Explicit lifecycle (`start` / `stop`)
//! - Join handle kept and awaited with a timeout
//! - Cancellation token checked before every tick
//! - Blocking snapshot reads moved off the async workers and time-bounded

pub mod error;
pub mod sampling_loop;
pub mod stats;

pub use error::{SamplerError, SamplerResult};
pub use sampling_loop::{LoopHandle, SamplingLoop};
pub use stats::{LoopState, LoopStatsSnapshot};
