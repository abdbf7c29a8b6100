//! Domain utilities

pub mod naming;
