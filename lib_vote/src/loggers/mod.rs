//! # Loggers Module
//!
//! Installs the global `tracing` subscriber for applications embedding the
//! voting client. The library itself only emits events.

/// Subscriber setup and log file housekeeping.
pub mod setup;

pub use setup::{cleanup_old_logs, setup_logging};
