//! Logging infrastructure.
//!
//! This module provides:
//! - Per-run loggers with file + callback dual output
//! - Compact mode with progress filtering
//! - Tail buffer of collaborator output for failure reports
//! - Rotation of old run logs
//! - Integration with the `tracing` ecosystem
//!
//! # Example
//!
//! ```no_run
//! use vidub_core::logging::{LogConfig, RunLogger};
//!
//! let logger = RunLogger::new("my_talk", "/path/to/logs", LogConfig::default(), None).unwrap();
//!
//! logger.stage("Download");
//! logger.progress(40);
//! logger.success("Run completed");
//! ```

mod run_logger;
mod types;

pub use run_logger::{prune_old_logs, RunLogger};
pub use types::{LineCallback, LogConfig, LogLevel, MessagePrefix};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize global tracing subscriber for application-wide logging.
///
/// Respects `RUST_LOG`, falling back to `default_level`. Should be called
/// once at application startup.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter_str()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}
