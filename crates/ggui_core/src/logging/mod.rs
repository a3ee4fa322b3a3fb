//! Logging infrastructure for Gource GUI.
//!
//! This module provides:
//! - Application-wide `tracing` setup (stderr, optionally a rolling file)
//! - Per-run loggers capturing child process output
//! - Tail buffer used to build failure messages
//!
//! # Example
//!
//! ```no_run
//! use ggui_core::logging::{init_tracing, LogConfig, LogLevel, RunLog};
//!
//! init_tracing(LogLevel::Info);
//!
//! let log = RunLog::new("gource", LogConfig::default());
//! log.command("gource /path/to/repo --viewport 1280x720");
//! log.output_line("Warning: could not load font");
//! assert_eq!(log.tail().len(), 1);
//! ```

mod run_log;
mod types;

use std::path::Path;

pub use run_log::RunLog;
pub use types::{LineCallback, LogConfig, LogLevel, MessagePrefix};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize global tracing subscriber for application-wide logging.
///
/// Respects `RUST_LOG`, falling back to `default_level`. Should be called
/// once at application startup.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_to_filter_str(default_level)));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .try_init();
}

/// Initialize tracing to stderr plus a daily log file in `logs_dir`.
///
/// The returned guard must be kept alive for the file writer to flush.
/// Falls back to stderr-only logging if the directory cannot be created.
pub fn init_tracing_with_file(default_level: LogLevel, logs_dir: &Path) -> Option<WorkerGuard> {
    if let Err(e) = std::fs::create_dir_all(logs_dir) {
        init_tracing(default_level);
        tracing::warn!("Cannot create logs folder {}: {}", logs_dir.display(), e);
        return None;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_to_filter_str(default_level)));

    let appender = tracing_appender::rolling::daily(logs_dir, "gource-gui.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .with(filter)
        .try_init();

    Some(guard)
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

/// Convert LogLevel to filter string.
fn level_to_filter_str(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_to_filter_works() {
        assert_eq!(level_to_filter_str(LogLevel::Debug), "debug");
        assert_eq!(level_to_filter_str(LogLevel::Warn), "warn");
    }

    #[test]
    fn level_parses_from_str() {
        assert_eq!("WARNING".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert!("loud".parse::<LogLevel>().is_err());
    }
}
