//! Logging infrastructure for zterm.
//!
//! Structured logging through the `tracing` ecosystem. Because the TUI owns
//! the terminal for the whole session, logs go to a file only: JSON lines
//! under `~/.zterm/logs/`, rotated daily. Console output would corrupt the
//! alternate screen.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{Result, ZtermError};

/// Guard that must be held to ensure log flushing on shutdown.
///
/// Keep this guard alive for the lifetime of the application; dropping it
/// flushes any pending log entries.
pub struct LogGuard {
    _file_guard: WorkerGuard,
}

/// Initialize the zterm logging system.
///
/// Sets up JSON-lines file logging under `log_dir` (default
/// `~/.zterm/logs/`). `verbose` lowers the default filter from INFO to
/// DEBUG; `RUST_LOG` overrides both.
pub fn init_logging(log_dir: Option<PathBuf>, verbose: bool) -> Result<LogGuard> {
    let log_dir = match log_dir {
        Some(dir) => dir,
        None => default_log_dir()?,
    };

    std::fs::create_dir_all(&log_dir)
        .map_err(|e| ZtermError::io("creating log directory", &log_dir, e))?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "zterm.log");
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("zterm={default_level}")));

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    tracing::debug!(log_dir = %log_dir.display(), verbose, "logging initialized");

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}

/// Initialize minimal console-only logging for tests.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// Default log directory, `~/.zterm/logs/`.
pub fn default_log_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| ZtermError::internal("cannot determine home directory"))?;
    Ok(home.join(".zterm").join("logs"))
}
