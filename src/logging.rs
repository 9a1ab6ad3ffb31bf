//! Structured logging setup.
//!
//! The driver itself only emits `tracing` events. Applications that have no
//! subscriber of their own can call [`init_logging`] once at startup to get
//! console output and, optionally, daily rolling JSON files.

use crate::error::{KkmError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Prefix of rolling log file names (`kkm.YYYY-MM-DD`).
pub const LOG_FILE_PREFIX: &str = "kkm";

/// Default number of log files kept by [`prune_old_logs`].
pub const MAX_LOG_FILES: usize = 10;

const DEFAULT_FILTER: &str = "info,kkm_driver=debug";

/// Keeps the background log writer alive. Dropping it flushes pending lines.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
///
/// Fails with `KkmError::Config` when a global subscriber is already set.
pub fn init_logging(log_dir: Option<&Path>) -> Result<LogGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            prune_old_logs(dir, MAX_LOG_FILES);
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .try_init()
        .map_err(|e| KkmError::Config(format!("logging already initialised: {e}")))?;

    Ok(LogGuard { _file: guard })
}

/// Remove the oldest `kkm.*` files in `dir` beyond `keep`. Returns how many
/// were removed.
pub fn prune_old_logs(dir: &Path, keep: usize) -> usize {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };

    let prefix = format!("{LOG_FILE_PREFIX}.");
    let mut log_files: Vec<(std::time::SystemTime, PathBuf)> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix))
        })
        .map(|path| {
            let modified = fs::metadata(&path)
                .and_then(|m| m.modified())
                .unwrap_or(std::time::UNIX_EPOCH);
            (modified, path)
        })
        .collect();

    // newest first; the date suffix breaks mtime ties
    log_files.sort_by(|a, b| b.cmp(a));

    let mut removed = 0;
    for (_, path) in log_files.iter().skip(keep) {
        match fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Failed to prune log file {}: {e}", path.display()),
        }
    }
    removed
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
