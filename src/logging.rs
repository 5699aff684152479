//! Tracing subscriber setup.
//!
//! The TUI owns stdout/stderr, so interactive runs log to a file. Headless runs log to
//! stderr and only surface warnings unless `RUST_LOG` says otherwise.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const APP_DIR: &str = "file-token-counter";
const LOG_FILE_NAME: &str = "file-token-counter.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    Stderr,
}

/// `<data_local_dir>/file-token-counter/file-token-counter.log`, if the platform has one.
pub fn default_log_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join(APP_DIR).join(LOG_FILE_NAME))
}

/// Pick the log destination for a run. An explicit path always wins.
pub fn target_for(explicit: Option<&Path>, interactive: bool) -> Option<LogTarget> {
    match (explicit, interactive) {
        (Some(p), _) => Some(LogTarget::File(p.to_path_buf())),
        (None, true) => default_log_path().map(LogTarget::File),
        (None, false) => Some(LogTarget::Stderr),
    }
}

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Install the global subscriber. Calling this twice is an error.
pub fn init(target: &LogTarget) -> Result<()> {
    match target {
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(env_filter("info"))
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init()
                .map_err(|e| anyhow::anyhow!("failed to install logger: {e}"))?;
        }
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter("warn"))
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow::anyhow!("failed to install logger: {e}"))?;
        }
    }
    Ok(())
}
