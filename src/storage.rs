//! JSON export of task reports.

use crate::model::TaskReport;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Write `report` as pretty JSON to `path`, creating parent directories as needed.
pub fn export_json(path: &Path, report: &TaskReport) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
    }
    let data = serde_json::to_vec_pretty(report)?;
    std::fs::write(path, data).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// File name for an export taken from the TUI, derived from the report timestamp.
pub fn default_export_name(report: &TaskReport) -> String {
    let stem = crate::model::display_name(&report.path)
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect::<String>();
    format!(
        "token-count-{}-{}.json",
        stem,
        report.timestamp_utc.replace(':', "-").replace('T', "_")
    )
}

/// Export into the current directory under `default_export_name`.
/// Returns the absolute path of the exported file.
pub fn export_to_current_dir(report: &TaskReport) -> Result<PathBuf> {
    let current_dir = std::env::current_dir().context("get current directory")?;
    let path = current_dir.join(default_export_name(report));
    export_json(&path, report)?;
    Ok(path)
}
