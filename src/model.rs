use crate::extract::{DocumentKind, SUPPORTED_EXTENSIONS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the folder-mode CSV summary, written next to the counted files.
pub const SUMMARY_FILE_NAME: &str = "token_counts.csv";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Tokenizer profile, e.g. `gpt-4`.
    pub model: String,
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,
    pub summary_file_name: String,
}

/// A path picked by the user plus the "write a CSV summary" toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub path: PathBuf,
    /// Only meaningful for folders.
    pub write_summary: bool,
}

impl TaskRequest {
    pub fn new(path: impl Into<PathBuf>, write_summary: bool) -> Self {
        Self {
            path: path.into(),
            write_summary,
        }
    }

    /// Decide how the request would be processed. `None` means the path is a file with
    /// an unsupported extension.
    pub fn mode(&self) -> Option<TaskMode> {
        if self.path.is_dir() {
            Some(TaskMode::Folder)
        } else {
            DocumentKind::from_path(&self.path).map(TaskMode::File)
        }
    }

    /// Last path component, for display.
    pub fn display_name(&self) -> String {
        display_name(&self.path)
    }
}

pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskMode {
    File(DocumentKind),
    Folder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Token count of one processed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTokens {
    pub name: String,
    pub tokens: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReport {
    #[serde(default)]
    pub timestamp_utc: String,
    pub path: PathBuf,
    pub mode: TaskMode,
    pub model: String,
    pub total_tokens: usize,
    pub files: Vec<FileTokens>,
    #[serde(default)]
    pub summary_path: Option<PathBuf>,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
}

/// Terminal result of a task, delivered once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TaskOutcome {
    Succeeded(Box<TaskReport>),
    Failed(String),
}

impl TaskOutcome {
    pub fn state(&self) -> TaskState {
        match self {
            TaskOutcome::Succeeded(_) => TaskState::Succeeded,
            TaskOutcome::Failed(_) => TaskState::Failed,
        }
    }
}

/// Why a submission did not start a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    Busy,
    Unsupported(PathBuf),
}

impl RejectReason {
    pub fn to_message(&self) -> String {
        match self {
            RejectReason::Busy => "A file is already being processed.".to_string(),
            RejectReason::Unsupported(path) => format!(
                "Unsupported file type: {} (expected one of: .{})",
                display_name(path),
                SUPPORTED_EXTENSIONS.join(" .")
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TaskEvent {
    Started {
        request: TaskRequest,
    },
    /// Animation frame for the "Processing" label, 0..=3 dots.
    Progress {
        dots: u8,
    },
    FileCounted {
        file: FileTokens,
        done: usize,
        total: usize,
    },
    Rejected {
        reason: RejectReason,
    },
    Completed {
        outcome: TaskOutcome,
    },
    Info(String),
}
