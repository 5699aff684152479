use crate::model::{FileTokens, TaskReport, TaskRequest, TaskState};
use ratatui::style::Color;

/// Longest file name shown before truncation kicks in.
pub const MAX_NAME_CHARS: usize = 40;

pub struct UiState {
    pub tab: usize,
    /// Mirrors the controller's runner; terminal states stay visible until the next start.
    pub task_state: TaskState,
    pub dots: u8,
    pub info: String,
    pub info_is_warning: bool,
    pub model: String,
    pub write_summary: bool,

    pub current: Option<TaskRequest>,
    pub last_request: Option<TaskRequest>,
    pub live_files: Vec<FileTokens>,
    pub progress: Option<(usize, usize)>,
    pub last_report: Option<TaskReport>,
    pub last_error: Option<String>,

    /// Path being typed after pressing `o`; `None` when the prompt is closed.
    pub prompt: Option<String>,
    pub files_scroll: usize,
    /// Set once quit was sent; the UI exits when no count is running anymore.
    pub quit_requested: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: 0,
            task_state: TaskState::Idle,
            dots: 0,
            info: String::new(),
            info_is_warning: false,
            model: crate::tokens::DEFAULT_MODEL.to_string(),
            write_summary: false,
            current: None,
            last_request: None,
            live_files: Vec::new(),
            progress: None,
            last_report: None,
            last_error: None,
            prompt: None,
            files_scroll: 0,
            quit_requested: false,
        }
    }
}

/// Shorten `name` to at most `MAX_NAME_CHARS` characters, ending in `...` when cut.
pub fn truncate_name(name: &str) -> String {
    if name.chars().count() <= MAX_NAME_CHARS {
        return name.to_string();
    }
    let head: String = name.chars().take(MAX_NAME_CHARS - 3).collect();
    format!("{head}...")
}

pub fn processing_label(dots: u8) -> String {
    format!("Processing{}", ".".repeat(dots as usize))
}

impl UiState {
    pub fn set_info(&mut self, msg: impl Into<String>) {
        self.info = msg.into();
        self.info_is_warning = false;
    }

    pub fn set_warning(&mut self, msg: impl Into<String>) {
        self.info = msg.into();
        self.info_is_warning = true;
    }

    pub fn is_running(&self) -> bool {
        self.task_state == TaskState::Running
    }

    /// Name of the request on screen: the running one, else the last one submitted.
    pub fn selected_name(&self) -> Option<String> {
        self.current
            .as_ref()
            .or(self.last_request.as_ref())
            .map(|r| truncate_name(&r.display_name()))
    }

    /// Headline status and its color.
    pub fn status(&self) -> (String, Color) {
        match self.task_state {
            TaskState::Idle => ("Select a file or folder (press o)".into(), Color::Gray),
            TaskState::Running => (processing_label(self.dots), Color::Yellow),
            TaskState::Succeeded => match self.last_report.as_ref() {
                Some(r) => (format!("Total tokens: {}", r.total_tokens), Color::Green),
                None => ("Done".into(), Color::Green),
            },
            TaskState::Failed => (
                format!("Error: {}", self.last_error.as_deref().unwrap_or("unknown")),
                Color::Red,
            ),
        }
    }

    /// Per-file rows for the Files tab: live rows while running, the report's otherwise.
    pub fn file_rows(&self) -> &[FileTokens] {
        if self.is_running() {
            return &self.live_files;
        }
        match self.last_report.as_ref() {
            Some(r) => &r.files,
            None => &self.live_files,
        }
    }
}
