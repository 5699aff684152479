//! Single-flight task state.
//!
//! `TaskRunner` is the one owner of the Task State / Result pair. It accepts at most one
//! request at a time, animates the progress label only while that request is running,
//! and hands out each terminal outcome exactly once before returning to idle.

use crate::model::{RejectReason, TaskMode, TaskOutcome, TaskRequest, TaskState};
use tracing::{debug, warn};

/// Number of distinct dot frames ("", ".", "..", "...").
const DOT_FRAMES: u8 = 4;

#[derive(Debug)]
pub(crate) struct TaskRunner {
    state: TaskState,
    request: Option<TaskRequest>,
    outcome: Option<TaskOutcome>,
    dots: u8,
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self {
            state: TaskState::Idle,
            request: None,
            outcome: None,
            dots: 0,
        }
    }
}

impl TaskRunner {
    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TaskState::Running
    }

    /// The request currently in flight (or awaiting hand-off of its outcome).
    pub fn current_request(&self) -> Option<&TaskRequest> {
        self.request.as_ref()
    }

    /// Accept `request` unless another one is running or the file type is unsupported.
    /// On success the caller must start exactly one worker for it.
    pub fn submit(&mut self, request: TaskRequest) -> Result<TaskMode, RejectReason> {
        if self.is_running() {
            warn!(path = %request.path.display(), "rejected submission while busy");
            return Err(RejectReason::Busy);
        }
        let Some(mode) = request.mode() else {
            warn!(path = %request.path.display(), "rejected unsupported file type");
            return Err(RejectReason::Unsupported(request.path));
        };

        debug!(path = %request.path.display(), ?mode, "task accepted");
        self.state = TaskState::Running;
        self.request = Some(request);
        self.outcome = None;
        self.dots = 0;
        Ok(mode)
    }

    /// Advance the progress animation. Returns `None` once the task is no longer running,
    /// so a tick that was already queued when the task finished renders nothing.
    pub fn on_progress_tick(&mut self) -> Option<u8> {
        if !self.is_running() {
            return None;
        }
        self.dots = (self.dots + 1) % DOT_FRAMES;
        Some(self.dots)
    }

    /// Record the terminal outcome of the running task. Ignored when nothing is running.
    pub fn on_complete(&mut self, outcome: TaskOutcome) -> bool {
        if !self.is_running() {
            warn!("completion received with no running task");
            return false;
        }
        self.state = outcome.state();
        self.outcome = Some(outcome);
        true
    }

    /// Hand the stored outcome to the presentation layer and return to idle.
    pub fn take_outcome(&mut self) -> Option<TaskOutcome> {
        let outcome = self.outcome.take()?;
        self.state = TaskState::Idle;
        self.request = None;
        self.dots = 0;
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FileTokens, TaskReport};
    use std::path::Path;
    use std::time::Duration;

    fn report(path: &Path, total: usize) -> TaskOutcome {
        TaskOutcome::Succeeded(Box::new(TaskReport {
            timestamp_utc: String::new(),
            path: path.to_path_buf(),
            mode: TaskMode::Folder,
            model: "gpt-4".into(),
            total_tokens: total,
            files: vec![FileTokens {
                name: "a.pdf".into(),
                tokens: total,
            }],
            summary_path: None,
            elapsed: Duration::from_millis(1),
        }))
    }

    #[test]
    fn success_goes_idle_running_succeeded_idle() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = TaskRunner::default();
        assert_eq!(runner.state(), TaskState::Idle);

        let mode = runner
            .submit(TaskRequest::new(dir.path(), false))
            .unwrap();
        assert_eq!(mode, TaskMode::Folder);
        assert_eq!(runner.state(), TaskState::Running);

        assert!(runner.on_complete(report(dir.path(), 9)));
        assert_eq!(runner.state(), TaskState::Succeeded);

        match runner.take_outcome() {
            Some(TaskOutcome::Succeeded(r)) => assert_eq!(r.total_tokens, 9),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(runner.state(), TaskState::Idle);
        assert!(runner.take_outcome().is_none());
        assert!(runner.current_request().is_none());
    }

    #[test]
    fn failure_is_terminal_and_resets() {
        let mut runner = TaskRunner::default();
        runner.submit(TaskRequest::new("deck.pptx", false)).unwrap();
        runner.on_complete(TaskOutcome::Failed("boom".into()));
        assert_eq!(runner.state(), TaskState::Failed);
        assert!(matches!(runner.take_outcome(), Some(TaskOutcome::Failed(m)) if m == "boom"));
        assert_eq!(runner.state(), TaskState::Idle);
    }

    #[test]
    fn unsupported_extension_never_runs() {
        let mut runner = TaskRunner::default();
        let reason = runner
            .submit(TaskRequest::new("notes.txt", true))
            .unwrap_err();
        assert_eq!(reason, RejectReason::Unsupported("notes.txt".into()));
        assert_eq!(runner.state(), TaskState::Idle);
        assert!(runner.current_request().is_none());
        assert_eq!(runner.on_progress_tick(), None);
    }

    #[test]
    fn second_submission_leaves_the_running_task_alone() {
        let mut runner = TaskRunner::default();
        let first = TaskRequest::new("first.docx", false);
        runner.submit(first.clone()).unwrap();
        runner.on_progress_tick();

        let reason = runner
            .submit(TaskRequest::new("second.docx", true))
            .unwrap_err();
        assert_eq!(reason, RejectReason::Busy);
        assert_eq!(runner.state(), TaskState::Running);
        assert_eq!(runner.current_request(), Some(&first));
        // The animation keeps its place.
        assert_eq!(runner.on_progress_tick(), Some(2));
    }

    #[test]
    fn ticks_cycle_through_four_frames_while_running_only() {
        let mut runner = TaskRunner::default();
        assert_eq!(runner.on_progress_tick(), None);

        runner.submit(TaskRequest::new("a.xlsx", false)).unwrap();
        let frames: Vec<u8> = (0..6).filter_map(|_| runner.on_progress_tick()).collect();
        assert_eq!(frames, vec![1, 2, 3, 0, 1, 2]);

        runner.on_complete(TaskOutcome::Failed("x".into()));
        assert_eq!(runner.on_progress_tick(), None);
        runner.take_outcome();
        assert_eq!(runner.on_progress_tick(), None);
    }

    #[test]
    fn resubmitting_after_completion_restarts_the_animation() {
        let mut runner = TaskRunner::default();
        runner.submit(TaskRequest::new("a.pdf", false)).unwrap();
        runner.on_progress_tick();
        runner.on_complete(TaskOutcome::Failed("x".into()));
        runner.take_outcome();

        runner.submit(TaskRequest::new("a.pdf", false)).unwrap();
        assert_eq!(runner.state(), TaskState::Running);
        assert_eq!(runner.on_progress_tick(), Some(1));
    }

    #[test]
    fn stray_completion_is_ignored() {
        let mut runner = TaskRunner::default();
        assert!(!runner.on_complete(TaskOutcome::Failed("late".into())));
        assert_eq!(runner.state(), TaskState::Idle);
        assert!(runner.take_outcome().is_none());
    }
}
