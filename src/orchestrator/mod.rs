//! Application-level orchestration.
//!
//! This module owns the single-flight task lifecycle (submit, progress, completion) and
//! the event stream that UI/CLI layers render. Presentation code never touches the
//! pipeline directly.

mod controller;
mod task;

pub(crate) use controller::{run_controller, UiCommand};
