//! Task lifecycle controller.
//!
//! Owns the `TaskRunner`, starts one blocking worker per accepted request, drives the
//! progress ticker while that worker runs and emits events for presentation layers.

use super::task::TaskRunner;
use crate::error::CountError;
use crate::model::{FileTokens, RunConfig, TaskEvent, TaskOutcome, TaskReport, TaskRequest};
use crate::pipeline::Pipeline;
use anyhow::Result;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Submit(TaskRequest),
    Quit,
}

type Worker = JoinHandle<Result<TaskReport, CountError>>;

/// Run the pipeline for `request` on a fresh blocking worker.
fn start_worker(
    pipeline: &Pipeline,
    request: TaskRequest,
    event_tx: UnboundedSender<TaskEvent>,
) -> Worker {
    let pipeline = pipeline.clone();
    tokio::task::spawn_blocking(move || {
        let mut on_file = |file: &FileTokens, done: usize, total: usize| {
            let _ = event_tx.send(TaskEvent::FileCounted {
                file: file.clone(),
                done,
                total,
            });
        };
        pipeline.run(&request, &mut on_file)
    })
}

/// Apply a submission to the runner; starts a worker only if it was accepted.
fn submit(
    runner: &mut TaskRunner,
    pipeline: &Pipeline,
    request: TaskRequest,
    ticker: &mut Interval,
    event_tx: &UnboundedSender<TaskEvent>,
) -> Option<Worker> {
    match runner.submit(request.clone()) {
        Ok(mode) => {
            info!(path = %request.path.display(), ?mode, "starting task");
            // First animation frame one full interval after the start.
            ticker.reset();
            let _ = event_tx.send(TaskEvent::Started {
                request: request.clone(),
            });
            Some(start_worker(pipeline, request, event_tx.clone()))
        }
        Err(reason) => {
            let _ = event_tx.send(TaskEvent::Rejected { reason });
            None
        }
    }
}

/// Serve UI commands until quit. A task that is running when quit arrives is allowed to
/// finish first; there is no cancellation.
pub(crate) async fn run_controller(
    cfg: &RunConfig,
    pipeline: Pipeline,
    initial: Option<TaskRequest>,
    event_tx: UnboundedSender<TaskEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut runner = TaskRunner::default();
    let mut ticker = tokio::time::interval(cfg.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut worker: Option<Worker> = None;
    if let Some(request) = initial {
        worker = submit(&mut runner, &pipeline, request, &mut ticker, &event_tx);
    }
    let mut quit_pending = false;
    // A closed command channel reads as a final Quit and is not polled again.
    let mut cmd_open = true;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv(), if cmd_open => {
                match cmd {
                    Some(UiCommand::Submit(request)) => {
                        if quit_pending {
                            continue;
                        }
                        if let Some(started) =
                            submit(&mut runner, &pipeline, request, &mut ticker, &event_tx)
                        {
                            worker = Some(started);
                        }
                    }
                    Some(UiCommand::Quit) | None => {
                        if cmd.is_none() {
                            cmd_open = false;
                        }
                        if worker.is_none() {
                            break Ok(());
                        }
                        if !quit_pending {
                            quit_pending = true;
                            let name = runner
                                .current_request()
                                .map(|r| r.display_name())
                                .unwrap_or_else(|| "the current task".into());
                            let _ = event_tx.send(TaskEvent::Info(format!(
                                "Waiting for {name} to finish…"
                            )));
                        }
                    }
                }
            }
            // Do not take the JoinHandle before this branch wins; otherwise it can be dropped
            // if another select branch is chosen, and we'll never observe completion.
            maybe_done = async {
                if let Some(h) = worker.as_mut() {
                    return Some(h.await);
                }
                futures::future::pending().await
            } => {
                if let Some(join_res) = maybe_done {
                    worker = None;
                    let outcome = match join_res {
                        Ok(Ok(report)) => TaskOutcome::Succeeded(Box::new(report)),
                        Ok(Err(e)) => {
                            warn!("task failed: {e}");
                            TaskOutcome::Failed(e.to_string())
                        }
                        Err(e) => {
                            error!("task worker did not finish: {e}");
                            TaskOutcome::Failed(format!("Worker stopped unexpectedly: {e}"))
                        }
                    };
                    runner.on_complete(outcome);
                    debug!(state = ?runner.state(), "task finished");
                    if let Some(outcome) = runner.take_outcome() {
                        let _ = event_tx.send(TaskEvent::Completed { outcome });
                    }
                    if quit_pending {
                        break Ok(());
                    }
                }
            }
            // The precondition stops scheduling once the task leaves Running; the runner
            // re-checks at fire time for a tick that was already due.
            _ = ticker.tick(), if runner.is_running() => {
                if let Some(dots) = runner.on_progress_tick() {
                    let _ = event_tx.send(TaskEvent::Progress { dots });
                }
            }
        }
    }
}
