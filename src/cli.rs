use crate::extract::OfficeExtractor;
use crate::model::{RunConfig, TaskEvent, TaskOutcome, TaskReport, TaskRequest, SUMMARY_FILE_NAME};
use crate::orchestrator::{self, UiCommand};
use crate::pipeline::Pipeline;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "file-token-counter",
    version,
    about = "Count language-model tokens in PDF, DOCX, XLSX and PPTX files"
)]
pub struct Cli {
    /// File or folder to count (submitted immediately when the TUI starts)
    pub path: Option<PathBuf>,

    /// Write token_counts.csv into the folder after a folder run
    #[arg(long)]
    pub summary: bool,

    /// Tokenizer profile (e.g. gpt-4, gpt-4o, or "whitespace" for a rough word count)
    #[arg(long, default_value = crate::tokens::DEFAULT_MODEL)]
    pub model: String,

    /// Interval between "Processing" animation frames
    #[arg(long, default_value = "500ms")]
    pub tick_interval: humantime::Duration,

    /// Print JSON result and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Export the result as JSON (headless modes)
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Log file (defaults to the platform data directory in TUI mode, stderr otherwise)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn is_headless(&self) -> bool {
        self.json || self.text || cfg!(not(feature = "tui"))
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if args.json && args.text {
        return Err(anyhow::anyhow!(
            "--json and --text are mutually exclusive. Pick one output mode."
        ));
    }

    if let Some(target) = crate::logging::target_for(args.log_file.as_deref(), !args.is_headless())
    {
        crate::logging::init(&target)?;
    }

    if !args.is_headless() {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
    }

    run_headless(args).await
}

/// Build a `RunConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> RunConfig {
    RunConfig {
        model: args.model.clone(),
        tick_interval: Duration::from(args.tick_interval),
        summary_file_name: SUMMARY_FILE_NAME.to_string(),
    }
}

/// Load the tokenizer for `cfg.model` and wire it to the office extractors.
pub fn build_pipeline(cfg: &RunConfig) -> Result<Pipeline> {
    let counter = crate::tokens::counter_for(&cfg.model)
        .with_context(|| format!("failed to load tokenizer for model {}", cfg.model))?;
    Ok(Pipeline::new(
        Arc::new(OfficeExtractor),
        counter,
        cfg.summary_file_name.clone(),
    ))
}

/// Process one request without the TUI and print the result.
async fn run_headless(args: Cli) -> Result<()> {
    let path = args
        .path
        .clone()
        .context("a PATH is required with --text or --json")?;
    let cfg = build_config(&args);
    let pipeline = build_pipeline(&cfg)?;

    let (out_tx, out_handle) = spawn_output_writer();
    let result = drive_request(&cfg, pipeline, TaskRequest::new(path, args.summary), |ev| {
        if args.json {
            return;
        }
        match ev {
            TaskEvent::Started { request } => {
                let _ = out_tx.send(OutputLine::Stderr(format!(
                    "Processing {}",
                    request.path.display()
                )));
            }
            TaskEvent::FileCounted { file, done, total } if *total > 1 => {
                let _ = out_tx.send(OutputLine::Stderr(format!(
                    "[{done}/{total}] {}: {} tokens",
                    file.name, file.tokens
                )));
            }
            _ => {}
        }
    })
    .await;

    let outcome = emit_report(&args, result, &out_tx);
    drop(out_tx);
    let _ = out_handle.await;
    outcome
}

/// Export and print a finished headless run.
fn emit_report(
    args: &Cli,
    result: Result<TaskReport>,
    out_tx: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    let report = result?;
    handle_exports(args, &report)?;

    if args.json {
        let out = serde_json::to_string_pretty(&report)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else {
        for line in crate::text_summary::build_text_summary(&report).lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }
    if let Some(p) = args.export_json.as_deref() {
        let _ = out_tx.send(OutputLine::Stderr(format!("Exported: {}", p.display())));
    }
    Ok(())
}

/// Run `request` through the controller and wait for its single outcome. `on_event` sees
/// every event as it arrives.
async fn drive_request(
    cfg: &RunConfig,
    pipeline: Pipeline,
    request: TaskRequest,
    mut on_event: impl FnMut(&TaskEvent),
) -> Result<TaskReport> {
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<TaskEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let ctrl_cfg = cfg.clone();
    let handle = tokio::spawn(async move {
        orchestrator::run_controller(&ctrl_cfg, pipeline, Some(request), evt_tx, cmd_rx).await
    });
    // Quit is deferred by the controller until the worker finishes.
    let _ = cmd_tx.send(UiCommand::Quit);

    let mut rejection = None;
    let mut outcome = None;
    while let Some(ev) = evt_rx.recv().await {
        on_event(&ev);
        match ev {
            TaskEvent::Rejected { reason } => rejection = Some(reason),
            TaskEvent::Completed { outcome: o } => outcome = Some(o),
            TaskEvent::Info(msg) => debug!("{msg}"),
            _ => {}
        }
    }

    handle.await.context("controller task failed")??;

    if let Some(reason) = rejection {
        return Err(anyhow::anyhow!(reason.to_message()));
    }
    match outcome {
        Some(TaskOutcome::Succeeded(report)) => Ok(*report),
        Some(TaskOutcome::Failed(msg)) => Err(anyhow::anyhow!("token count failed: {msg}")),
        None => Err(anyhow::anyhow!("task ended without a result")),
    }
}

/// Handle export operations for both text and JSON modes.
fn handle_exports(args: &Cli, report: &TaskReport) -> Result<()> {
    if let Some(p) = args.export_json.as_deref() {
        crate::storage::export_json(p, report)?;
    }
    Ok(())
}
