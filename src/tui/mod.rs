mod export;
mod help;
mod state;

use crate::cli::Cli;
use crate::model::{TaskEvent, TaskOutcome, TaskRequest, TaskState};
use crate::orchestrator::{self, UiCommand};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs},
    Terminal,
};
use state::{truncate_name, UiState};
use std::path::PathBuf;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::info;

const TAB_COUNT: usize = 3;

pub async fn run(args: Cli) -> Result<()> {
    let cfg = crate::cli::build_config(&args);
    // Tokenizer load failures abort before the terminal is taken over.
    let pipeline = crate::cli::build_pipeline(&cfg)?;

    // Unbounded channels avoid backpressure between the UI thread and the controller.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<TaskEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let initial = args
        .path
        .clone()
        .map(|p| TaskRequest::new(p, args.summary));
    info!(model = %cfg.model, initial = ?initial, "starting TUI");

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_args = args.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_args, event_rx, cmd_tx));

    let res = orchestrator::run_controller(&cfg, pipeline, initial, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
pub fn run_threaded(
    args: Cli,
    mut event_rx: UnboundedReceiver<TaskEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState {
        model: args.model.clone(),
        write_summary: args.summary,
        ..Default::default()
    };

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep UI responsive.
        let mut controller_gone = false;
        loop {
            match event_rx.try_recv() {
                Ok(ev) => apply_event(&mut state, ev),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    controller_gone = true;
                    break;
                }
            }
        }
        if state.quit_requested && (!state.is_running() || controller_gone) {
            break Ok(());
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key(&mut state, k, &cmd_tx) == KeyOutcome::Quit {
                    break Ok(());
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn apply_event(state: &mut UiState, ev: TaskEvent) {
    match ev {
        TaskEvent::Started { request } => {
            state.task_state = TaskState::Running;
            state.dots = 0;
            state.live_files.clear();
            state.progress = None;
            state.files_scroll = 0;
            state.last_error = None;
            state.set_info(format!("Counting {}", truncate_name(&request.display_name())));
            state.last_request = Some(request.clone());
            state.current = Some(request);
        }
        TaskEvent::Progress { dots } => {
            if state.is_running() {
                state.dots = dots;
            }
        }
        TaskEvent::FileCounted { file, done, total } => {
            state.progress = Some((done, total));
            state.live_files.push(file);
        }
        TaskEvent::Rejected { reason } => {
            state.set_warning(reason.to_message());
        }
        TaskEvent::Completed { outcome } => {
            state.task_state = outcome.state();
            state.current = None;
            state.dots = 0;
            match outcome {
                TaskOutcome::Succeeded(report) => {
                    match report.summary_path.as_deref() {
                        Some(p) => state.set_info(format!("Summary written: {}", p.display())),
                        None => state.set_info(format!("Done in {:.2?}", report.elapsed)),
                    }
                    state.last_report = Some(*report);
                }
                TaskOutcome::Failed(msg) => {
                    state.set_warning("Counting failed");
                    state.last_error = Some(msg);
                }
            }
        }
        TaskEvent::Info(msg) => state.set_info(msg),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyOutcome {
    Continue,
    Quit,
}

fn submit(state: &mut UiState, cmd_tx: &UnboundedSender<UiCommand>, path: PathBuf) {
    let request = TaskRequest::new(path, state.write_summary);
    if cmd_tx.send(UiCommand::Submit(request)).is_err() {
        state.set_warning("Controller stopped; restart the app.");
    }
}

/// Keys typed while the path prompt is open.
fn handle_prompt_key(state: &mut UiState, k: KeyEvent, cmd_tx: &UnboundedSender<UiCommand>) {
    let Some(buf) = state.prompt.as_mut() else {
        return;
    };
    match k.code {
        KeyCode::Esc => state.prompt = None,
        KeyCode::Enter => {
            let typed = buf.trim().to_string();
            state.prompt = None;
            // An empty path is the same as cancelling the picker.
            if !typed.is_empty() {
                submit(state, cmd_tx, PathBuf::from(typed));
            }
        }
        KeyCode::Backspace => {
            buf.pop();
        }
        KeyCode::Char(c) if !k.modifiers.contains(KeyModifiers::CONTROL) => buf.push(c),
        _ => {}
    }
}

/// Ask the controller to stop. A running count keeps the UI up until it completes.
fn request_quit(state: &mut UiState, cmd_tx: &UnboundedSender<UiCommand>) -> KeyOutcome {
    if !state.quit_requested {
        state.quit_requested = true;
        let _ = cmd_tx.send(UiCommand::Quit);
    }
    if state.is_running() {
        state.prompt = None;
        state.set_info("Quitting after the current count finishes…");
        KeyOutcome::Continue
    } else {
        KeyOutcome::Quit
    }
}

fn handle_key(
    state: &mut UiState,
    k: KeyEvent,
    cmd_tx: &UnboundedSender<UiCommand>,
) -> KeyOutcome {
    if state.prompt.is_some() {
        if k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c') {
            return request_quit(state, cmd_tx);
        }
        handle_prompt_key(state, k, cmd_tx);
        return KeyOutcome::Continue;
    }
    if matches!(
        (k.modifiers, k.code),
        (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c'))
    ) {
        return request_quit(state, cmd_tx);
    }
    if state.quit_requested {
        // Only tab switching and scrolling stay live while waiting to exit.
        if !matches!(
            k.code,
            KeyCode::Tab | KeyCode::Up | KeyCode::Down | KeyCode::Char('j' | 'k' | '?')
        ) {
            return KeyOutcome::Continue;
        }
    }

    match (k.modifiers, k.code) {
        (_, KeyCode::Char('o')) => {
            state.tab = 0;
            state.prompt = Some(String::new());
        }
        (_, KeyCode::Char('c')) => {
            state.write_summary = !state.write_summary;
            state.set_info(if state.write_summary {
                "CSV summary enabled"
            } else {
                "CSV summary disabled"
            });
        }
        (_, KeyCode::Char('r')) => match state.last_request.as_ref().map(|r| r.path.clone()) {
            Some(path) => submit(state, cmd_tx, path),
            None => state.set_warning("Nothing to rerun yet. Press o to pick a path."),
        },
        (_, KeyCode::Char('y')) => export::copy_last_total(state),
        (_, KeyCode::Char('e')) => export::export_last_report(state),
        (_, KeyCode::Tab) => {
            state.tab = (state.tab + 1) % TAB_COUNT;
        }
        (_, KeyCode::Char('?')) => {
            state.tab = 2;
        }
        (_, KeyCode::Up) | (_, KeyCode::Char('k')) => {
            if state.tab == 1 {
                state.files_scroll = state.files_scroll.saturating_sub(1);
            }
        }
        (_, KeyCode::Down) | (_, KeyCode::Char('j')) => {
            if state.tab == 1 && state.files_scroll + 1 < state.file_rows().len() {
                state.files_scroll += 1;
            }
        }
        _ => {}
    }
    KeyOutcome::Continue
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![
        Line::from("Counter"),
        Line::from("Files"),
        Line::from("Help"),
    ])
    .select(state.tab)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("file-token-counter v{}", env!("CARGO_PKG_VERSION"))),
    )
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        0 => draw_counter(chunks[1], f, state),
        1 => draw_files(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f),
    }

    if let Some(buf) = state.prompt.as_deref() {
        draw_prompt(area, f, buf);
    }
}

fn kv(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label}: "), Style::default().fg(Color::Gray)),
        Span::raw(value),
    ])
}

fn draw_counter(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(area);

    let (status, color) = state.status();
    let mut lines = vec![
        kv(
            "Selected",
            state
                .selected_name()
                .unwrap_or_else(|| "No file selected".into()),
        ),
        kv("Model", state.model.clone()),
        kv(
            "CSV summary",
            (if state.write_summary { "on" } else { "off" }).to_string(),
        ),
        Line::from(""),
        Line::from(Span::styled(
            status,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
    ];
    if let Some((done, total)) = state.progress {
        if state.is_running() || total > 1 {
            lines.push(kv("Files", format!("{done}/{total}")));
        }
    }
    if let Some(r) = state.last_report.as_ref().filter(|_| !state.is_running()) {
        lines.push(kv("Path", r.path.display().to_string()));
        lines.push(kv("Mode", crate::text_summary::mode_label(r.mode)));
        lines.push(kv("Counted at", r.timestamp_utc.clone()));
    }

    let body = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Tokens"));
    f.render_widget(body, chunks[0]);

    let info_style = if state.info_is_warning {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::Gray)
    };
    let footer = Paragraph::new(Line::from(Span::styled(state.info.clone(), info_style)))
        .block(Block::default().borders(Borders::ALL).title("o open · c csv · ? help"));
    f.render_widget(footer, chunks[1]);
}

fn draw_files(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let rows = state.file_rows();
    let mut lines: Vec<Line> = Vec::with_capacity(rows.len() + 1);
    if rows.is_empty() {
        lines.push(Line::from("No files counted yet."));
    }
    for file in rows.iter().skip(state.files_scroll) {
        lines.push(Line::from(vec![
            Span::raw(format!("{:<42}", truncate_name(&file.name))),
            Span::styled(file.tokens.to_string(), Style::default().fg(Color::Cyan)),
        ]));
    }
    let total: usize = rows.iter().map(|r| r.tokens).sum();
    let title = format!("Files ({}) · {} tokens", rows.len(), total);
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

fn draw_prompt(area: Rect, f: &mut ratatui::Frame, buf: &str) {
    let width = area.width.saturating_sub(4).min(80);
    let popup = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + area.height / 2,
        width,
        height: 3.min(area.height),
    };
    f.render_widget(Clear, popup);
    let p = Paragraph::new(format!("{buf}_")).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Path to a file or folder (Enter to count, Esc to cancel)"),
    );
    f.render_widget(p, popup);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FileTokens, RejectReason, TaskMode, TaskReport};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn channel() -> (UnboundedSender<UiCommand>, UnboundedReceiver<UiCommand>) {
        mpsc::unbounded_channel()
    }

    fn report(total: usize) -> TaskReport {
        TaskReport {
            timestamp_utc: "2024-01-01T00:00:00Z".into(),
            path: "/docs".into(),
            mode: TaskMode::Folder,
            model: "gpt-4".into(),
            total_tokens: total,
            files: vec![FileTokens {
                name: "a.pdf".into(),
                tokens: total,
            }],
            summary_path: None,
            elapsed: Duration::from_millis(5),
        }
    }

    #[test]
    fn prompt_submits_trimmed_path_with_summary_flag() {
        let (tx, mut rx) = channel();
        let mut state = UiState::default();
        handle_key(&mut state, key(KeyCode::Char('c')), &tx);
        handle_key(&mut state, key(KeyCode::Char('o')), &tx);
        for c in " /tmp/x".chars() {
            handle_key(&mut state, key(KeyCode::Char(c)), &tx);
        }
        // Letters typed into the prompt are not shortcuts.
        handle_key(&mut state, key(KeyCode::Char('q')), &tx);
        handle_key(&mut state, key(KeyCode::Backspace), &tx);
        handle_key(&mut state, key(KeyCode::Enter), &tx);

        assert!(state.prompt.is_none());
        match rx.try_recv() {
            Ok(UiCommand::Submit(req)) => {
                assert_eq!(req.path, PathBuf::from("/tmp/x"));
                assert!(req.write_summary);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn empty_or_cancelled_prompt_sends_nothing() {
        let (tx, mut rx) = channel();
        let mut state = UiState::default();

        handle_key(&mut state, key(KeyCode::Char('o')), &tx);
        handle_key(&mut state, key(KeyCode::Char(' ')), &tx);
        handle_key(&mut state, key(KeyCode::Enter), &tx);

        handle_key(&mut state, key(KeyCode::Char('o')), &tx);
        handle_key(&mut state, key(KeyCode::Char('a')), &tx);
        handle_key(&mut state, key(KeyCode::Esc), &tx);

        assert!(rx.try_recv().is_err());
        assert!(state.info.is_empty());
        assert_eq!(state.task_state, TaskState::Idle);
    }

    #[test]
    fn quit_keys_send_quit() {
        let (tx, mut rx) = channel();
        let mut state = UiState::default();
        assert_eq!(
            handle_key(&mut state, key(KeyCode::Char('q')), &tx),
            KeyOutcome::Quit
        );
        assert!(matches!(rx.try_recv(), Ok(UiCommand::Quit)));

        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key(&mut state, ctrl_c, &tx), KeyOutcome::Quit);
    }

    #[test]
    fn quitting_mid_count_waits_for_completion() {
        let (tx, mut rx) = channel();
        let mut state = UiState::default();
        apply_event(
            &mut state,
            TaskEvent::Started {
                request: TaskRequest::new("/docs", false),
            },
        );

        assert_eq!(
            handle_key(&mut state, key(KeyCode::Char('q')), &tx),
            KeyOutcome::Continue
        );
        assert!(state.quit_requested);
        assert!(matches!(rx.try_recv(), Ok(UiCommand::Quit)));

        // Further keys neither resend Quit nor start new work.
        handle_key(&mut state, key(KeyCode::Char('q')), &tx);
        handle_key(&mut state, key(KeyCode::Char('r')), &tx);
        handle_key(&mut state, key(KeyCode::Char('o')), &tx);
        assert!(rx.try_recv().is_err());
        assert!(state.prompt.is_none());

        apply_event(&mut state, TaskEvent::Info("Waiting for docs to finish…".into()));
        assert_eq!(state.info, "Waiting for docs to finish…");
        apply_event(
            &mut state,
            TaskEvent::Completed {
                outcome: TaskOutcome::Succeeded(Box::new(report(4))),
            },
        );
        assert!(!state.is_running());
        assert!(state.quit_requested);
    }

    #[test]
    fn rerun_resubmits_the_last_path() {
        let (tx, mut rx) = channel();
        let mut state = UiState::default();
        handle_key(&mut state, key(KeyCode::Char('r')), &tx);
        assert!(state.info_is_warning);
        assert!(rx.try_recv().is_err());

        apply_event(
            &mut state,
            TaskEvent::Started {
                request: TaskRequest::new("/docs", false),
            },
        );
        apply_event(
            &mut state,
            TaskEvent::Completed {
                outcome: TaskOutcome::Succeeded(Box::new(report(3))),
            },
        );
        handle_key(&mut state, key(KeyCode::Char('r')), &tx);
        assert!(matches!(rx.try_recv(), Ok(UiCommand::Submit(r)) if r.path == PathBuf::from("/docs")));
    }

    #[test]
    fn events_drive_the_status_line() {
        let mut state = UiState::default();
        apply_event(
            &mut state,
            TaskEvent::Started {
                request: TaskRequest::new("/docs", true),
            },
        );
        apply_event(&mut state, TaskEvent::Progress { dots: 2 });
        assert_eq!(state.status().0, "Processing..");

        apply_event(
            &mut state,
            TaskEvent::FileCounted {
                file: FileTokens {
                    name: "a.pdf".into(),
                    tokens: 7,
                },
                done: 1,
                total: 2,
            },
        );
        assert_eq!(state.progress, Some((1, 2)));
        assert_eq!(state.file_rows().len(), 1);

        apply_event(
            &mut state,
            TaskEvent::Completed {
                outcome: TaskOutcome::Succeeded(Box::new(report(7))),
            },
        );
        assert_eq!(state.task_state, TaskState::Succeeded);
        assert_eq!(state.status().0, "Total tokens: 7");

        // A late animation frame does not resurrect the label.
        apply_event(&mut state, TaskEvent::Progress { dots: 3 });
        assert_eq!(state.status().0, "Total tokens: 7");
    }

    #[test]
    fn rejection_is_a_warning_and_keeps_the_running_task() {
        let mut state = UiState::default();
        apply_event(
            &mut state,
            TaskEvent::Started {
                request: TaskRequest::new("/docs/a.pdf", false),
            },
        );
        apply_event(
            &mut state,
            TaskEvent::Rejected {
                reason: RejectReason::Busy,
            },
        );
        assert!(state.info_is_warning);
        assert!(state.is_running());
        assert_eq!(state.selected_name().as_deref(), Some("a.pdf"));
    }

    #[test]
    fn failure_keeps_the_message() {
        let mut state = UiState::default();
        apply_event(
            &mut state,
            TaskEvent::Started {
                request: TaskRequest::new("/docs/a.pdf", false),
            },
        );
        apply_event(
            &mut state,
            TaskEvent::Completed {
                outcome: TaskOutcome::Failed("a.pdf: bad xref".into()),
            },
        );
        assert_eq!(state.task_state, TaskState::Failed);
        assert_eq!(state.status().0, "Error: a.pdf: bad xref");
    }
}
