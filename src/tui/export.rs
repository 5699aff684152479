use anyhow::Result;
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::warn;

use super::state::UiState;

// Global clipboard manager channel - initialized once on first use
static CLIPBOARD_SENDER: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

/// Export the last report into the current directory and show where it went.
pub fn export_last_report(state: &mut UiState) {
    let Some(report) = state.last_report.as_ref() else {
        state.set_warning("No completed count to export yet.");
        return;
    };
    match crate::storage::export_to_current_dir(report) {
        Ok(p) => state.set_info(format!("Exported JSON: {}", p.display())),
        Err(e) => {
            warn!("JSON export failed: {e:#}");
            state.set_warning(format!("JSON export failed: {e:#}"));
        }
    }
}

/// Put the last total on the clipboard.
pub fn copy_last_total(state: &mut UiState) {
    let Some(total) = state.last_report.as_ref().map(|r| r.total_tokens) else {
        state.set_warning("No total to copy yet.");
        return;
    };
    match copy_to_clipboard(&total.to_string()) {
        Ok(()) => state.set_info(format!("✓ Copied to clipboard: {total}")),
        Err(e) => state.set_warning(format!("Clipboard copy failed: {e:#}")),
    }
}

/// Initialize the clipboard manager thread if not already initialized.
/// This creates a background thread that processes clipboard operations sequentially,
/// keeping each clipboard instance alive for a sufficient duration.
fn init_clipboard_manager() -> Result<&'static std_mpsc::Sender<String>> {
    CLIPBOARD_SENDER.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();

        std::thread::spawn(move || {
            use arboard::Clipboard;

            for text in rx {
                if let Ok(mut clipboard) = Clipboard::new() {
                    // Clipboard managers on Linux read lazily; keep the owner alive briefly.
                    if clipboard.set_text(&text).is_ok() {
                        std::thread::sleep(Duration::from_secs(2));
                    }
                }
            }
        });

        tx
    });

    CLIPBOARD_SENDER
        .get()
        .ok_or_else(|| anyhow::anyhow!("Failed to initialize clipboard manager"))
}

/// Queue `text` for the clipboard thread without blocking the UI.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let sender = init_clipboard_manager()?;
    sender
        .send(text.to_string())
        .map_err(|_| anyhow::anyhow!("Clipboard manager channel closed"))?;
    Ok(())
}
