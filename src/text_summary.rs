//! Text summary builder for CLI output.
//!
//! Formats a finished task report as human-readable lines for text mode.

use crate::model::{TaskMode, TaskReport};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

pub(crate) fn mode_label(mode: TaskMode) -> String {
    match mode {
        TaskMode::File(kind) => format!("file ({})", kind.label()),
        TaskMode::Folder => "folder".to_string(),
    }
}

/// Build a text summary from a successful report.
pub(crate) fn build_text_summary(report: &TaskReport) -> TextSummary {
    let mut lines = Vec::new();

    lines.push(format!("Path: {}", report.path.display()));
    lines.push(format!("Mode: {}", mode_label(report.mode)));
    lines.push(format!("Model: {}", report.model));

    if report.mode == TaskMode::Folder {
        if report.files.is_empty() {
            lines.push("No supported files found.".to_string());
        }
        let width = report
            .files
            .iter()
            .map(|f| f.name.chars().count())
            .max()
            .unwrap_or(0);
        for file in &report.files {
            lines.push(format!("  {:<width$}  {}", file.name, file.tokens));
        }
    }

    lines.push(format!("Total tokens: {}", report.total_tokens));
    if let Some(summary) = report.summary_path.as_deref() {
        lines.push(format!("Summary: {}", summary.display()));
    }
    lines.push(format!(
        "Elapsed: {}",
        humantime::format_duration(std::time::Duration::from_millis(
            report.elapsed.as_millis() as u64
        ))
    ));

    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::DocumentKind;
    use crate::model::FileTokens;
    use std::time::Duration;

    fn report(mode: TaskMode, files: Vec<FileTokens>) -> TaskReport {
        TaskReport {
            timestamp_utc: String::new(),
            path: "/docs".into(),
            mode,
            model: "gpt-4".into(),
            total_tokens: files.iter().map(|f| f.tokens).sum(),
            files,
            summary_path: None,
            elapsed: Duration::from_micros(1_250_400),
        }
    }

    #[test]
    fn single_file_has_no_per_file_table() {
        let r = report(
            TaskMode::File(DocumentKind::Pdf),
            vec![FileTokens {
                name: "a.pdf".into(),
                tokens: 42,
            }],
        );
        let lines = build_text_summary(&r).lines;
        assert_eq!(
            lines,
            vec![
                "Path: /docs",
                "Mode: file (PDF)",
                "Model: gpt-4",
                "Total tokens: 42",
                "Elapsed: 1s 250ms",
            ]
        );
    }

    #[test]
    fn folder_lists_each_file_aligned() {
        let mut r = report(
            TaskMode::Folder,
            vec![
                FileTokens {
                    name: "a.pdf".into(),
                    tokens: 1,
                },
                FileTokens {
                    name: "longer.docx".into(),
                    tokens: 20,
                },
            ],
        );
        r.summary_path = Some("/docs/token_counts.csv".into());
        let lines = build_text_summary(&r).lines;
        assert!(lines.contains(&"  a.pdf        1".to_string()));
        assert!(lines.contains(&"  longer.docx  20".to_string()));
        assert!(lines.contains(&"Total tokens: 21".to_string()));
        assert!(lines.contains(&"Summary: /docs/token_counts.csv".to_string()));
    }

    #[test]
    fn empty_folder_says_so() {
        let lines = build_text_summary(&report(TaskMode::Folder, vec![])).lines;
        assert!(lines.contains(&"No supported files found.".to_string()));
        assert!(lines.contains(&"Total tokens: 0".to_string()));
    }
}
