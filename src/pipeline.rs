//! Extraction + counting for a single request.
//!
//! A file request counts one document. A folder request counts every supported document
//! directly inside the folder, in file name order, and optionally writes the CSV summary
//! once all of them succeeded. The first failing document aborts the batch.

use crate::error::{CountError, ExtractError};
use crate::extract::{DocumentKind, TextExtractor};
use crate::model::{display_name, FileTokens, TaskMode, TaskReport, TaskRequest};
use crate::summary;
use crate::tokens::TokenCounter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Progress notification for one finished document: (file, done, total).
pub type FileProgress<'a> = &'a mut dyn FnMut(&FileTokens, usize, usize);

#[derive(Clone)]
pub struct Pipeline {
    extractor: Arc<dyn TextExtractor>,
    counter: Arc<dyn TokenCounter>,
    summary_file_name: String,
}

impl Pipeline {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        counter: Arc<dyn TokenCounter>,
        summary_file_name: impl Into<String>,
    ) -> Self {
        Self {
            extractor,
            counter,
            summary_file_name: summary_file_name.into(),
        }
    }

    /// Tokenizer profile used for every count.
    pub fn model(&self) -> &str {
        self.counter.profile()
    }

    pub fn count_file(&self, path: &Path) -> Result<usize, CountError> {
        let text = self
            .extractor
            .extract(path)
            .map_err(|source| CountError::Extract {
                path: path.to_path_buf(),
                source,
            })?;
        let tokens = self.counter.count(&text);
        debug!(path = %path.display(), chars = text.len(), tokens, "counted");
        Ok(tokens)
    }

    pub fn run(
        &self,
        request: &TaskRequest,
        on_file: FileProgress<'_>,
    ) -> Result<TaskReport, CountError> {
        let started = Instant::now();
        let mode = request.mode().ok_or_else(|| CountError::Extract {
            path: request.path.clone(),
            source: ExtractError::Unsupported(request.path.clone()),
        })?;

        let (files, summary_path) = match mode {
            TaskMode::File(_) => {
                let tokens = self.count_file(&request.path)?;
                let file = FileTokens {
                    name: request.display_name(),
                    tokens,
                };
                on_file(&file, 1, 1);
                (vec![file], None)
            }
            TaskMode::Folder => self.run_folder(request, on_file)?,
        };

        let total_tokens = files.iter().map(|f| f.tokens).sum();
        info!(
            path = %request.path.display(),
            files = files.len(),
            total_tokens,
            "task finished"
        );
        Ok(TaskReport {
            timestamp_utc: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| "now".into()),
            path: request.path.clone(),
            mode,
            model: self.model().to_string(),
            total_tokens,
            files,
            summary_path,
            elapsed: started.elapsed(),
        })
    }

    fn run_folder(
        &self,
        request: &TaskRequest,
        on_file: FileProgress<'_>,
    ) -> Result<(Vec<FileTokens>, Option<PathBuf>), CountError> {
        let entries = supported_entries(&request.path)?;
        let total = entries.len();
        info!(path = %request.path.display(), total, "counting folder");

        let mut files = Vec::with_capacity(total);
        let mut running_total = 0usize;
        for (i, entry) in entries.iter().enumerate() {
            let tokens = self.count_file(entry)?;
            running_total += tokens;
            let file = FileTokens {
                name: display_name(entry),
                tokens,
            };
            debug!(file = %file.name, tokens, running_total, "folder entry counted");
            on_file(&file, i + 1, total);
            files.push(file);
        }

        let summary_path = if request.write_summary {
            let path = request.path.join(&self.summary_file_name);
            summary::write_summary(&path, &files)?;
            Some(path)
        } else {
            None
        };
        Ok((files, summary_path))
    }
}

/// Supported documents directly inside `dir`, sorted by file name.
pub fn supported_entries(dir: &Path) -> Result<Vec<PathBuf>, CountError> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| CountError::Scan {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && DocumentKind::from_path(entry.path()).is_some() {
            entries.push(entry.into_path());
        }
    }
    Ok(entries)
}
