//! Per-format text extraction.
//!
//! Each supported document kind has its own module producing plain text. The
//! `TextExtractor` trait is what the pipeline depends on, so tests can swap in
//! a fake without building real office documents.

mod docx;
mod ooxml;
mod pdf;
mod pptx;
mod xlsx;

use crate::error::ExtractError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Extensions accepted by the picker and by folder scans.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["pdf", "docx", "xlsx", "pptx"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Xlsx,
    Pptx,
}

impl DocumentKind {
    /// Classify a path by its extension (case-insensitive). `None` means unsupported.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            "xlsx" => Some(DocumentKind::Xlsx),
            "pptx" => Some(DocumentKind::Pptx),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "PDF",
            DocumentKind::Docx => "DOCX",
            DocumentKind::Xlsx => "XLSX",
            DocumentKind::Pptx => "PPTX",
        }
    }
}

pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String, ExtractError>;
}

/// Dispatches to the format-specific readers.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfficeExtractor;

impl TextExtractor for OfficeExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let kind = DocumentKind::from_path(path)
            .ok_or_else(|| ExtractError::Unsupported(path.to_path_buf()))?;
        debug!(path = %path.display(), ?kind, "extracting text");
        match kind {
            DocumentKind::Pdf => pdf::extract_text(path),
            DocumentKind::Docx => docx::extract_text(path),
            DocumentKind::Xlsx => xlsx::extract_text(path),
            DocumentKind::Pptx => pptx::extract_text(path),
        }
    }
}
