//! Error types for extraction and counting.
//!
//! Extraction errors describe what went wrong inside a single document; count errors
//! wrap them with the file they belong to so that a failed task can name the culprit.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while pulling plain text out of one document.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The path does not carry one of the supported extensions.
    #[error("Unsupported file type: {0}")]
    Unsupported(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// DOCX and PPTX files are zip containers.
    #[error("Invalid document container: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Malformed document XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::XlsxError),

    /// A part every valid container must have is absent.
    #[error("Missing document part: {0}")]
    MissingPart(String),
}

/// Failure of a whole counting task.
#[derive(Debug, Error)]
pub enum CountError {
    #[error("{}: {source}", path.display())]
    Extract {
        path: PathBuf,
        #[source]
        source: ExtractError,
    },

    #[error("Failed to read folder {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to write summary {}: {source}", path.display())]
    Summary {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Tokenizer unavailable for model '{model}': {reason}")]
    Tokenizer { model: String, reason: String },
}
