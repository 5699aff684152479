//! PDF documents: page text concatenated in page order.

use crate::error::ExtractError;
use lopdf::Document;
use std::path::Path;
use tracing::debug;

pub(crate) fn extract_text(path: &Path) -> Result<String, ExtractError> {
    let doc = Document::load(path)?;
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    debug!(path = %path.display(), pages = pages.len(), "reading pdf");

    let mut text = String::new();
    for page in pages {
        text.push_str(&doc.extract_text(&[page])?);
    }
    Ok(text)
}
