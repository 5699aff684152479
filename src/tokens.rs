//! Token counting collaborators.
//!
//! `TokenCounter` is the seam between the pipeline and the tokenizer. The production
//! implementation wraps a tiktoken BPE loaded once at startup for a named model profile.

use crate::error::CountError;
use std::sync::Arc;
use tiktoken_rs::CoreBPE;
use tracing::debug;

/// Default model profile; resolves to the cl100k_base encoding.
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Profile name selecting the whitespace approximation instead of a BPE.
pub const WHITESPACE_PROFILE: &str = "whitespace";

pub trait TokenCounter: Send + Sync {
    /// Number of tokens `text` would consume.
    fn count(&self, text: &str) -> usize;

    /// Name shown to the user next to the total.
    fn profile(&self) -> &str;
}

/// BPE counter for a fixed model profile.
pub struct TiktokenCounter {
    model: String,
    bpe: CoreBPE,
}

impl TiktokenCounter {
    pub fn for_model(model: &str) -> Result<Self, CountError> {
        let bpe = tiktoken_rs::get_bpe_from_model(model).map_err(|e| CountError::Tokenizer {
            model: model.to_string(),
            reason: e.to_string(),
        })?;
        debug!(model, "loaded tokenizer");
        Ok(Self {
            model: model.to_string(),
            bpe,
        })
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, text: &str) -> usize {
        // Special-token markers in documents are counted as ordinary text.
        self.bpe.encode_ordinary(text).len()
    }

    fn profile(&self) -> &str {
        &self.model
    }
}

/// Whitespace word count. Cheap stand-in where BPE accuracy does not matter.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceCounter;

impl TokenCounter for WhitespaceCounter {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }

    fn profile(&self) -> &str {
        WHITESPACE_PROFILE
    }
}

/// Resolve a profile name to a counter.
pub fn counter_for(model: &str) -> Result<Arc<dyn TokenCounter>, CountError> {
    if model.eq_ignore_ascii_case(WHITESPACE_PROFILE) {
        return Ok(Arc::new(WhitespaceCounter));
    }
    Ok(Arc::new(TiktokenCounter::for_model(model)?))
}
