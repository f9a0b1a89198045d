//! Token-budget enforcement across documents that share one budget.
//!
//! [`ContentTrimmer::trim`] counts the tokens of all text fields joined by
//! single spaces. Within budget, the documents come back unchanged. Over
//! budget, each text is cut to `max_tokens / len` **characters** and `"..."`
//! is appended. The character cut is an approximation of the token budget and
//! is kept exactly so runs stay comparable with historical experiments.

use crate::Record;
use crate::error::{Error, Result};
use std::sync::{Arc, OnceLock};
use tiktoken_rs::CoreBPE;
use tracing::debug;

/// Default characters per token for the estimating counter.
pub const DEFAULT_CHARS_PER_TOKEN: f64 = 3.5;

/// Suffix appended to every cut text.
pub const ELLIPSIS: &str = "...";

/// Counts tokens in a string.
pub trait TokenCount: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// Exact counter using the `cl100k_base` encoding (the `gpt-3.5-turbo`
/// tokenizer). The encoding is loaded once per process.
#[derive(Clone, Copy)]
pub struct Cl100kCounter {
    bpe: &'static CoreBPE,
}

impl Cl100kCounter {
    pub fn new() -> Result<Self> {
        static BPE: OnceLock<CoreBPE> = OnceLock::new();
        if let Some(bpe) = BPE.get() {
            return Ok(Self { bpe });
        }
        let loaded = tiktoken_rs::cl100k_base()
            .map_err(|e| Error::configuration(format!("failed to load cl100k_base: {e}")))?;
        let _ = BPE.set(loaded);
        BPE.get()
            .map(|bpe| Self { bpe })
            .ok_or_else(|| Error::configuration("cl100k_base tokenizer unavailable"))
    }
}

impl std::fmt::Debug for Cl100kCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Cl100kCounter")
    }
}

impl TokenCount for Cl100kCounter {
    /// Special-token markup such as `<|endoftext|>` is counted as plain text.
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

/// Estimating counter: `ceil(chars / chars_per_token)`.
///
/// Useful offline and in tests where exact counts don't matter.
#[derive(Debug, Clone, Copy)]
pub struct CharRatioCounter {
    chars_per_token: f64,
}

impl CharRatioCounter {
    pub fn new(chars_per_token: f64) -> Self {
        Self { chars_per_token }
    }
}

impl Default for CharRatioCounter {
    fn default() -> Self {
        Self::new(DEFAULT_CHARS_PER_TOKEN)
    }
}

impl TokenCount for CharRatioCounter {
    fn count(&self, text: &str) -> usize {
        (text.chars().count() as f64 / self.chars_per_token).ceil() as usize
    }
}

/// Applies a shared token budget to a list of documents.
#[derive(Clone)]
pub struct ContentTrimmer {
    counter: Arc<dyn TokenCount>,
}

impl std::fmt::Debug for ContentTrimmer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentTrimmer").finish_non_exhaustive()
    }
}

impl ContentTrimmer {
    pub fn new(counter: Arc<dyn TokenCount>) -> Self {
        Self { counter }
    }

    /// Trimmer backed by the exact `cl100k_base` counter.
    pub fn cl100k() -> Result<Self> {
        Ok(Self::new(Arc::new(Cl100kCounter::new()?)))
    }

    pub fn counter(&self) -> &dyn TokenCount {
        self.counter.as_ref()
    }

    /// Fit the `text_key` fields of `documents` into `max_tokens`.
    ///
    /// Every document must carry `text_key`; one that doesn't is
    /// [`Error::MalformedInput`] and no document is changed.
    pub fn trim(
        &self,
        documents: Vec<Record>,
        max_tokens: usize,
        text_key: &str,
    ) -> Result<Vec<Record>> {
        if documents.is_empty() {
            return Ok(documents);
        }

        let mut texts: Vec<&str> = Vec::with_capacity(documents.len());
        for (i, doc) in documents.iter().enumerate() {
            let text = doc.get(text_key).ok_or_else(|| {
                Error::malformed(format!("document {i} has no '{text_key}' field"))
            })?;
            texts.push(text);
        }

        let total = self.counter.count(&texts.join(" "));
        if total <= max_tokens {
            return Ok(documents);
        }

        let per_document = max_tokens / documents.len();
        debug!(
            "[trim] {total} tokens over budget {max_tokens}; cutting {} '{text_key}' fields to {per_document} chars",
            documents.len()
        );

        Ok(documents
            .into_iter()
            .map(|mut doc| {
                if let Some(text) = doc.get_mut(text_key) {
                    let mut cut: String = text.chars().take(per_document).collect();
                    cut.push_str(ELLIPSIS);
                    *text = cut;
                }
                doc
            })
            .collect())
    }
}
