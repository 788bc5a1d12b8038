// Two-level summarization: summarize each chunk, then summarize the joined partial summaries.
//
// Both passes are lossy. Low-salience sentences are dropped once per chunk and again when the
// partials are merged.
use serde::Serialize;
use tracing::{debug, info, warn};

use super::chunking::{char_len, TextChunker};
use super::summarization::{LengthBounds, Summarizer};
use crate::error::{DigestError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryKind {
    Partial,
    Final,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub kind: SummaryKind,
    pub text: String,
}

impl Summary {
    fn partial(text: String) -> Self {
        Self {
            kind: SummaryKind::Partial,
            text,
        }
    }

    fn final_(text: String) -> Self {
        Self {
            kind: SummaryKind::Final,
            text,
        }
    }
}

/// The final summary of one document and the partial summaries it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    pub summary: Summary,
    pub partials: Vec<Summary>,
    /// Whether the merged partials were cut before the final pass.
    pub merged_truncated: bool,
}

impl DocumentSummary {
    pub fn text(&self) -> &str {
        &self.summary.text
    }

    pub fn was_chunked(&self) -> bool {
        !self.partials.is_empty()
    }
}

/// Thresholds and length bounds for the two passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryPolicy {
    /// Documents shorter than this (in chars) are summarized in one call.
    pub chunking_threshold: usize,
    pub chunker: TextChunker,
    pub chunk_bounds: LengthBounds,
    pub final_bounds: LengthBounds,
    /// Cap on the merged partials fed to the final pass; 0 disables the cap.
    pub max_merged_chars: usize,
}

impl Default for SummaryPolicy {
    fn default() -> Self {
        Self {
            chunking_threshold: 1200,
            chunker: TextChunker::new(1000, 200),
            chunk_bounds: LengthBounds::new(30, 150),
            final_bounds: LengthBounds::new(50, 180),
            max_merged_chars: 3600,
        }
    }
}

type ChunkObserver<'a> = Box<dyn Fn(usize, usize) + 'a>;

pub struct HierarchicalSummarizer<'a> {
    engine: &'a dyn Summarizer,
    policy: SummaryPolicy,
    on_chunk: Option<ChunkObserver<'a>>,
}

impl<'a> HierarchicalSummarizer<'a> {
    pub fn new(engine: &'a dyn Summarizer, policy: SummaryPolicy) -> Self {
        Self {
            engine,
            policy,
            on_chunk: None,
        }
    }

    /// Call `observer(index, total)` before each chunk is summarized.
    pub fn on_chunk(mut self, observer: impl Fn(usize, usize) + 'a) -> Self {
        self.on_chunk = Some(Box::new(observer));
        self
    }

    /// Summarize a whole document. Any failing call fails the document.
    pub fn summarize_document(&self, text: &str) -> Result<DocumentSummary> {
        let chars = char_len(text);
        if chars < self.policy.chunking_threshold {
            debug!(chars, "Summarizing document in a single pass");
            let summary = self.engine.summarize(text, self.policy.chunk_bounds)?;
            return Ok(DocumentSummary {
                summary: Summary::final_(summary),
                partials: Vec::new(),
                merged_truncated: false,
            });
        }

        let chunks = self.policy.chunker.chunk(text);
        if chunks.is_empty() {
            return Err(DigestError::Summarization(
                "document has no sentences to summarize".to_string(),
            ));
        }
        info!(chars, chunks = chunks.len(), "Summarizing document in chunks");

        let mut partials = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.iter().enumerate() {
            if let Some(observer) = &self.on_chunk {
                observer(index, chunks.len());
            }
            debug!(
                chunk = index,
                chars = chunk.char_len(),
                overlap_chars = char_len(chunk.overlap()),
                body_chars = char_len(chunk.body()),
                "Summarizing chunk"
            );
            let partial = self.engine.summarize(chunk.as_str(), self.policy.chunk_bounds)?;
            partials.push(Summary::partial(partial));
        }

        let merged = partials
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let (merged_input, merged_truncated) = cap_merged(&merged, self.policy.max_merged_chars);
        if merged_truncated {
            warn!(
                merged_chars = char_len(&merged),
                kept_chars = char_len(merged_input),
                "Merged partial summaries exceed the final pass limit; truncating"
            );
        }

        let summary = self.engine.summarize(merged_input, self.policy.final_bounds)?;
        Ok(DocumentSummary {
            summary: Summary::final_(summary),
            partials,
            merged_truncated,
        })
    }
}

/// Cut `merged` to at most `max_chars` chars, preferring the last sentence end inside the limit.
fn cap_merged(merged: &str, max_chars: usize) -> (&str, bool) {
    if max_chars == 0 || char_len(merged) <= max_chars {
        return (merged, false);
    }

    let limit = merged
        .char_indices()
        .nth(max_chars)
        .map(|(idx, _)| idx)
        .unwrap_or(merged.len());
    let sentence_end = merged[..limit]
        .char_indices()
        .rev()
        .find(|&(idx, c)| {
            matches!(c, '.' | '!' | '?')
                && merged[idx + 1..].chars().next().map_or(true, char::is_whitespace)
        })
        .map(|(idx, _)| idx + 1);

    (&merged[..sentence_end.unwrap_or(limit)], true)
}
