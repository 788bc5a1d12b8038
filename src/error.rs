// Error kinds surfaced by the digest pipeline.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DigestError {
    /// An input path could not be read from disk.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Bytes could not be turned into text (invalid UTF-8, unparsable PDF).
    #[error("failed to decode {name}: {reason}")]
    Decoding { name: String, reason: String },
    /// The summarization backend could not be initialized.
    #[error("summarization model '{model}' is unavailable: {reason}")]
    ModelUnavailable { model: String, reason: String },
    /// A single summarization call failed.
    #[error("summarization failed: {0}")]
    Summarization(String),
    #[error("keyword extraction failed: {0}")]
    KeywordExtraction(String),
}

impl DigestError {
    /// Fatal errors stop the whole run; every later document would fail the same way.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DigestError::ModelUnavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, DigestError>;
