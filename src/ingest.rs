// Document intake: gather input files, classify them once and extract their text.
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{DigestError, Result};

/// A named blob of bytes handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|source| DigestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(path.display().to_string(), bytes))
    }
}

/// Expand directories (recursively, sorted, following symlinks) and keep plain paths in the
/// order given.
///
/// Directory entries that cannot be walked come back as `Io` errors so the run reports them.
pub fn collect_inputs(paths: &[PathBuf]) -> Vec<Result<PathBuf>> {
    let mut inputs = Vec::new();
    for path in paths {
        if !path.is_dir() {
            inputs.push(Ok(path.clone()));
            continue;
        }

        let mut files = Vec::new();
        let mut failures = Vec::new();
        for entry in WalkDir::new(path).follow_links(true) {
            match entry {
                Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
                Ok(_) => {}
                Err(err) => {
                    warn!(error = %err, "Unreadable directory entry");
                    let entry_path = err.path().unwrap_or(path.as_path()).to_path_buf();
                    failures.push(DigestError::Io {
                        path: entry_path,
                        source: err.into(),
                    });
                }
            }
        }
        files.sort();
        debug!(
            dir = %path.display(),
            files = files.len(),
            failures = failures.len(),
            "Expanded input directory"
        );
        inputs.extend(files.into_iter().map(Ok));
        inputs.extend(failures.into_iter().map(Err));
    }
    inputs
}

/// An upload classified by its file name, decided once at intake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Document {
    Pdf(Upload),
    Text(Upload),
    Unsupported(Upload),
}

impl Document {
    /// Classify by case-insensitive suffix: `.pdf` or `.txt`, anything else is unsupported.
    pub fn classify(upload: Upload) -> Self {
        let lower = upload.name.to_lowercase();
        if lower.ends_with(".pdf") {
            Document::Pdf(upload)
        } else if lower.ends_with(".txt") {
            Document::Text(upload)
        } else {
            Document::Unsupported(upload)
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Document::Pdf(u) | Document::Text(u) | Document::Unsupported(u) => &u.name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Document::Pdf(_) => "pdf",
            Document::Text(_) => "txt",
            Document::Unsupported(_) => "unsupported",
        }
    }

    /// Extracted text, or `None` when the document type is not supported.
    ///
    /// A document without any extractable text (a scanned PDF) yields an empty string.
    pub fn extract_text(&self) -> Option<Result<String>> {
        match self {
            Document::Pdf(upload) => Some(extract_pdf(upload)),
            Document::Text(upload) => Some(decode_utf8(upload)),
            Document::Unsupported(_) => None,
        }
    }
}

fn extract_pdf(upload: &Upload) -> Result<String> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(&upload.bytes).map_err(|e| {
        DigestError::Decoding {
            name: upload.name.clone(),
            reason: format!("PDF extraction failed: {}", e),
        }
    })?;

    let text = join_pages(&pages);
    debug!(
        name = %upload.name,
        pages = pages.len(),
        chars = text.chars().count(),
        "Extracted PDF text"
    );
    Ok(text)
}

/// Concatenate page texts, each followed by `\n`. Pages with no visible text are skipped.
fn join_pages(pages: &[String]) -> String {
    let mut text = String::new();
    for page in pages {
        // image-only pages have no text layer
        if page.trim().is_empty() {
            continue;
        }
        text.push_str(page);
        text.push('\n');
    }
    text
}

fn decode_utf8(upload: &Upload) -> Result<String> {
    let text = std::str::from_utf8(&upload.bytes).map_err(|e| DigestError::Decoding {
        name: upload.name.clone(),
        reason: format!("invalid UTF-8 at byte {}", e.valid_up_to()),
    })?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
}
