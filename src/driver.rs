// Sequential document pipeline: extract, summarize, extract keywords, report.
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use termcolor::WriteColor;
use tracing::{info, warn};

use crate::error::{self, DigestError};
use crate::ingest::{Document, Upload};
use crate::nlp::{DocumentSummary, HierarchicalSummarizer, KeywordExtractor, Summarizer, SummaryPolicy};
use crate::report::{DocumentReport, Outcome, Report, Stage};

/// The collaborators and knobs shared by every document of a run.
pub struct Pipeline<'a> {
    pub engine: &'a dyn Summarizer,
    pub policy: SummaryPolicy,
    pub keywords: &'a KeywordExtractor,
    pub max_keywords: usize,
    pub preview_chars: usize,
    pub show_progress: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunTally {
    pub processed: usize,
    pub unsupported: usize,
    pub failed: usize,
}

impl<'a> Pipeline<'a> {
    fn spinner(&self, name: &str) -> Result<ProgressBar> {
        if !self.show_progress {
            return Ok(ProgressBar::hidden());
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")?);
        pb.set_message(format!("summarizing {}", name));
        pb.enable_steady_tick(Duration::from_millis(120));
        Ok(pb)
    }

    fn summarize(&self, name: &str, text: &str) -> Result<error::Result<DocumentSummary>> {
        let pb = self.spinner(name)?;
        let summarizer = HierarchicalSummarizer::new(self.engine, self.policy).on_chunk(|index, total| {
            pb.set_message(format!("summarizing {} (chunk {}/{})", name, index + 1, total));
        });
        let summary = summarizer.summarize_document(text);
        pb.finish_and_clear();
        Ok(summary)
    }
}

/// Process every upload in order, one at a time.
///
/// Unsupported and broken inputs are reported and skipped. An unavailable model aborts the run
/// with the underlying [`DigestError`].
pub fn run<W, I>(uploads: I, pipeline: &Pipeline, report: &mut Report<W>) -> Result<RunTally>
where
    W: WriteColor,
    I: IntoIterator<Item = error::Result<Upload>>,
{
    let mut tally = RunTally::default();

    for upload in uploads {
        let upload = match upload {
            Ok(upload) => upload,
            Err(err) => {
                warn!(error = %err, "Skipping unreadable input");
                let name = match &err {
                    DigestError::Io { path, .. } => path.display().to_string(),
                    _ => "<input>".to_string(),
                };
                let mut doc_report = DocumentReport::new(name, "unknown");
                doc_report.fail(Stage::Read, &err);
                tally.failed += 1;
                report.write(&doc_report)?;
                continue;
            }
        };

        let document = Document::classify(upload);
        let Processed { report: doc_report, fatal } = process_document(&document, pipeline)?;
        match doc_report.outcome {
            Outcome::Processed => tally.processed += 1,
            Outcome::Unsupported => tally.unsupported += 1,
            Outcome::Failed => tally.failed += 1,
        }
        report.write(&doc_report)?;
        if let Some(err) = fatal {
            tracing::error!(error = %err, "Aborting run");
            return Err(err.into());
        }
    }

    info!(
        processed = tally.processed,
        unsupported = tally.unsupported,
        failed = tally.failed,
        "Run finished"
    );
    Ok(tally)
}

struct Processed {
    report: DocumentReport,
    fatal: Option<DigestError>,
}

fn process_document(document: &Document, pipeline: &Pipeline) -> Result<Processed> {
    let name = document.name();
    let mut report = DocumentReport::new(name, document.kind());

    let text = match document.extract_text() {
        None => {
            info!(name, "Unsupported file type");
            report.outcome = Outcome::Unsupported;
            return Ok(Processed { report, fatal: None });
        }
        Some(Err(err)) => {
            warn!(name, error = %err, "Text extraction failed");
            report.fail(Stage::Extract, &err);
            return Ok(Processed { report, fatal: None });
        }
        Some(Ok(text)) => text,
    };

    report.record_text(&text, pipeline.preview_chars);
    info!(name, chars = report.chars, "Extracted text");

    if text.trim().is_empty() {
        report.note = Some("No extractable text; skipping summary and keywords.".to_string());
        return Ok(Processed { report, fatal: None });
    }

    match pipeline.summarize(name, &text)? {
        Ok(summary) => report.summary = Some(summary),
        Err(err) if err.is_fatal() => {
            report.fail(Stage::Summarize, &err);
            return Ok(Processed {
                report,
                fatal: Some(err),
            });
        }
        Err(err) => {
            warn!(name, error = %err, "Summarization failed");
            report.fail(Stage::Summarize, &err);
        }
    }

    match pipeline.keywords.extract(&text, pipeline.max_keywords) {
        Ok(keywords) => report.keywords = Some(keywords),
        Err(err) => {
            warn!(name, error = %err, "Keyword extraction failed");
            report.fail(Stage::Keywords, &err);
        }
    }

    Ok(Processed { report, fatal: None })
}
