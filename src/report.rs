// Console transcript: one block per document, as coloured text or JSON lines.
use std::io;

use serde::Serialize;
use termcolor::{Color, ColorSpec, WriteColor};

use crate::error::DigestError;
use crate::nlp::{DocumentSummary, Keyword};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human readable transcript
    Text,
    /// One JSON object per document
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Processed,
    Unsupported,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Read,
    Extract,
    Summarize,
    Keywords,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageError {
    pub stage: Stage,
    pub message: String,
}

/// Everything the transcript shows for one input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentReport {
    pub name: String,
    pub kind: &'static str,
    pub outcome: Outcome,
    pub chars: usize,
    pub preview: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<DocumentSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<Keyword>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<StageError>,
}

impl DocumentReport {
    pub fn new(name: impl Into<String>, kind: &'static str) -> Self {
        Self {
            name: name.into(),
            kind,
            outcome: Outcome::Processed,
            chars: 0,
            preview: String::new(),
            note: None,
            summary: None,
            keywords: None,
            errors: Vec::new(),
        }
    }

    pub fn record_text(&mut self, text: &str, preview_chars: usize) {
        self.chars = text.chars().count();
        self.preview = text.chars().take(preview_chars).collect();
    }

    pub fn fail(&mut self, stage: Stage, err: &DigestError) {
        self.outcome = Outcome::Failed;
        self.errors.push(StageError {
            stage,
            message: err.to_string(),
        });
    }
}

pub struct Report<W> {
    out: W,
    format: OutputFormat,
}

impl<W: WriteColor> Report<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn write(&mut self, report: &DocumentReport) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, report)?;
                writeln!(self.out)?;
            }
            OutputFormat::Text => self.write_text(report)?,
        }
        self.out.flush()
    }

    fn write_text(&mut self, report: &DocumentReport) -> io::Result<()> {
        self.heading(&format!("\n--- Processing: {}", report.name))?;

        if report.outcome == Outcome::Unsupported {
            self.colored(Color::Yellow, &format!("Unsupported file type: {}", report.name))?;
            return Ok(());
        }

        let extracted = report.errors.iter().all(|e| {
            !matches!(e.stage, Stage::Read | Stage::Extract)
        });
        if extracted {
            writeln!(self.out, "Extracted characters: {}", report.chars)?;
            self.heading(&format!("\n--- Preview (first {} chars) ---\n", report.preview.chars().count()))?;
            writeln!(self.out, "{}", report.preview)?;
        }

        if let Some(note) = &report.note {
            self.colored(Color::Yellow, note)?;
        }

        if let Some(summary) = &report.summary {
            self.heading("\n SUMMARY \n")?;
            writeln!(self.out, "{}", summary.text())?;
            if summary.was_chunked() {
                writeln!(
                    self.out,
                    "(merged from {} partial summaries{})",
                    summary.partials.len(),
                    if summary.merged_truncated { ", truncated" } else { "" }
                )?;
            }
        }

        if let Some(keywords) = &report.keywords {
            self.heading("\n KEYWORDS \n")?;
            for keyword in keywords {
                writeln!(self.out, "{} ({:.4})", keyword.phrase, keyword.score)?;
            }
        }

        for error in &report.errors {
            self.colored(Color::Red, &format!("error: {}", error.message))?;
        }
        Ok(())
    }

    fn heading(&mut self, text: &str) -> io::Result<()> {
        self.out
            .set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
        writeln!(self.out, "{}", text)?;
        self.out.reset()
    }

    fn colored(&mut self, color: Color, text: &str) -> io::Result<()> {
        self.out.set_color(ColorSpec::new().set_fg(Some(color)))?;
        writeln!(self.out, "{}", text)?;
        self.out.reset()
    }
}
