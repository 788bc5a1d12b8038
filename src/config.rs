// Command line and environment configuration.
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{ArgAction, Parser};

use crate::nlp::ollama::DEFAULT_OLLAMA_URL;
use crate::nlp::{Backend, EngineSettings, KeywordSettings, SummaryPolicy};
use crate::report::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "docdigest",
    about = "Summarize PDF and text documents and extract their keywords"
)]
pub struct Cli {
    /// Files or directories to process (directories are walked recursively)
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Summarization backend: `extractive` picks sentences offline, only `ollama` writes
    /// abstractive summaries
    #[arg(short, long, value_enum, default_value_t = Backend::Extractive, env = "DOCDIGEST_BACKEND")]
    pub backend: Backend,

    /// Model name for the ollama backend (e.g. llama3.2)
    #[arg(short = 'm', long, env = "DOCDIGEST_MODEL")]
    pub model: Option<String>,

    /// Base URL of the Ollama server
    #[arg(long, default_value = DEFAULT_OLLAMA_URL, env = "OLLAMA_URL")]
    pub ollama_url: String,

    /// Number of keywords to report per document
    #[arg(short = 'k', long, default_value_t = 12)]
    pub max_keywords: usize,

    /// Keyword language (stopword list)
    #[arg(long, default_value = "en")]
    pub language: String,

    /// Longest keyword phrase, in words
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub ngram_size: u8,

    /// Similarity at which two keyword phrases count as duplicates
    #[arg(long, default_value_t = 0.9)]
    pub dedup_threshold: f64,

    /// Characters of extracted text shown in the preview
    #[arg(long, default_value_t = 800)]
    pub preview_chars: usize,

    /// Cap on merged partial summaries before the final pass (0 = no cap)
    #[arg(long, default_value_t = 3600)]
    pub max_merged_chars: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Hide the progress spinner
    #[arg(long)]
    pub no_progress: bool,

    /// More logging (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Validated settings for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub inputs: Vec<PathBuf>,
    pub engine: EngineSettings,
    pub policy: SummaryPolicy,
    pub keywords: KeywordSettings,
    pub max_keywords: usize,
    pub preview_chars: usize,
    pub format: OutputFormat,
    pub show_progress: bool,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        if cli.backend == Backend::Ollama && cli.model.as_deref().map_or(true, |m| m.trim().is_empty()) {
            bail!("the ollama backend needs a model name (--model or DOCDIGEST_MODEL)");
        }
        if !(cli.dedup_threshold > 0.0 && cli.dedup_threshold <= 1.0) {
            bail!(
                "--dedup-threshold must be in (0, 1], got {}",
                cli.dedup_threshold
            );
        }

        let policy = SummaryPolicy {
            max_merged_chars: cli.max_merged_chars,
            ..SummaryPolicy::default()
        };

        Ok(Self {
            inputs: cli.paths,
            engine: EngineSettings {
                backend: cli.backend,
                model: cli.model.map(|m| m.trim().to_string()),
                ollama_url: cli.ollama_url,
            },
            policy,
            keywords: KeywordSettings {
                language: cli.language,
                ngram_size: usize::from(cli.ngram_size),
                dedup_threshold: cli.dedup_threshold,
            },
            max_keywords: cli.max_keywords,
            preview_chars: cli.preview_chars,
            format: cli.format,
            show_progress: !cli.no_progress && cli.format == OutputFormat::Text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["docdigest"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_match_pipeline_constants() {
        let config = Config::from_cli(parse(&["report.pdf"])).unwrap();
        assert_eq!(config.inputs, vec![PathBuf::from("report.pdf")]);
        assert_eq!(config.max_keywords, 12);
        assert_eq!(config.preview_chars, 800);
        assert_eq!(config.keywords, KeywordSettings::default());
        assert_eq!(config.policy, SummaryPolicy::default());
        assert_eq!(config.format, OutputFormat::Text);
    }

    #[test]
    fn test_paths_are_required() {
        assert!(Cli::try_parse_from(["docdigest"]).is_err());
    }

    #[test]
    fn test_ollama_requires_model() {
        let cli = parse(&["--backend", "ollama", "--model", "  ", "a.txt"]);
        assert!(Config::from_cli(cli).is_err());

        let cli = parse(&["--backend", "ollama", "--model", "llama3.2", "a.txt"]);
        let config = Config::from_cli(cli).unwrap();
        assert_eq!(config.engine.backend, Backend::Ollama);
        assert_eq!(config.engine.model.as_deref(), Some("llama3.2"));
    }

    #[test]
    fn test_dedup_threshold_is_validated() {
        let cli = parse(&["--dedup-threshold", "1.5", "a.txt"]);
        assert!(Config::from_cli(cli).is_err());
    }

    #[test]
    fn test_ngram_size_range() {
        assert!(Cli::try_parse_from(["docdigest", "--ngram-size", "0", "a.txt"]).is_err());
        let config = Config::from_cli(parse(&["--ngram-size", "2", "a.txt"])).unwrap();
        assert_eq!(config.keywords.ngram_size, 2);
    }

    #[test]
    fn test_json_output_hides_progress() {
        let config = Config::from_cli(parse(&["--format", "json", "a.txt"])).unwrap();
        assert!(!config.show_progress);
    }

    #[test]
    fn test_backend_help_names_the_abstractive_backend() {
        let command = Cli::command();
        let backend = command
            .get_arguments()
            .find(|arg| arg.get_id() == "backend")
            .unwrap();
        let help = backend.get_help().unwrap().to_string();
        assert!(help.contains("only `ollama` writes"), "{}", help);
    }

    #[test]
    fn test_verbosity_counts() {
        assert_eq!(parse(&["-vv", "a.txt"]).verbose, 2);
    }
}
