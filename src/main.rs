// docdigest: summarize PDF and text documents and extract their keywords, one at a time.
use std::io::IsTerminal;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use termcolor::{ColorChoice, StandardStream};
use tracing::{debug, info};

mod config;
mod driver;
mod error;
mod ingest;
mod logging;
mod nlp;
mod report;

use config::{Cli, Config};
use driver::{Pipeline, RunTally};
use ingest::{collect_inputs, Upload};
use nlp::{KeywordExtractor, SummarizationEngine};
use report::{OutputFormat, Report};

fn run(config: Config) -> Result<RunTally> {
    let engine = SummarizationEngine::new(config.engine.clone());
    let keywords = KeywordExtractor::new(config.keywords.clone());
    let pipeline = Pipeline {
        engine: &engine,
        policy: config.policy,
        keywords: &keywords,
        max_keywords: config.max_keywords,
        preview_chars: config.preview_chars,
        show_progress: config.show_progress && std::io::stderr().is_terminal(),
    };

    let color = if config.format == OutputFormat::Text && std::io::stdout().is_terminal() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut report = Report::new(StandardStream::stdout(color), config.format);

    let inputs = collect_inputs(&config.inputs);
    info!(
        inputs = inputs.len(),
        backend = ?config.engine.backend,
        "Starting run"
    );
    let uploads = inputs
        .into_iter()
        .map(|input| input.and_then(|path| Upload::read(&path)));
    let tally = driver::run(uploads, &pipeline, &mut report)?;
    debug!(model_loaded = engine.is_loaded(), "Run complete");
    Ok(tally)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    let config = match Config::from_cli(cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {:#}", err);
            return ExitCode::from(2);
        }
    };
    debug!(?config, "Resolved configuration");

    match run(config) {
        Ok(tally) if tally.failed == 0 => ExitCode::SUCCESS,
        Ok(tally) => {
            eprintln!("{} document(s) failed", tally.failed);
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(2)
        }
    }
}
