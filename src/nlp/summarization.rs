// Summarization engine: one lazily loaded model behind the `Summarizer` trait.
//
// The `extractive` backend is a lightweight sentence scorer that runs offline. The `ollama`
// backend delegates to a local Ollama server for abstractive summaries.
use std::collections::{HashMap, HashSet};
use std::fmt;

use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use super::chunking::split_sentences;
use super::ollama::OllamaSummarizer;
use crate::error::{DigestError, Result};

static WORD_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-zA-Z0-9']+").unwrap());

// Common stop words ignored when scoring sentences
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "by", "for", "from",
        "has", "he", "in", "is", "it", "its", "of", "on", "that", "the",
        "to", "was", "will", "with", "this", "but", "they", "have",
        "had", "what", "when", "where", "who", "which", "why", "how"
    ].iter().copied().collect()
});

/// Requested summary length in words. Every backend treats the bounds as a word budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LengthBounds {
    pub min: usize,
    pub max: usize,
}

impl LengthBounds {
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }
}

impl fmt::Display for LengthBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.min, self.max)
    }
}

/// Anything that can turn a text into a shorter one.
pub trait Summarizer {
    fn summarize(&self, text: &str, bounds: LengthBounds) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Offline frequency-scored sentence extraction
    Extractive,
    /// Abstractive summaries from a local Ollama server
    Ollama,
}

/// Fixed once the engine is built; a different model needs a new engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub backend: Backend,
    pub model: Option<String>,
    pub ollama_url: String,
}

impl EngineSettings {
    pub fn model_name(&self) -> &str {
        match self.backend {
            Backend::Extractive => "extractive",
            Backend::Ollama => self.model.as_deref().unwrap_or("<unset>"),
        }
    }
}

/// Owns the summarization backend and loads it on first use.
///
/// Loading happens at most once even with concurrent callers. A failed load is not cached, but
/// callers treat `ModelUnavailable` as fatal anyway.
pub struct SummarizationEngine {
    settings: EngineSettings,
    model: OnceCell<Box<dyn Summarizer + Send + Sync>>,
}

impl SummarizationEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            model: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    fn model(&self) -> Result<&(dyn Summarizer + Send + Sync)> {
        let model = self.model.get_or_try_init(|| self.load())?;
        Ok(model.as_ref())
    }

    fn load(&self) -> Result<Box<dyn Summarizer + Send + Sync>> {
        info!(
            backend = ?self.settings.backend,
            model = self.settings.model_name(),
            "Loading summarization model"
        );
        match self.settings.backend {
            Backend::Extractive => Ok(Box::new(ExtractiveSummarizer)),
            Backend::Ollama => {
                let model = self.settings.model.as_deref().ok_or_else(|| {
                    DigestError::ModelUnavailable {
                        model: self.settings.model_name().to_string(),
                        reason: "no model name configured for the ollama backend".to_string(),
                    }
                })?;
                let client = OllamaSummarizer::connect(&self.settings.ollama_url, model)?;
                Ok(Box::new(client))
            }
        }
    }
}

impl Summarizer for SummarizationEngine {
    fn summarize(&self, text: &str, bounds: LengthBounds) -> Result<String> {
        self.model()?.summarize(text, bounds)
    }
}

/// Picks the highest scoring sentences until the word budget is met.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtractiveSummarizer;

impl Summarizer for ExtractiveSummarizer {
    fn summarize(&self, text: &str, bounds: LengthBounds) -> Result<String> {
        let sentences: Vec<&str> = split_sentences(text)
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        if sentences.is_empty() {
            return Err(DigestError::Summarization(
                "no content to summarize".to_string(),
            ));
        }

        let lengths: Vec<usize> = sentences.iter().map(|s| s.split_whitespace().count()).collect();
        let total_words: usize = lengths.iter().sum();
        if total_words <= bounds.min {
            return Ok(sentences.join(" "));
        }

        // aim for roughly 30% of the input, kept inside the requested bounds
        let target = (total_words * 30 / 100).max(bounds.min).min(bounds.max);
        let ranked = rank_sentences(&sentences);

        let mut picked: Vec<usize> = Vec::new();
        let mut words = 0;
        for &(idx, _) in &ranked {
            if words + lengths[idx] > bounds.max {
                continue;
            }
            picked.push(idx);
            words += lengths[idx];
            if words >= target {
                break;
            }
        }

        if picked.is_empty() {
            // every sentence is over budget: cut the best one down
            let best = sentences[ranked[0].0];
            debug!(max = bounds.max, "Truncating over-long sentence for summary");
            return Ok(truncate_words(best, bounds.max));
        }

        // keep the original reading order
        picked.sort_unstable();
        let summary: Vec<&str> = picked.iter().map(|&idx| sentences[idx]).collect();
        Ok(summary.join(" "))
    }
}

/// Score sentences by normalized word frequency, best first.
fn rank_sentences(sentences: &[&str]) -> Vec<(usize, f32)> {
    let mut word_freq: HashMap<String, usize> = HashMap::new();
    for sentence in sentences {
        for word in WORD_PATTERN.find_iter(sentence) {
            let word = word.as_str().to_lowercase();
            if word.len() > 2 && !STOP_WORDS.contains(word.as_str()) {
                *word_freq.entry(word).or_insert(0) += 1;
            }
        }
    }

    let max_freq = word_freq.values().max().copied().unwrap_or(1) as f32;

    let mut scores: Vec<(usize, f32)> = sentences
        .iter()
        .enumerate()
        .map(|(idx, sentence)| {
            let words: Vec<String> = WORD_PATTERN
                .find_iter(sentence)
                .map(|m| m.as_str().to_lowercase())
                .collect();
            let mut score: f32 = words
                .iter()
                .filter_map(|w| word_freq.get(w))
                .map(|&freq| freq as f32 / max_freq)
                .sum();
            // normalize by length so long sentences don't win by default
            if !words.is_empty() {
                score /= words.len() as f32;
            }
            // opening sentences usually carry the key information
            if idx == 0 {
                score *= 1.5;
            }
            (idx, score)
        })
        .collect();

    // stable sort keeps earlier sentences first on ties
    scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scores
}

fn truncate_words(sentence: &str, max_words: usize) -> String {
    sentence
        .split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = "Natural language processing is a field of artificial intelligence \
        that focuses on the interaction between computers and humans through natural language. \
        The ultimate objective of language processing is to read, decipher, understand, and make \
        sense of human languages in a manner that is valuable. Language processing combines \
        computational linguistics with statistical models and machine learning. Applications \
        include translation, sentiment analysis, and chatbots. Some researchers also study \
        speech. The weather was pleasant during the conference.";

    fn extractive_settings() -> EngineSettings {
        EngineSettings {
            backend: Backend::Extractive,
            model: None,
            ollama_url: "http://127.0.0.1:11434".to_string(),
        }
    }

    #[test]
    fn test_extractive_summary_is_shorter_and_in_bounds() {
        let summary = ExtractiveSummarizer
            .summarize(ARTICLE, LengthBounds::new(10, 40))
            .unwrap();
        let words = summary.split_whitespace().count();
        assert!(!summary.is_empty());
        assert!(summary.len() < ARTICLE.len());
        assert!(words <= 40, "summary has {} words", words);
    }

    #[test]
    fn test_extractive_keeps_reading_order() {
        let summary = ExtractiveSummarizer
            .summarize(ARTICLE, LengthBounds::new(10, 60))
            .unwrap();
        let positions: Vec<usize> = split_sentences(&summary)
            .iter()
            .map(|s| ARTICLE.find(s.trim()).expect("sentence comes from the input"))
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn test_extractive_prefers_topical_sentences() {
        let summary = ExtractiveSummarizer
            .summarize(ARTICLE, LengthBounds::new(10, 40))
            .unwrap();
        assert!(summary.contains("Natural language processing"));
        assert!(!summary.contains("weather"));
    }

    #[test]
    fn test_extractive_short_text_returned_whole() {
        let summary = ExtractiveSummarizer
            .summarize("This is a short text.", LengthBounds::new(30, 150))
            .unwrap();
        assert_eq!(summary, "This is a short text.");
    }

    #[test]
    fn test_extractive_truncates_single_long_sentence() {
        let sentence = format!("{} end.", "lorem ipsum".repeat(50));
        let text = format!("{} {}", sentence, sentence);
        let summary = ExtractiveSummarizer
            .summarize(&text, LengthBounds::new(5, 20))
            .unwrap();
        assert_eq!(summary.split_whitespace().count(), 20);
    }

    #[test]
    fn test_extractive_empty_text_fails() {
        let result = ExtractiveSummarizer.summarize("   ", LengthBounds::new(30, 150));
        assert!(matches!(result, Err(DigestError::Summarization(_))));
    }

    #[test]
    fn test_extractive_is_deterministic() {
        let bounds = LengthBounds::new(10, 50);
        let a = ExtractiveSummarizer.summarize(ARTICLE, bounds).unwrap();
        let b = ExtractiveSummarizer.summarize(ARTICLE, bounds).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_engine_loads_lazily_once() {
        let engine = SummarizationEngine::new(extractive_settings());
        assert!(!engine.is_loaded());

        let first = engine.summarize(ARTICLE, LengthBounds::new(10, 40)).unwrap();
        assert!(engine.is_loaded());

        let second = engine.summarize(ARTICLE, LengthBounds::new(10, 40)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_engine_loads_once_across_threads() {
        let engine = SummarizationEngine::new(extractive_settings());
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    engine.summarize(ARTICLE, LengthBounds::new(10, 40)).unwrap();
                });
            }
        });
        assert!(engine.is_loaded());
    }

    #[test]
    fn test_engine_ollama_without_model_is_unavailable() {
        let engine = SummarizationEngine::new(EngineSettings {
            backend: Backend::Ollama,
            model: None,
            ollama_url: "http://127.0.0.1:11434".to_string(),
        });
        let err = engine
            .summarize(ARTICLE, LengthBounds::new(30, 150))
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(!engine.is_loaded());
    }

    #[test]
    fn test_model_name_per_backend() {
        assert_eq!(extractive_settings().model_name(), "extractive");
        let ollama = EngineSettings {
            backend: Backend::Ollama,
            model: Some("llama3.2".to_string()),
            ollama_url: String::new(),
        };
        assert_eq!(ollama.model_name(), "llama3.2");
    }

    #[test]
    fn test_bounds_display() {
        assert_eq!(LengthBounds::new(30, 150).to_string(), "30..150");
    }
}
