// Ollama-backed abstractive summarizer.
//
// Talks to the server's HTTP API with greedy decoding (temperature 0, top_k 1) so repeated runs
// give the same summary. Inputs longer than the model's context window are truncated by the
// server without notice.
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::summarization::{LengthBounds, Summarizer};
use crate::error::{DigestError, Result};

pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<InstalledModel>,
}

#[derive(Debug, Deserialize)]
struct InstalledModel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

pub struct OllamaSummarizer {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaSummarizer {
    /// Connect to the server and make sure `model` is installed there.
    pub fn connect(base_url: &str, model: &str) -> Result<Self> {
        let unavailable = |reason: String| DigestError::ModelUnavailable {
            model: model.to_string(),
            reason,
        };

        // summaries block until the model answers; no request timeout
        let http = Client::builder()
            .user_agent("docdigest")
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| unavailable(format!("failed to build HTTP client: {}", e)))?;

        let base_url = base_url.trim_end_matches('/').to_string();
        let tags: TagsResponse = http
            .get(format!("{}/api/tags", base_url))
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .map_err(|e| unavailable(format!("failed to reach Ollama at {}: {}", base_url, e)))?;

        if !tags.models.iter().any(|m| matches_model(&m.name, model)) {
            let installed: Vec<&str> = tags.models.iter().map(|m| m.name.as_str()).collect();
            return Err(unavailable(format!(
                "model is not installed (available: {})",
                if installed.is_empty() { "none".to_string() } else { installed.join(", ") }
            )));
        }

        debug!(model, base_url = %base_url, "Connected to Ollama");
        Ok(Self {
            http,
            base_url,
            model: model.to_string(),
        })
    }

    fn prompt(text: &str, bounds: LengthBounds) -> String {
        format!(
            "Summarize the following text in {} to {} words. Reply with the summary only, \
             without any preamble.\n\n{}",
            bounds.min, bounds.max, text
        )
    }
}

/// `llama3.2` matches an installed `llama3.2:latest`; explicit tags must match exactly.
fn matches_model(installed: &str, wanted: &str) -> bool {
    installed == wanted || (!wanted.contains(':') && installed.strip_suffix(":latest") == Some(wanted))
}

impl Summarizer for OllamaSummarizer {
    fn summarize(&self, text: &str, bounds: LengthBounds) -> Result<String> {
        let payload = json!({
            "model": self.model,
            "prompt": Self::prompt(text, bounds),
            "stream": false,
            "options": {
                "temperature": 0.0,
                "top_k": 1,
                // word budget, with headroom for tokenization
                "num_predict": bounds.max * 2,
            }
        });

        let response = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&payload)
            .send()
            .map_err(|e| DigestError::Summarization(format!("request to Ollama failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(DigestError::Summarization(format!(
                "Ollama returned {}: {}",
                status,
                body.trim()
            )));
        }

        let generated: GenerateResponse = response
            .json()
            .map_err(|e| DigestError::Summarization(format!("malformed Ollama response: {}", e)))?;

        let summary = generated.response.trim();
        if summary.is_empty() {
            return Err(DigestError::Summarization(
                "Ollama returned an empty summary".to_string(),
            ));
        }
        Ok(summary.to_string())
    }
}
