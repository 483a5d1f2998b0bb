//! Generative-text collaborator.
//!
//! [`TextGenerator`] is the one-method seam the extractor and analyst
//! prompt through; [`GeminiClient`] is the HTTP implementation against
//! the Gemini `generateContent` API. Tests script the trait directly,
//! so only this module needs a mock HTTP server.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A collaborator that turns a prompt into raw text.
///
/// The text is expected (not guaranteed) to contain one JSON object;
/// parsing and validation are the caller's problem.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Configuration for the Gemini endpoint.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API base URL (no trailing slash).
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    /// Per-request timeout. External calls are always bounded so a
    /// stalled model cannot stall the command.
    pub timeout: Duration,
}

impl GeminiConfig {
    /// Read configuration from the environment, falling back to
    /// defaults for everything but the API key.
    pub fn from_env() -> Self {
        let base_url = std::env::var("GEMINI_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".into());
        let api_key = std::env::var("GEMINI_API_KEY").ok();
        let model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.0-flash-001".into());
        let timeout = std::env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(15));
        Self {
            base_url,
            api_key,
            model,
            timeout,
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".into(),
            api_key: None,
            model: "gemini-2.0-flash-001".into(),
            timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// Response shape, only the fields we read.
#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Gemini `generateContent` client.
pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::new(GeminiConfig::from_env())
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        );

        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.header("x-goog-api-key", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("model endpoint returned {status}: {text}");
        }

        let parsed: GenerateResponse = response.json().await?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| anyhow::anyhow!("model response has no candidates"))?;

        tracing::debug!(model = %self.config.model, chars = text.len(), "model responded");
        Ok(text)
    }
}
