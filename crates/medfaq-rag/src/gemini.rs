//! Gemini `generateContent` over HTTPS.
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use medfaq_core::config::GenerationConfig;
use medfaq_core::traits::Generator;

/// A [`Generator`] backed by the Gemini REST API.
///
/// A missing API key is not a construction error: the bot still starts and
/// every generation reports the missing key instead.
pub struct GeminiGenerator {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiGenerator {
    pub fn new(config: &GenerationConfig, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn has_api_key(&self) -> bool { self.api_key.is_some() }

    fn url(&self) -> String { format!("{}/models/{}:generateContent", self.endpoint, self.model) }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate.
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().map(|p| p.text).collect();
        Some(text)
    }
}

impl Generator for GeminiGenerator {
    fn generate(&self, prompt: &str) -> Result<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            bail!("no API key configured; set GEMINI_API_KEY or generation.api_key");
        };
        debug!(model = %self.model, prompt_len = prompt.len(), "calling Gemini");

        let body = GenerateRequest { contents: vec![Content { parts: vec![RequestPart { text: prompt }] }] };
        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .context("request to Gemini failed")?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&raw).map(|e| e.error.message).unwrap_or(raw);
            bail!("Gemini returned {}: {}", status, message);
        }

        let parsed: GenerateResponse = response.json().context("decode Gemini response")?;
        parsed.text().ok_or_else(|| anyhow!("Gemini returned no candidates"))
    }
}
