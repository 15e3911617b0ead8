/// Completions API client
///
/// Sends prompts to an OpenAI-compatible `/completions` endpoint and returns
/// the generated text. The service treats the result as opaque: it is
/// passed through to the caller or into a report, never interpreted.
///
/// API Documentation: https://platform.openai.com/docs/api-reference/completions

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;
use crate::model::GenerationError;
use crate::summary::TextGenerator;

// ============================================================================
// API Request / Response Structures
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    #[serde(default)]
    pub text: String,
}

// ============================================================================
// API Client
// ============================================================================

pub struct OpenAiGenerator {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiGenerator {
    pub fn new(config: &GenerationConfig, api_key: String) -> Result<Self, GenerationError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    pub fn completions_url(&self) -> String {
        format!("{}/completions", self.base_url)
    }
}

impl TextGenerator for OpenAiGenerator {
    fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        if self.api_key.trim().is_empty() {
            return Err(GenerationError::MissingApiKey);
        }

        let body = CompletionRequest {
            model: &self.model,
            prompt,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .json(&body)
            .send()?;

        if !response.status().is_success() {
            return Err(GenerationError::Http(response.status().as_u16()));
        }

        let api_response: CompletionResponse = response.json()?;
        extract_text(api_response)
    }
}

/// First choice's text, trimmed. Blank output counts as no output.
fn extract_text(response: CompletionResponse) -> Result<String, GenerationError> {
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or(GenerationError::EmptyResponse)
}

// ============================================================================
// Tests
// ============================================================================
