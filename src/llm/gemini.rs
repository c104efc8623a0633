//! Gemini generateContent client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{LlmError, Result};

use super::LanguageModel;

/// HTTP client for a Gemini-compatible generation API.
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

/// generateContent request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: InstructionPart<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct InstructionPart<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

/// generateContent response body. Only the text parts are of interest.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// API error response shape.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl GeminiClient {
    /// Create a client from configuration. The API key falls back to the
    /// GEMINI_API_KEY environment variable.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .ok_or_else(|| {
                LlmError::Api("API key not provided and GEMINI_API_KEY env var not set".to_string())
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Api(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            max_output_tokens: config.max_output_tokens,
        })
    }

    async fn request_generation(&self, system: &str, user: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let request = GenerateRequest {
            system_instruction: InstructionPart {
                parts: vec![TextPart { text: system }],
            },
            contents: vec![Content {
                role: "user",
                parts: vec![TextPart { text: user }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                top_p: self.top_p,
                top_k: self.top_k,
                max_output_tokens: self.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else if e.is_connect() {
                    LlmError::Api(format!("Connection failed: {}", e))
                } else {
                    LlmError::Api(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();

        if status.is_success() {
            let result: GenerateResponse = response
                .json()
                .await
                .map_err(|e| LlmError::Api(format!("Failed to parse response: {}", e)))?;

            // Concatenate all text parts of the first candidate.
            let text: String = result
                .candidates
                .into_iter()
                .next()
                .and_then(|c| c.content)
                .map(|c| c.parts.into_iter().map(|p| p.text).collect())
                .unwrap_or_default();

            if text.trim().is_empty() {
                return Err(LlmError::EmptyResponse.into());
            }
            Ok(text)
        } else if status.as_u16() == 429 {
            Err(LlmError::RateLimited.into())
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            if let Ok(parsed) = serde_json::from_str::<ErrorResponse>(&error_text) {
                Err(LlmError::Api(format!("API error ({}): {}", status, parsed.error.message)).into())
            } else {
                Err(LlmError::Api(format!("API error ({}): {}", status, error_text)).into())
            }
        }
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, system: &str, user: &str) -> Result<String> {
        self.request_generation(system, user).await
    }
}
