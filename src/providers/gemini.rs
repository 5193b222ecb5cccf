use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::ProviderError;
use crate::providers::Provider;

/// Public Generative Language API base URL
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini client for the `generateContent` REST call
#[derive(Debug)]
pub struct Gemini {
    /// HTTP client for API requests
    client: Client,
    /// API key sent in the `x-goog-api-key` header
    api_key: String,
    /// Model identifier, e.g. `gemini-2.0-flash-exp`
    model: String,
    /// API base URL
    endpoint: String,
}

/// generateContent request body
#[derive(Debug, Serialize)]
pub struct GeminiRequest {
    /// Conversation turns; a translation uses exactly one
    pub contents: Vec<GeminiContent>,

    /// Generation limits
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// One turn of content
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct GeminiContent {
    /// Text parts of the turn
    #[serde(default)]
    pub parts: Vec<GeminiPart>,

    /// Author role, present in responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// A text part
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct GeminiPart {
    #[serde(default)]
    pub text: String,
}

/// Optional generation limits
#[derive(Debug, Serialize, Clone, Default)]
pub struct GenerationConfig {
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

/// generateContent response body
#[derive(Debug, Deserialize, Default)]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,

    #[serde(rename = "usageMetadata", default)]
    pub usage_metadata: Option<UsageMetadata>,
}

/// A generated candidate
#[derive(Debug, Deserialize, Default)]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: GeminiContent,

    #[serde(rename = "finishReason", default)]
    pub finish_reason: Option<String>,
}

/// Token usage information
#[derive(Debug, Deserialize, Default)]
pub struct UsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    pub prompt_token_count: u64,

    #[serde(rename = "candidatesTokenCount", default)]
    pub candidates_token_count: u64,
}

// Error envelope: {"error": {"code": 429, "message": "...", "status": "RESOURCE_EXHAUSTED"}}
#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl GeminiRequest {
    /// Request with a single user prompt
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt.into() }],
                role: None,
            }],
            generation_config: None,
        }
    }

    /// Cap the number of generated tokens
    pub fn max_output_tokens(mut self, tokens: u32) -> Self {
        self.generation_config
            .get_or_insert_with(GenerationConfig::default)
            .max_output_tokens = Some(tokens);
        self
    }
}

impl Gemini {
    /// Create a new Gemini client
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        endpoint: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        let endpoint = endpoint.into();
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs.max(1)))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            model: model.into(),
            endpoint: if endpoint.trim().is_empty() {
                DEFAULT_ENDPOINT.to_string()
            } else {
                endpoint
            },
        }
    }

    /// Model this client talks to
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Full URL of the generateContent method for the configured model
    pub fn generate_content_url(&self) -> Result<Url, ProviderError> {
        let raw = format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        );
        Url::parse(&raw).map_err(|e| ProviderError::Unknown(format!("Invalid endpoint URL {}: {}", raw, e)))
    }

    fn map_send_error(e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Transient(format!("Deadline exceeded: {}", e))
        } else {
            ProviderError::Unknown(format!("Failed to send request to Gemini API: {}", e))
        }
    }

    // Gemini reports quota exhaustion as RESOURCE_EXHAUSTED, sometimes without a 429
    fn map_status_error(status_code: u16, body: &str) -> ProviderError {
        match serde_json::from_str::<GeminiErrorEnvelope>(body) {
            Ok(envelope) => {
                let message = if envelope.error.status.is_empty() {
                    envelope.error.message
                } else {
                    format!("{}: {}", envelope.error.status, envelope.error.message)
                };
                if envelope.error.status == "RESOURCE_EXHAUSTED" {
                    ProviderError::RateLimited(message)
                } else {
                    ProviderError::from_status(status_code, message)
                }
            }
            Err(_) => ProviderError::from_status(status_code, body.trim().to_string()),
        }
    }
}

#[async_trait]
impl Provider for Gemini {
    type Request = GeminiRequest;
    type Response = GeminiResponse;

    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError> {
        let url = self.generate_content_url()?;

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Gemini API error ({}): {}", status, error_text.trim());
            return Err(Self::map_status_error(status.as_u16(), &error_text));
        }

        let gemini_response = response
            .json::<GeminiResponse>()
            .await
            .map_err(|e| ProviderError::Unknown(format!("Failed to parse Gemini API response: {}", e)))?;

        if let Some(usage) = &gemini_response.usage_metadata {
            debug!(
                "Gemini usage: {} prompt tokens, {} completion tokens",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        Ok(gemini_response)
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let request = GeminiRequest::from_prompt("Hello").max_output_tokens(10);
        self.complete(request).await?;
        Ok(())
    }

    fn prompt_request(&self, prompt: &str) -> Self::Request {
        GeminiRequest::from_prompt(prompt)
    }

    fn extract_text(response: &Self::Response) -> String {
        response
            .candidates
            .first()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}
