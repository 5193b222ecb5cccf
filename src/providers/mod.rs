/*!
 * Provider implementations for remote translation services.
 *
 * This module contains client implementations for the model backends:
 * - Gemini: Google Generative Language REST API
 * - Mock: scripted provider for tests and benchmarks
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably by the batch translation client.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// The request type for this provider
    type Request: Send + Sync;

    /// The response type for this provider
    type Response: Send + Sync;

    /// Complete a request using this provider
    ///
    /// # Arguments
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<Self::Response, ProviderError>` - The response from the provider or an error
    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Build a provider request carrying a single plain-text prompt
    fn prompt_request(&self, prompt: &str) -> Self::Request;

    /// Extract text from the provider response
    fn extract_text(response: &Self::Response) -> String;

    /// Send a prompt and return the response text
    ///
    /// A response without any text is reported as `ProviderError::EmptyResponse`.
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = self.prompt_request(prompt);
        let response = self.complete(request).await?;
        let text = Self::extract_text(&response);
        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(text)
    }
}

pub mod gemini;
pub mod mock;
