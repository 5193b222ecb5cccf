/*!
 * Error types for the nichi application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;
use thiserror::Error;

/// How a remote failure should be treated by the retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The service is throttling us; back off and retry
    RateLimited,
    /// Permission denied or unknown model; retrying cannot help
    NonRetryable,
    /// Server-side hiccup or deadline exceeded
    Transient,
    /// Anything we could not classify; retried conservatively
    Unknown,
}

impl ErrorClass {
    /// Whether the batch client should spend another attempt on this class
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ErrorClass::NonRetryable)
    }
}

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The provider rejected the request because of rate limiting or quota
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Authentication or authorization failure
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The requested model or resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Server-side failure that may succeed on a later attempt
    #[error("Service unavailable: {0}")]
    Transient(String),

    /// The provider answered but produced no text
    #[error("Provider returned an empty response")]
    EmptyResponse,

    /// Any other failure, including connection problems and malformed bodies
    #[error("{0}")]
    Unknown(String),
}

impl ProviderError {
    /// Classify the error for the retry loop
    pub fn class(&self) -> ErrorClass {
        match self {
            ProviderError::RateLimited(_) => ErrorClass::RateLimited,
            ProviderError::PermissionDenied(_) | ProviderError::NotFound(_) => ErrorClass::NonRetryable,
            ProviderError::Transient(_) => ErrorClass::Transient,
            ProviderError::EmptyResponse | ProviderError::Unknown(_) => ErrorClass::Unknown,
        }
    }

    /// Map an HTTP status code returned by a provider onto the error taxonomy
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            429 => ProviderError::RateLimited(message),
            401 | 403 => ProviderError::PermissionDenied(message),
            404 => ProviderError::NotFound(message),
            500 | 502 | 503 | 504 => ProviderError::Transient(message),
            _ => ProviderError::Unknown(format!("HTTP {}: {}", status_code, message)),
        }
    }
}

/// Errors that can occur during file-level translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The input subtitle file does not exist
    #[error("Input file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The input parsed to zero subtitle entries
    #[error("No valid subtitle entries found in {}", .0.display())]
    EmptyInput(PathBuf),

    /// Missing or invalid configuration value
    #[error("Configuration error ({key}): {message}")]
    Configuration {
        /// The offending configuration key
        key: String,
        /// Human readable explanation
        message: String,
    },

    /// Error reading or writing files
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the provider API that escaped batch containment
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl TranslationError {
    /// Shorthand for a configuration error on a given key
    pub fn configuration(key: impl Into<String>, message: impl Into<String>) -> Self {
        TranslationError::Configuration {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<TranslationError>() {
            Ok(translation_error) => Self::Translation(translation_error),
            Err(other) => Self::Unknown(other.to_string()),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
