/*!
 * Mock provider implementations for testing.
 *
 * This module provides a scripted provider that simulates different behaviors:
 * - `MockProvider::echo()` - Answers every numbered line with a tagged copy
 * - `MockProvider::fixed()` - Always returns the same raw response
 * - `MockProvider::fail_then_succeed()` - Fails N times, then echoes
 * - `MockProvider::failing()` - Always fails with a given error
 * - `MockProvider::jitter()` - Echoes after a pseudo-random delay
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::Provider;

// Line that introduces the numbered list in batch prompts
const TEXT_MARKER: &str = "Text to translate:";

/// Mock request for testing
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// The full prompt sent to the provider
    pub prompt: String,
}

/// Mock response for testing
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// The raw response text
    pub text: String,
}

/// Behavior mode for the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Reply to each numbered prompt line with `N. [prefix] text`
    Echo { prefix: String },
    /// Always reply with the given text
    Fixed(String),
    /// Fail `failures` times with `error`, then behave like `Echo`
    FailThenSucceed { failures: usize, error: ProviderError },
    /// Always fail with the given error
    Failing(ProviderError),
    /// Reply with an empty text
    Empty,
    /// Echo after a delay in `[0, max_delay_ms)` derived from the prompt
    Jitter { max_delay_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Number of `complete` calls, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Prompts received, shared between clones
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Echo every numbered line back, tagged with `[TRANSLATED]`
    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo {
            prefix: "[TRANSLATED]".to_string(),
        })
    }

    /// Always return the given raw response
    pub fn fixed(text: impl Into<String>) -> Self {
        Self::new(MockBehavior::Fixed(text.into()))
    }

    /// Fail `failures` times with `error`, then echo
    pub fn fail_then_succeed(failures: usize, error: ProviderError) -> Self {
        Self::new(MockBehavior::FailThenSucceed { failures, error })
    }

    /// Always fail with the given error
    pub fn failing(error: ProviderError) -> Self {
        Self::new(MockBehavior::Failing(error))
    }

    /// Return empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Echo after a per-prompt delay below `max_delay_ms`
    pub fn jitter(max_delay_ms: u64) -> Self {
        Self::new(MockBehavior::Jitter { max_delay_ms })
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Copy of every prompt received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// Build the numbered answer an obliging model would give to `prompt`
    ///
    /// Only the list after the `Text to translate:` marker is answered, when the marker
    /// is present. Every line of the form `N. text` becomes `N. prefix text`; other lines
    /// are ignored.
    pub fn generate_echo_response(prompt: &str, prefix: &str) -> String {
        let list = prompt
            .split_once(TEXT_MARKER)
            .map(|(_, list)| list)
            .unwrap_or(prompt);

        list.lines()
            .filter_map(|line| {
                let line = line.trim();
                let (number, rest) = line.split_once(". ")?;
                if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
                    return None;
                }
                Some(format!("{}. {} {}", number, prefix, rest))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    // Stable pseudo-random delay, so a given batch always takes the same time
    fn jitter_delay(prompt: &str, max_delay_ms: u64) -> Duration {
        if max_delay_ms == 0 {
            return Duration::ZERO;
        }
        let hash = prompt
            .bytes()
            .fold(0xcbf29ce484222325u64, |acc, b| (acc ^ b as u64).wrapping_mul(0x100000001b3));
        Duration::from_millis(hash % max_delay_ms)
    }
}

#[async_trait]
impl Provider for MockProvider {
    type Request = MockRequest;
    type Response = MockResponse;

    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(request.prompt.clone());

        match &self.behavior {
            MockBehavior::Echo { prefix } => Ok(MockResponse {
                text: Self::generate_echo_response(&request.prompt, prefix),
            }),

            MockBehavior::Fixed(text) => Ok(MockResponse { text: text.clone() }),

            MockBehavior::FailThenSucceed { failures, error } => {
                if count < *failures {
                    Err(error.clone())
                } else {
                    Ok(MockResponse {
                        text: Self::generate_echo_response(&request.prompt, "[TRANSLATED]"),
                    })
                }
            }

            MockBehavior::Failing(error) => Err(error.clone()),

            MockBehavior::Empty => Ok(MockResponse { text: String::new() }),

            MockBehavior::Jitter { max_delay_ms } => {
                tokio::time::sleep(Self::jitter_delay(&request.prompt, *max_delay_ms)).await;
                Ok(MockResponse {
                    text: Self::generate_echo_response(&request.prompt, "[TRANSLATED]"),
                })
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match &self.behavior {
            MockBehavior::Failing(error) => Err(error.clone()),
            _ => Ok(()),
        }
    }

    fn prompt_request(&self, prompt: &str) -> Self::Request {
        MockRequest {
            prompt: prompt.to_string(),
        }
    }

    fn extract_text(response: &Self::Response) -> String {
        response.text.clone()
    }
}
