/*!
 * Batch translation processing.
 *
 * This module owns the remote call for one batch of subtitle texts: cache lookup,
 * prompt construction, retry with exponential backoff, and response parsing. It also
 * fans many batches out under a concurrency limit while keeping results in input
 * order. A failing batch never aborts its siblings; it comes back with the original
 * texts, `success == false` and the last error message.
 */

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use crate::errors::ProviderError;
use crate::providers::Provider;

use super::cache::{ResponseCache, fingerprint};
use super::parsing::parse_response;
use super::prompts::{PromptTemplate, build_batch_prompt};

/// Retry and backoff settings for a single batch
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry, doubled on each following retry
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Add a uniform random `[0, 1)` second jitter to every delay
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Policy that retries `max_retries` times without waiting
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: false,
        }
    }

    /// Delay before retry number `attempt + 1`
    ///
    /// `min(base_delay * 2^attempt + jitter, max_delay)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let jitter = if self.jitter { rand::random::<f64>() } else { 0.0 };
        self.delay_with_jitter(attempt, jitter)
    }

    fn delay_with_jitter(&self, attempt: u32, jitter: f64) -> Duration {
        let exponent = attempt.min(63) as i32;
        let raw = self.base_delay.as_secs_f64() * 2f64.powi(exponent) + jitter;
        let capped = raw.min(self.max_delay.as_secs_f64());
        if capped.is_finite() && capped > 0.0 {
            Duration::try_from_secs_f64(capped).unwrap_or(self.max_delay)
        } else {
            Duration::ZERO
        }
    }
}

/// Batching settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Texts per remote request
    pub batch_size: usize,
    /// Batches in flight at once
    pub max_concurrent_batches: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 200,
            max_concurrent_batches: 5,
        }
    }
}

/// A contiguous group of texts sent as one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationBatch {
    /// Position of the batch in its file
    pub index: usize,
    pub texts: Vec<String>,
}

impl TranslationBatch {
    /// Split texts into contiguous batches of at most `batch_size`
    pub fn partition(texts: &[String], batch_size: usize) -> Vec<TranslationBatch> {
        texts
            .chunks(batch_size.max(1))
            .enumerate()
            .map(|(index, chunk)| TranslationBatch {
                index,
                texts: chunk.to_vec(),
            })
            .collect()
    }
}

/// Result of translating one batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    /// Translations, or the original texts when the batch failed
    pub texts: Vec<String>,
    pub success: bool,
    /// Last error message of a failed batch
    pub error: Option<String>,
    /// Whether the response came from the cache
    pub cached: bool,
}

impl BatchOutcome {
    fn translated(texts: Vec<String>, cached: bool) -> Self {
        Self {
            texts,
            success: true,
            error: None,
            cached,
        }
    }

    fn failed(original: &[String], error: impl Into<String>) -> Self {
        Self {
            texts: original.to_vec(),
            success: false,
            error: Some(error.into()),
            cached: false,
        }
    }
}

/// Batch translator for processing subtitle texts in batches
#[derive(Debug)]
pub struct BatchTranslator<P: Provider> {
    /// Remote model client
    provider: Arc<P>,
    /// Raw response cache, disabled when `None`
    cache: Option<Arc<ResponseCache>>,
    retry: RetryPolicy,
    options: BatchOptions,
    template: PromptTemplate,
}

impl<P: Provider> BatchTranslator<P> {
    /// Create a new batch translator
    pub fn new(provider: P, cache: Option<ResponseCache>, retry: RetryPolicy, options: BatchOptions) -> Self {
        Self {
            provider: Arc::new(provider),
            cache: cache.map(Arc::new),
            retry,
            options,
            template: PromptTemplate::default(),
        }
    }

    /// Replace the prompt template
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_deref()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Translate one batch, retrying retryable failures
    ///
    /// Never returns an error: failures are reported in the outcome with the
    /// original texts.
    pub async fn translate_batch_with_retry(
        &self,
        texts: &[String],
        target_language: &str,
        source_language: Option<&str>,
    ) -> BatchOutcome {
        if texts.is_empty() {
            return BatchOutcome::translated(Vec::new(), false);
        }

        let key = fingerprint(texts, target_language, source_language);
        if let Some(raw) = self.cache.as_ref().and_then(|cache| cache.get(&key)) {
            return BatchOutcome::translated(parse_response(&raw, texts), true);
        }

        let prompt = build_batch_prompt(&self.template, texts, target_language, source_language);
        let max_attempts = self.retry.max_retries.saturating_add(1);
        let mut last_error: Option<ProviderError> = None;

        for attempt in 0..max_attempts {
            match self.provider.generate(&prompt).await {
                Ok(raw) => {
                    if let Some(cache) = &self.cache {
                        if let Err(e) = cache.put(&key, &raw) {
                            warn!("Failed to cache batch response: {:#}", e);
                        }
                    }
                    return BatchOutcome::translated(parse_response(&raw, texts), false);
                }
                Err(e) => {
                    let class = e.class();
                    if !class.is_retryable() {
                        warn!("Batch failed with non-retryable error: {}", e);
                        return BatchOutcome::failed(texts, e.to_string());
                    }

                    if attempt + 1 == max_attempts {
                        warn!("Batch failed after {} attempts: {}", max_attempts, e);
                        last_error = Some(e);
                        break;
                    }

                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        "Batch attempt {}/{} failed ({:?}): {} - retrying in {:.2}s",
                        attempt + 1,
                        max_attempts,
                        class,
                        e,
                        delay.as_secs_f64()
                    );
                    last_error = Some(e);
                    tokio::time::sleep(delay).await;
                }
            }
        }

        let message = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Translation failed".to_string());
        BatchOutcome::failed(texts, message)
    }

    /// Translate batches concurrently, one outcome per batch in input order
    ///
    /// `progress` is called once per finished batch with `(completed, total)`.
    pub async fn translate_batches<F>(
        &self,
        batches: &[TranslationBatch],
        target_language: &str,
        source_language: Option<&str>,
        progress: F,
    ) -> Vec<BatchOutcome>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        let total_batches = batches.len();
        if total_batches == 0 {
            return Vec::new();
        }

        let max_concurrent = self.options.max_concurrent_batches.max(1);
        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let completed = AtomicUsize::new(0);
        let progress = &progress;
        let completed = &completed;

        info!(
            "Translating {} batches ({} at a time)",
            total_batches, max_concurrent
        );

        // The semaphore is the only gate on remote calls; the stream just polls every batch
        let finished = stream::iter(batches.iter().enumerate())
            .map(|(position, batch)| {
                let semaphore = semaphore.clone();
                async move {
                    let _permit = match semaphore.acquire().await {
                        Ok(permit) => permit,
                        Err(_) => return (position, BatchOutcome::failed(&batch.texts, "Concurrency gate closed")),
                    };

                    let start_time = Instant::now();
                    let outcome = self
                        .translate_batch_with_retry(&batch.texts, target_language, source_language)
                        .await;

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    progress(done, total_batches);

                    debug!(
                        "Batch {} finished in {:?} (success: {}, cached: {})",
                        batch.index + 1,
                        start_time.elapsed(),
                        outcome.success,
                        outcome.cached
                    );

                    (position, outcome)
                }
            })
            .buffer_unordered(total_batches)
            .collect::<Vec<_>>()
            .await;

        let mut slots: Vec<Option<BatchOutcome>> = vec![None; total_batches];
        for (position, outcome) in finished {
            slots[position] = Some(outcome);
        }

        slots
            .into_iter()
            .zip(batches)
            .map(|(slot, batch)| slot.unwrap_or_else(|| BatchOutcome::failed(&batch.texts, "Batch did not complete")))
            .collect()
    }

    /// Partition texts, translate every batch, and flatten the results
    ///
    /// The returned texts have the same length and order as the input.
    pub async fn translate_texts<F>(
        &self,
        texts: &[String],
        target_language: &str,
        source_language: Option<&str>,
        progress: F,
    ) -> (Vec<String>, Vec<BatchOutcome>)
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        let batches = TranslationBatch::partition(texts, self.options.batch_size);
        let outcomes = self
            .translate_batches(&batches, target_language, source_language, progress)
            .await;

        let translated: Vec<String> = outcomes.iter().flat_map(|o| o.texts.iter().cloned()).collect();
        (translated, outcomes)
    }
}
