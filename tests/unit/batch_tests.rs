/*!
 * Tests for concurrent batch translation with retry
 */

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use nichi::ProviderError;
use nichi::providers::Provider;
use nichi::providers::mock::MockProvider;
use nichi::translation::{BatchOptions, BatchTranslator, PromptTemplate, RetryPolicy, TranslationBatch};
use crate::common;

/// Echo provider that records how many calls overlap
#[derive(Debug, Default)]
struct InFlightProvider {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait]
impl Provider for InFlightProvider {
    type Request = String;
    type Response = String;

    async fn complete(&self, prompt: String) -> Result<String, ProviderError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(MockProvider::generate_echo_response(&prompt, "[TRANSLATED]"))
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    fn prompt_request(&self, prompt: &str) -> String {
        prompt.to_string()
    }

    fn extract_text(response: &String) -> String {
        response.clone()
    }
}

#[tokio::test]
async fn test_translate_batch_withFailuresEqualToRetries_shouldSucceed() {
    let provider = MockProvider::fail_then_succeed(3, ProviderError::Transient("busy".to_string()));
    let translator = common::mock_translator(provider.clone(), None, 3, 10, 1);

    let outcome = translator
        .translate_batch_with_retry(&common::strings(&["Hello"]), "id", Some("en"))
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.texts, vec!["[TRANSLATED] Hello"]);
    assert_eq!(provider.request_count(), 4);
}

#[tokio::test]
async fn test_translate_batch_withOneFailureTooMany_shouldKeepOriginals() {
    let provider = MockProvider::fail_then_succeed(4, ProviderError::RateLimited("quota".to_string()));
    let translator = common::mock_translator(provider.clone(), None, 3, 10, 1);
    let texts = common::strings(&["Hello", "World"]);

    let outcome = translator.translate_batch_with_retry(&texts, "id", None).await;

    assert!(!outcome.success);
    assert_eq!(outcome.texts, texts);
    assert_eq!(outcome.error.as_deref(), Some("Rate limit exceeded: quota"));
    assert_eq!(provider.request_count(), 4);
}

#[tokio::test]
async fn test_translate_batch_withPermissionDenied_shouldNotRetry() {
    let provider = MockProvider::failing(ProviderError::PermissionDenied("bad key".to_string()));
    let translator = common::mock_translator(provider.clone(), None, 5, 10, 1);

    let outcome = translator
        .translate_batch_with_retry(&common::strings(&["Hello"]), "id", None)
        .await;

    assert!(!outcome.success);
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn test_translate_batch_withEmptyResponses_shouldRetryThenFail() {
    let provider = MockProvider::empty();
    let translator = common::mock_translator(provider.clone(), None, 2, 10, 1);

    let outcome = translator
        .translate_batch_with_retry(&common::strings(&["Hello"]), "id", None)
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.texts, vec!["Hello"]);
    assert_eq!(provider.request_count(), 3);
}

#[tokio::test]
async fn test_translate_batch_withWarmCache_shouldNotCallProvider() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let provider = MockProvider::echo();
    let texts = common::strings(&["Hello", "World"]);

    let first = common::mock_translator(provider.clone(), Some(temp_dir.path()), 0, 10, 1);
    let cold = first.translate_batch_with_retry(&texts, "id", Some("en")).await;
    assert!(cold.success);
    assert!(!cold.cached);
    assert_eq!(provider.request_count(), 1);

    // A fresh translator over the same directory sees the stored response
    let second = common::mock_translator(provider.clone(), Some(temp_dir.path()), 0, 10, 1);
    let warm = second.translate_batch_with_retry(&texts, "id", Some("en")).await;

    assert!(warm.success);
    assert!(warm.cached);
    assert_eq!(warm.texts, cold.texts);
    assert_eq!(provider.request_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_translate_batch_withFailure_shouldNotPopulateCache() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let provider = MockProvider::failing(ProviderError::NotFound("no model".to_string()));
    let translator = common::mock_translator(provider, Some(temp_dir.path()), 0, 10, 1);

    translator
        .translate_batch_with_retry(&common::strings(&["Hello"]), "id", None)
        .await;

    let info = translator.cache().map(|cache| cache.info()).transpose()?;
    assert_eq!(info.map(|i| i.count), Some(0));
    Ok(())
}

#[tokio::test]
async fn test_translate_batches_withJitter_shouldKeepInputOrder() {
    let texts: Vec<String> = (0..12).map(|i| format!("line {}", i)).collect();
    let batches = TranslationBatch::partition(&texts, 1);
    let translator = common::mock_translator(MockProvider::jitter(25), None, 0, 1, 4);
    let progress = Mutex::new(Vec::new());

    let outcomes = translator
        .translate_batches(&batches, "id", None, |completed, total| {
            progress.lock().push((completed, total));
        })
        .await;

    assert_eq!(outcomes.len(), 12);
    for (i, outcome) in outcomes.iter().enumerate() {
        assert_eq!(outcome.texts, vec![format!("[TRANSLATED] line {}", i)]);
    }

    let progress = progress.into_inner();
    assert_eq!(progress.len(), 12);
    assert!(progress.iter().all(|&(_, total)| total == 12));
    let mut completed: Vec<usize> = progress.iter().map(|&(done, _)| done).collect();
    completed.sort_unstable();
    assert_eq!(completed, (1..=12).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_translate_texts_shouldFlattenToInputLength() {
    let texts: Vec<String> = (0..7).map(|i| format!("entry {}", i)).collect();
    let translator = common::mock_translator(MockProvider::echo(), None, 0, 3, 2);

    let (translated, outcomes) = translator.translate_texts(&texts, "fr", Some("en"), |_, _| {}).await;

    assert_eq!(outcomes.len(), 3);
    assert_eq!(translated.len(), 7);
    assert_eq!(translated[6], "[TRANSLATED] entry 6");
}

#[tokio::test]
async fn test_translate_batch_withCustomTemplate_shouldRenderIt() {
    let provider = MockProvider::echo();
    let translator = common::mock_translator(provider.clone(), None, 0, 10, 1)
        .with_template(PromptTemplate::new("{source_language} => {target_language}\nText to translate:\n{numbered_texts}"));

    let outcome = translator
        .translate_batch_with_retry(&common::strings(&["Hello"]), "ko", Some("en"))
        .await;

    assert_eq!(outcome.texts, vec!["[TRANSLATED] Hello"]);
    assert_eq!(provider.prompts(), vec!["English => Korean\nText to translate:\n1. Hello".to_string()]);
}

#[tokio::test]
async fn test_translate_batches_shouldNeverExceedConcurrencyLimit() {
    let texts: Vec<String> = (0..20).map(|i| format!("line {}", i)).collect();
    let batches = TranslationBatch::partition(&texts, 1);
    let translator = BatchTranslator::new(
        InFlightProvider::default(),
        None,
        RetryPolicy::immediate(0),
        BatchOptions {
            batch_size: 1,
            max_concurrent_batches: 3,
        },
    );

    let outcomes = translator.translate_batches(&batches, "id", None, |_, _| {}).await;

    assert_eq!(outcomes.len(), 20);
    assert!(outcomes.iter().all(|outcome| outcome.success));
    let provider = translator.provider();
    assert_eq!(provider.calls.load(Ordering::SeqCst), 20);
    let peak = provider.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak in flight was {}", peak);
    assert!(peak > 1, "batches did not overlap");
}
