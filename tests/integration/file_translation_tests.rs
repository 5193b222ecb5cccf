/*!
 * End-to-end tests for translating a single subtitle file
 */

use anyhow::Result;
use std::fs;

use nichi::ProviderError;
use nichi::TranslationError;
use nichi::providers::mock::MockProvider;
use nichi::subtitle_processor::read_srt_file;
use nichi::translation::TranslationService;
use crate::common;

#[tokio::test]
async fn test_translate_file_withMultilineCue_shouldWriteTranslationNextToInput() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(
        temp_dir.path(),
        "Movie.en.srt",
        "1\n00:00:01,000 --> 00:00:02,000\nHello\nworld\n",
    )?;
    let provider = MockProvider::fixed("1. Halo\ndunia");
    let service = common::mock_service(provider.clone());

    let result = service.translate_file(&input, "id", None, None, |_, _| {}).await?;

    assert_eq!(result.output_file, temp_dir.path().join("Movie.id.srt"));
    assert_eq!(result.total_entries, 1);
    assert_eq!(result.batch_outcomes.len(), 1);
    assert!(result.batch_outcomes[0].success);
    assert!(result.is_complete());
    assert_eq!(
        fs::read_to_string(&result.output_file)?,
        "1\n00:00:01,000 --> 00:00:02,000\nHalo\ndunia\n\n"
    );

    // Source language comes from the filename
    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("from English to Indonesian"));
    Ok(())
}

#[tokio::test]
async fn test_translate_file_withPartialResponse_shouldKeepOriginalForMissingEntry() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(
        temp_dir.path(),
        "Short.en.srt",
        "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n2\n00:00:03,000 --> 00:00:04,000\nWorld\n",
    )?;
    let service = common::mock_service(MockProvider::fixed("1. Halo"));

    let result = service.translate_file(&input, "id", None, None, |_, _| {}).await?;

    let entries = read_srt_file(&result.output_file)?;
    let texts: Vec<&str> = entries.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["Halo", "World"]);
    assert_eq!(entries[1].start.to_string(), "00:00:03,000");
    Ok(())
}

#[tokio::test]
async fn test_translate_file_withExplicitOutput_shouldWriteThere() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "Show.S01E01.en.srt")?;
    let output = temp_dir.path().join("out").join("custom.srt");
    let service = common::mock_service(MockProvider::echo());

    let result = service
        .translate_file(&input, "fr", Some("en"), Some(&output), |_, _| {})
        .await?;

    assert_eq!(result.output_file, output);
    assert!(!temp_dir.path().join("Show.S01E01.fr.srt").exists());
    let entries = read_srt_file(&output)?;
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[2].text, "[TRANSLATED] For testing purposes.");
    Ok(())
}

#[tokio::test]
async fn test_translate_file_withFailingProvider_shouldStillWriteOriginals() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "Movie.en.srt")?;
    let service = common::mock_service(MockProvider::failing(ProviderError::PermissionDenied(
        "bad key".to_string(),
    )));

    let result = service.translate_file(&input, "id", None, None, |_, _| {}).await?;

    assert!(!result.is_complete());
    assert_eq!(result.failed_batches(), vec![1]);
    assert_eq!(result.errors, vec!["Batch 1: Permission denied: bad key".to_string()]);
    assert_eq!(read_srt_file(&result.output_file)?, read_srt_file(&input)?);
    Ok(())
}

#[tokio::test]
async fn test_translate_file_withSmallBatches_shouldReportProgressPerBatch() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "Movie.en.srt")?;
    let service = TranslationService::new(common::mock_translator(MockProvider::echo(), None, 0, 2, 2));
    let calls = parking_lot::Mutex::new(Vec::new());

    let result = service
        .translate_file(&input, "id", None, None, |completed, total| {
            calls.lock().push((completed, total));
        })
        .await?;

    assert_eq!(result.batch_outcomes.len(), 2);
    let mut calls = calls.into_inner();
    calls.sort_unstable();
    assert_eq!(calls, vec![(1, 2), (2, 2)]);
    Ok(())
}

#[tokio::test]
async fn test_translate_file_withMissingInput_shouldReturnNotFound() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let service = common::mock_service(MockProvider::echo());

    let error = service
        .translate_file(&temp_dir.path().join("absent.en.srt"), "id", None, None, |_, _| {})
        .await
        .unwrap_err();

    assert!(matches!(
        error.downcast_ref::<TranslationError>(),
        Some(TranslationError::NotFound(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_translate_file_withNoEntries_shouldReturnEmptyInput() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "Blank.en.srt", "\n\nnot a subtitle\n")?;
    let provider = MockProvider::echo();
    let service = common::mock_service(provider.clone());

    let error = service
        .translate_file(&input, "id", None, None, |_, _| {})
        .await
        .unwrap_err();

    assert!(matches!(
        error.downcast_ref::<TranslationError>(),
        Some(TranslationError::EmptyInput(_))
    ));
    assert_eq!(provider.request_count(), 0);
    assert!(!temp_dir.path().join("Blank.id.srt").exists());
    Ok(())
}
