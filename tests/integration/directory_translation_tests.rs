/*!
 * Tests for translating every subtitle file in a directory
 */

use anyhow::Result;
use parking_lot::Mutex;

use nichi::providers::mock::MockProvider;
use nichi::translation::{DirectoryEvent, SkipReason};
use crate::common;

#[tokio::test]
async fn test_translate_directory_withMixedFiles_shouldApplySkipRules() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    common::create_test_subtitle(dir, "A.en.srt")?;
    common::create_test_subtitle(dir, "B.id.srt")?;
    common::create_test_subtitle(dir, "C.en.srt")?;
    common::create_test_subtitle(dir, "C.id.srt")?;
    common::create_test_subtitle(dir, "D.fr.srt")?;
    common::create_test_file(dir, "E.en.srt", "")?;
    common::create_test_file(dir, "notes.txt", "ignored")?;

    let service = common::mock_service(MockProvider::echo());
    let events = Mutex::new(Vec::new());

    let translated = service
        .translate_directory(dir, "id", None, Some("en"), |event| events.lock().push(event))
        .await?;

    assert_eq!(translated.len(), 1);
    assert_eq!(translated[0].input_file, dir.join("A.en.srt"));
    assert_eq!(translated[0].output_file, dir.join("A.id.srt"));
    assert_eq!(translated[0].entry_count, 3);
    assert!(!dir.join("D.id.srt").exists());

    let events = events.into_inner();
    assert!(matches!(events[0], DirectoryEvent::Discovered { total_files: 6 }));

    let skipped: Vec<(String, SkipReason)> = events
        .iter()
        .filter_map(|event| match event {
            DirectoryEvent::FileSkipped { file, reason } => {
                Some((file.file_name()?.to_string_lossy().into_owned(), reason.clone()))
            }
            _ => None,
        })
        .collect();
    assert_eq!(skipped.len(), 4);
    assert_eq!(skipped[0], ("B.id.srt".to_string(), SkipReason::AlreadyTargetLanguage("id".to_string())));
    assert_eq!(skipped[1], ("C.en.srt".to_string(), SkipReason::OutputExists(dir.join("C.id.srt"))));
    assert!(matches!(&skipped[3].1, SkipReason::LanguageFilter { detected: Some(lang), .. } if lang == "fr"));

    let failed: Vec<&DirectoryEvent> = events
        .iter()
        .filter(|event| matches!(event, DirectoryEvent::FileFailed { .. }))
        .collect();
    assert_eq!(failed.len(), 1);
    assert!(matches!(failed[0], DirectoryEvent::FileFailed { file, .. } if file == &dir.join("E.en.srt")));
    Ok(())
}

#[tokio::test]
async fn test_translate_directory_withoutFilter_shouldTranslateUnlabelledFiles() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    common::create_test_subtitle(dir, "Plain.srt")?;
    common::create_test_subtitle(dir, "Other.de.srt")?;

    let provider = MockProvider::echo();
    let service = common::mock_service(provider.clone());

    let translated = service
        .translate_directory(dir, "ja", None, None, |_| {})
        .await?;

    assert_eq!(translated.len(), 2);
    assert!(dir.join("Plain.ja.srt").exists());
    assert!(dir.join("Other.ja.srt").exists());

    // Files are taken in name order, each with its own source language
    let prompts = provider.prompts();
    assert!(prompts[0].contains("from German to Japanese"));
    assert!(prompts[1].contains("from the detected language to Japanese"));
    Ok(())
}

#[tokio::test]
async fn test_translate_directory_shouldEmitBatchProgressForEachFile() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    common::create_test_subtitle(dir, "One.en.srt")?;
    common::create_test_subtitle(dir, "Two.en.srt")?;

    let service = nichi::translation::TranslationService::new(common::mock_translator(
        MockProvider::echo(),
        None,
        0,
        1,
        2,
    ));
    let progress = Mutex::new(0usize);
    let started = Mutex::new(Vec::new());

    service
        .translate_directory(dir, "id", None, None, |event| match event {
            DirectoryEvent::BatchProgress { total, .. } => {
                assert_eq!(total, 3);
                *progress.lock() += 1;
            }
            DirectoryEvent::FileStarted { position, total_files, entry_count, .. } => {
                started.lock().push((position, total_files, entry_count));
            }
            _ => {}
        })
        .await?;

    assert_eq!(progress.into_inner(), 6);
    assert_eq!(started.into_inner(), vec![(1, 2, 3), (2, 2, 3)]);
    Ok(())
}

#[tokio::test]
async fn test_translate_directory_withMissingDirectory_shouldFail() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let service = common::mock_service(MockProvider::echo());

    let result = service
        .translate_directory(&temp_dir.path().join("absent"), "id", None, None, |_| {})
        .await;

    assert!(result.is_err());
    Ok(())
}
