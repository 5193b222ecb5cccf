/*!
 * Core translation service implementation.
 *
 * This module contains the `TranslationService`, which turns subtitle files into
 * translated subtitle files. A file is parsed, its texts are handed to the batch
 * translator, and the results are paired back with the original indices and timings.
 * Directory translation runs the same pipeline over every subtitle file in a folder,
 * one file at a time.
 */

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::TranslationError;
use crate::file_utils::FileManager;
use crate::language_utils::language_codes_match;
use crate::providers::Provider;
use crate::subtitle_naming::detect_language;
use crate::subtitle_processor::{SRT_EXTENSION, SubtitleCollection, parse_srt_bytes, write_srt_file};

use super::batch::{BatchOutcome, BatchTranslator};

/// Result of translating one file
#[derive(Debug, Clone)]
pub struct TranslationResult {
    pub input_file: PathBuf,
    pub output_file: PathBuf,
    /// Entries parsed from the input
    pub total_entries: usize,
    /// Entries written to the output
    pub translated_entries: usize,
    /// One outcome per batch, in file order
    pub batch_outcomes: Vec<BatchOutcome>,
    /// `"Batch N: message"` for every failed batch
    pub errors: Vec<String>,
}

impl TranslationResult {
    /// File name of the output
    pub fn output_filename(&self) -> String {
        self.output_file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Whether every batch was translated
    pub fn is_complete(&self) -> bool {
        self.batch_outcomes.iter().all(|o| o.success)
    }

    /// 1-based numbers of the batches that fell back to the original text
    pub fn failed_batches(&self) -> Vec<usize> {
        self.batch_outcomes
            .iter()
            .enumerate()
            .filter(|(_, o)| !o.success)
            .map(|(i, _)| i + 1)
            .collect()
    }
}

/// One translated file of a directory pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryTranslation {
    pub input_file: PathBuf,
    pub output_file: PathBuf,
    pub entry_count: usize,
}

/// Why a file was left alone during a directory pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The filename already carries the target language
    AlreadyTargetLanguage(String),
    /// The computed output file exists
    OutputExists(PathBuf),
    /// The detected language does not match the requested filter
    LanguageFilter { detected: Option<String>, wanted: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::AlreadyTargetLanguage(lang) => write!(f, "already in target language ({})", lang),
            SkipReason::OutputExists(path) => write!(f, "output exists: {}", path.display()),
            SkipReason::LanguageFilter { detected, wanted } => write!(
                f,
                "language {} does not match filter {}",
                detected.as_deref().unwrap_or("unknown"),
                wanted
            ),
        }
    }
}

/// Progress notifications of a directory pass
#[derive(Debug, Clone, PartialEq)]
pub enum DirectoryEvent {
    /// Subtitle files found, before any work starts
    Discovered { total_files: usize },
    /// A file is about to be translated (`position` is 1-based)
    FileStarted { file: PathBuf, position: usize, total_files: usize, entry_count: usize },
    /// A batch of the current file finished
    BatchProgress { file: PathBuf, completed: usize, total: usize },
    /// A file was written
    FileTranslated { result: DirectoryTranslation, failed_batches: Vec<usize> },
    /// A file was not touched
    FileSkipped { file: PathBuf, reason: SkipReason },
    /// A file failed; the pass continues
    FileFailed { file: PathBuf, error: String },
}

/// Source language from a subtitle filename, if it carries one
pub fn detect_source_language<P: AsRef<Path>>(path: P) -> Option<String> {
    let file_name = path.as_ref().file_name()?.to_string_lossy().into_owned();
    detect_language(&file_name)
}

/// Translation service for subtitle files
#[derive(Debug)]
pub struct TranslationService<P: Provider> {
    translator: BatchTranslator<P>,
}

impl<P: Provider> TranslationService<P> {
    /// Create a new translation service
    pub fn new(translator: BatchTranslator<P>) -> Self {
        Self { translator }
    }

    pub fn translator(&self) -> &BatchTranslator<P> {
        &self.translator
    }

    fn load_collection(path: &Path) -> Result<SubtitleCollection> {
        if !FileManager::file_exists(path) {
            return Err(TranslationError::NotFound(path.to_path_buf()).into());
        }

        let bytes = fs::read(path).map_err(TranslationError::Io)?;
        let entries = parse_srt_bytes(&bytes);
        if entries.is_empty() {
            return Err(TranslationError::EmptyInput(path.to_path_buf()).into());
        }

        Ok(SubtitleCollection {
            source_file: path.to_path_buf(),
            entries,
        })
    }

    /// Translate one subtitle file
    ///
    /// Without `source_language` the language segment of the filename is used, and
    /// without that the model detects the language. Without `output_path` the output
    /// goes next to the input with the language segment replaced. Failed batches keep
    /// their original text and are listed in `errors`; only a missing or empty input
    /// is an error.
    pub async fn translate_file<F>(
        &self,
        input_path: &Path,
        target_language: &str,
        source_language: Option<&str>,
        output_path: Option<&Path>,
        progress: F,
    ) -> Result<TranslationResult>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        let collection = Self::load_collection(input_path)?;
        self.translate_collection(collection, target_language, source_language, output_path, progress)
            .await
    }

    async fn translate_collection<F>(
        &self,
        collection: SubtitleCollection,
        target_language: &str,
        source_language: Option<&str>,
        output_path: Option<&Path>,
        progress: F,
    ) -> Result<TranslationResult>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        let input_path = collection.source_file.as_path();
        let detected = detect_source_language(input_path);
        let source_language = source_language
            .map(str::to_string)
            .or(detected)
            .filter(|lang| !lang.trim().is_empty());

        let output_file = match output_path {
            Some(path) => path.to_path_buf(),
            None => FileManager::generate_output_path(input_path, target_language),
        };

        info!(
            "Translating {} ({} entries, {} -> {})",
            input_path.display(),
            collection.entries.len(),
            source_language.as_deref().unwrap_or("auto"),
            target_language
        );

        let texts = collection.texts();
        let (translated, batch_outcomes) = self
            .translator
            .translate_texts(&texts, target_language, source_language.as_deref(), progress)
            .await;

        if translated.len() != texts.len() {
            warn!(
                "Batch results covered {} of {} entries; keeping the original text for the rest",
                translated.len(),
                texts.len()
            );
        }

        let entries = collection.with_texts(&translated);
        write_srt_file(&output_file, &entries)
            .with_context(|| format!("Failed to write translation for {}", input_path.display()))?;

        let errors: Vec<String> = batch_outcomes
            .iter()
            .enumerate()
            .filter(|(_, outcome)| !outcome.success)
            .map(|(i, outcome)| {
                format!(
                    "Batch {}: {}",
                    i + 1,
                    outcome.error.as_deref().unwrap_or("Translation failed")
                )
            })
            .collect();

        for message in &errors {
            warn!("{}", message);
        }

        Ok(TranslationResult {
            input_file: input_path.to_path_buf(),
            output_file,
            total_entries: collection.entries.len(),
            translated_entries: entries.len(),
            batch_outcomes,
            errors,
        })
    }

    // Skip decision for one file of a directory pass
    fn skip_reason(
        file: &Path,
        detected: Option<&str>,
        target_language: &str,
        filter_language: Option<&str>,
    ) -> Option<SkipReason> {
        if let Some(lang) = detected {
            if language_codes_match(lang, target_language) {
                return Some(SkipReason::AlreadyTargetLanguage(lang.to_string()));
            }
        }

        let output = FileManager::generate_output_path(file, target_language);
        if output.exists() {
            return Some(SkipReason::OutputExists(output));
        }

        if let Some(wanted) = filter_language {
            let matches = detected.is_some_and(|lang| language_codes_match(lang, wanted));
            if !matches {
                return Some(SkipReason::LanguageFilter {
                    detected: detected.map(str::to_string),
                    wanted: wanted.to_string(),
                });
            }
        }

        None
    }

    /// Translate every subtitle file directly inside `dir`, one file at a time
    ///
    /// Files already in the target language, files whose output exists, and files
    /// not matching `filter_language` are skipped. A failing file is reported through
    /// `on_event` and does not stop the pass.
    pub async fn translate_directory<F>(
        &self,
        dir: &Path,
        target_language: &str,
        source_language: Option<&str>,
        filter_language: Option<&str>,
        on_event: F,
    ) -> Result<Vec<DirectoryTranslation>>
    where
        F: Fn(DirectoryEvent) + Send + Sync,
    {
        if !FileManager::dir_exists(dir) {
            return Err(TranslationError::NotFound(dir.to_path_buf()).into());
        }

        let files = FileManager::find_files(dir, SRT_EXTENSION)?;
        let total_files = files.len();
        on_event(DirectoryEvent::Discovered { total_files });

        let mut translated = Vec::new();

        for (position, file) in files.iter().enumerate() {
            let detected = detect_source_language(file);

            if let Some(reason) = Self::skip_reason(file, detected.as_deref(), target_language, filter_language) {
                debug!("Skipping {}: {}", file.display(), reason);
                on_event(DirectoryEvent::FileSkipped {
                    file: file.clone(),
                    reason,
                });
                continue;
            }

            let collection = match Self::load_collection(file) {
                Ok(collection) => collection,
                Err(e) => {
                    error!("Failed to load {}: {:#}", file.display(), e);
                    on_event(DirectoryEvent::FileFailed {
                        file: file.clone(),
                        error: format!("{:#}", e),
                    });
                    continue;
                }
            };

            on_event(DirectoryEvent::FileStarted {
                file: file.clone(),
                position: position + 1,
                total_files,
                entry_count: collection.entries.len(),
            });

            let on_event = &on_event;
            let batch_progress = |completed: usize, total: usize| {
                on_event(DirectoryEvent::BatchProgress {
                    file: file.clone(),
                    completed,
                    total,
                });
            };

            let source = source_language.or(detected.as_deref());
            match self
                .translate_collection(collection, target_language, source, None, batch_progress)
                .await
            {
                Ok(result) => {
                    let failed_batches = result.failed_batches();
                    let record = DirectoryTranslation {
                        input_file: result.input_file,
                        output_file: result.output_file,
                        entry_count: result.total_entries,
                    };
                    on_event(DirectoryEvent::FileTranslated {
                        result: record.clone(),
                        failed_batches,
                    });
                    translated.push(record);
                }
                Err(e) => {
                    error!("Failed to translate {}: {:#}", file.display(), e);
                    on_event(DirectoryEvent::FileFailed {
                        file: file.clone(),
                        error: format!("{:#}", e),
                    });
                }
            }
        }

        info!(
            "Directory pass finished: {} of {} files translated",
            translated.len(),
            total_files
        );
        Ok(translated)
    }
}
