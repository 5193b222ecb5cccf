use anyhow::{Context, Result, anyhow};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, info, warn};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::errors::TranslationError;
use crate::file_utils::FileManager;
use crate::language_utils::{get_language_name, supported_languages};
use crate::providers::Provider;
use crate::providers::gemini::Gemini;
use crate::subtitle_processor::SRT_EXTENSION;
use crate::translation::{
    BatchTranslator, CacheInfo, ClearStats, DirectoryEvent, ResponseCache, TranslationResult,
    TranslationService, detect_source_language,
};

// @module: Application controller for subtitle translation

/// Counts of a directory pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FolderSummary {
    pub translated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Main application controller for subtitle translation
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // @returns: Response cache at the configured location
    pub fn response_cache(&self) -> ResponseCache {
        ResponseCache::new(self.config.resolved_cache_dir())
    }

    // @creates: Gemini-backed translation service, validating the config first
    pub fn translation_service(&self) -> Result<TranslationService<Gemini>> {
        self.config
            .validate()
            .context("Translation is not available")?;

        let provider = Gemini::new(
            self.config.api_key.clone(),
            self.config.model.clone(),
            self.config.endpoint.clone(),
            self.config.timeout_secs,
        );

        let translator = BatchTranslator::new(
            provider,
            Some(self.response_cache()),
            self.config.retry_policy(),
            self.config.batch_options(),
        );

        Ok(TranslationService::new(translator))
    }

    /// Make sure the provider answers before starting a run
    pub async fn check_connection<P: Provider>(&self, service: &TranslationService<P>) -> Result<()> {
        service
            .translator()
            .provider()
            .test_connection()
            .await
            .map_err(TranslationError::Provider)
            .context("Cannot reach the translation service")?;
        Ok(())
    }

    fn target_or_default<'a>(&'a self, target_language: Option<&'a str>) -> &'a str {
        target_language.unwrap_or(&self.config.default_target_language)
    }

    fn bar_style(unit: &str) -> ProgressStyle {
        let template = format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}} {{eta}}",
            unit
        );
        ProgressStyle::default_bar()
            .template(&template)
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░")
    }

    // @formats: Duration for summaries
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;
        if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }

    /// Translate one file with the configured remote service
    ///
    /// Returns `None` when the output exists and `force_overwrite` is not set.
    pub async fn run_file(
        &self,
        input_file: &Path,
        target_language: Option<&str>,
        source_language: Option<&str>,
        output_file: Option<&Path>,
        force_overwrite: bool,
    ) -> Result<Option<TranslationResult>> {
        let service = self.translation_service()?;
        self.run_file_with(&service, input_file, target_language, source_language, output_file, force_overwrite)
            .await
    }

    /// Translate one file with the given service
    pub async fn run_file_with<P: Provider>(
        &self,
        service: &TranslationService<P>,
        input_file: &Path,
        target_language: Option<&str>,
        source_language: Option<&str>,
        output_file: Option<&Path>,
        force_overwrite: bool,
    ) -> Result<Option<TranslationResult>> {
        let start_time = Instant::now();
        let target_language = self.target_or_default(target_language);

        let planned_output = match output_file {
            Some(path) => path.to_path_buf(),
            None => FileManager::generate_output_path(input_file, target_language),
        };
        if planned_output.exists() && !force_overwrite {
            warn!(
                "Output file already exists: {}. Use --force to overwrite.",
                planned_output.display()
            );
            return Ok(None);
        }

        self.check_connection(service).await?;

        let progress_bar = ProgressBar::new(0);
        progress_bar.set_style(Self::bar_style("batches"));
        progress_bar.set_message(format!("→ {}", get_language_name(target_language)));

        let bar = progress_bar.clone();
        let result = service
            .translate_file(
                input_file,
                target_language,
                source_language,
                Some(&planned_output),
                move |completed, total| {
                    bar.set_length(total as u64);
                    bar.set_position(completed as u64);
                },
            )
            .await;

        let result = match result {
            Ok(result) => result,
            Err(e) => {
                progress_bar.abandon_with_message("Translation failed");
                return Err(e);
            }
        };
        progress_bar.finish_with_message("Translation complete");

        info!(
            "Translated {} entries into {} in {}",
            result.translated_entries,
            result.output_filename(),
            Self::format_duration(start_time.elapsed())
        );
        if !result.is_complete() {
            warn!(
                "{} of {} batches kept their original text: {}",
                result.errors.len(),
                result.batch_outcomes.len(),
                result.errors.join("; ")
            );
        }

        Ok(Some(result))
    }

    /// Translate every subtitle file in a folder with the configured remote service
    pub async fn run_folder(
        &self,
        input_dir: &Path,
        target_language: Option<&str>,
        source_language: Option<&str>,
        filter_language: Option<&str>,
    ) -> Result<FolderSummary> {
        let service = self.translation_service()?;
        self.run_folder_with(&service, input_dir, target_language, source_language, filter_language)
            .await
    }

    /// Translate every subtitle file in a folder with the given service
    pub async fn run_folder_with<P: Provider>(
        &self,
        service: &TranslationService<P>,
        input_dir: &Path,
        target_language: Option<&str>,
        source_language: Option<&str>,
        filter_language: Option<&str>,
    ) -> Result<FolderSummary> {
        let start_time = Instant::now();
        let target_language = self.target_or_default(target_language);

        if !FileManager::dir_exists(input_dir) {
            return Err(anyhow!("Input directory does not exist: {}", input_dir.display()));
        }

        self.check_connection(service).await?;

        let multi_progress = MultiProgress::new();
        let folder_pb = multi_progress.add(ProgressBar::new(0));
        folder_pb.set_style(Self::bar_style("files"));
        folder_pb.set_message("Processing files");

        let file_pb: Mutex<Option<ProgressBar>> = Mutex::new(None);
        let skipped = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);

        let translated = service
            .translate_directory(input_dir, target_language, source_language, filter_language, |event| {
                match event {
                    DirectoryEvent::Discovered { total_files } => {
                        folder_pb.set_length(total_files as u64);
                        if total_files == 0 {
                            warn!("No subtitle files found in {}", input_dir.display());
                        }
                    }
                    DirectoryEvent::FileStarted { file, position, total_files, entry_count } => {
                        let name = display_name(&file);
                        folder_pb.set_message(format!("Processing: {}", name));
                        info!("[{}/{}] {} ({} entries)", position, total_files, name, entry_count);
                        let pb = multi_progress.add(ProgressBar::new(0));
                        pb.set_style(Self::bar_style("batches"));
                        *file_pb.lock() = Some(pb);
                    }
                    DirectoryEvent::BatchProgress { completed, total, .. } => {
                        if let Some(pb) = file_pb.lock().as_ref() {
                            pb.set_length(total as u64);
                            pb.set_position(completed as u64);
                        }
                    }
                    DirectoryEvent::FileTranslated { result, failed_batches } => {
                        if let Some(pb) = file_pb.lock().take() {
                            pb.finish_and_clear();
                        }
                        if failed_batches.is_empty() {
                            info!("Wrote {}", display_name(&result.output_file));
                        } else {
                            warn!(
                                "Wrote {} with original text for batches {:?}",
                                display_name(&result.output_file),
                                failed_batches
                            );
                        }
                        folder_pb.inc(1);
                    }
                    DirectoryEvent::FileSkipped { file, reason } => {
                        info!("Skipping {}: {}", display_name(&file), reason);
                        skipped.fetch_add(1, Ordering::Relaxed);
                        folder_pb.inc(1);
                    }
                    DirectoryEvent::FileFailed { file, error } => {
                        if let Some(pb) = file_pb.lock().take() {
                            pb.abandon();
                        }
                        error!("Error processing file {}: {}", display_name(&file), error);
                        failed.fetch_add(1, Ordering::Relaxed);
                        folder_pb.inc(1);
                    }
                }
            })
            .await?;

        folder_pb.finish_with_message("Folder processing complete");

        let summary = FolderSummary {
            translated: translated.len(),
            skipped: skipped.load(Ordering::Relaxed),
            failed: failed.load(Ordering::Relaxed),
        };
        info!(
            "Folder processing completed: {} translated, {} skipped, {} errors in {}",
            summary.translated,
            summary.skipped,
            summary.failed,
            Self::format_duration(start_time.elapsed())
        );

        Ok(summary)
    }

    /// Cache statistics
    pub fn cache_info(&self) -> Result<CacheInfo> {
        self.response_cache().info()
    }

    /// Remove every cached response
    pub fn clear_cache(&self) -> Result<ClearStats> {
        self.response_cache().clear()
    }

    /// Subtitle files directly inside `dir` with the language found in their names
    pub fn subtitle_overview(&self, dir: &Path) -> Result<Vec<(PathBuf, Option<String>)>> {
        if !FileManager::dir_exists(dir) {
            return Err(anyhow!("Directory does not exist: {}", dir.display()));
        }

        let files = FileManager::find_files(dir, SRT_EXTENSION)?;
        Ok(files
            .into_iter()
            .map(|file| {
                let language = detect_source_language(&file);
                (file, language)
            })
            .collect())
    }

    /// Lines listing the supported languages and the default target
    pub fn language_listing(&self) -> Vec<String> {
        let mut lines: Vec<String> = supported_languages()
            .iter()
            .map(|(code, name)| format!("{:<4} {}", code, name))
            .collect();
        lines.push(String::new());
        lines.push(format!(
            "Default target: {} ({})",
            self.config.default_target_language,
            get_language_name(&self.config.default_target_language)
        ));
        lines
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Directory to operate on when none is given
pub fn default_directory() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
