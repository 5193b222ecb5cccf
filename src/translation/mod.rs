/*!
 * Translation service for subtitle files using a remote language model.
 *
 * This module contains the core functionality for translating subtitles in
 * batches. It is split into several submodules:
 *
 * - `core`: File and directory translation service
 * - `batch`: Concurrent batch translation with retry and backoff
 * - `cache`: On-disk cache of raw model responses
 * - `parsing`: Recovery of numbered translations from model output
 * - `prompts`: Prompt template for a batch
 */

// Re-export main types for easier usage
pub use self::batch::{BatchOptions, BatchOutcome, BatchTranslator, RetryPolicy, TranslationBatch};
pub use self::cache::{CacheInfo, ClearStats, ResponseCache};
pub use self::core::{
    DirectoryEvent, DirectoryTranslation, SkipReason, TranslationResult, TranslationService,
    detect_source_language,
};
pub use self::parsing::parse_response;
pub use self::prompts::PromptTemplate;

// Submodules
pub mod batch;
pub mod cache;
pub mod core;
pub mod parsing;
pub mod prompts;
