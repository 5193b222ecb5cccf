use std::env;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::TranslationError;
use crate::translation::batch::{BatchOptions, RetryPolicy};

/// Application configuration module
/// This module handles loading the configuration file, the `.env` files and the
/// environment overrides, and validating the result before the translation
/// subsystem is built.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// API key for the translation service
    #[serde(default)]
    pub api_key: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Service base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Number of subtitle entries per request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Retries after the first attempt of a batch
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff delay in seconds, doubled on every retry
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: f64,

    /// Upper bound for a single backoff delay in seconds
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: f64,

    /// Maximum batches in flight at once
    #[serde(default = "default_max_concurrent_batches")]
    pub max_concurrent_batches: usize,

    /// Target language used when none is given
    #[serde(default = "default_target_language")]
    pub default_target_language: String,

    /// Response cache directory, platform cache dir when unset
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching `log` filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Environment variable names recognized as overrides
pub mod env_keys {
    pub const API_KEY: &str = "GOOGLE_AI_API_KEY";
    pub const MODEL: &str = "GEMINI_MODEL_NAME";
    pub const BATCH_SIZE: &str = "TRANSLATION_BATCH_SIZE";
    pub const MAX_RETRIES: &str = "GEMINI_MAX_RETRIES";
    pub const BASE_DELAY: &str = "GEMINI_BASE_DELAY";
    pub const MAX_DELAY: &str = "GEMINI_MAX_DELAY";
    pub const MAX_CONCURRENT: &str = "MAX_CONCURRENT_REQUESTS";
    pub const DEFAULT_TARGET_LANGUAGE: &str = "DEFAULT_TARGET_LANGUAGE";
    pub const CACHE_DIR: &str = "NICHI_CACHE_DIR";
}

fn default_model() -> String {
    "gemini-2.0-flash-exp".to_string()
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_batch_size() -> usize {
    200
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_secs() -> f64 {
    1.0
}

fn default_max_delay_secs() -> f64 {
    60.0
}

fn default_max_concurrent_batches() -> usize {
    5
}

fn default_target_language() -> String {
    "id".to_string()
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            api_key: String::new(),
            model: default_model(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            base_delay_secs: default_base_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
            max_concurrent_batches: default_max_concurrent_batches(),
            default_target_language: default_target_language(),
            cache_dir: None,
            log_level: LogLevel::default(),
        }
    }
}

/// Candidate `.env` locations in order of precedence
pub fn env_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        candidates.push(cwd.join(".env"));
    }
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".env"));
        candidates.push(home.join(".config").join("nichi").join(".env"));
    }
    candidates.push(PathBuf::from("/etc/nichi/.env"));
    candidates
}

/// Load the first `.env` file found, returning its path
///
/// Variables already present in the environment are left untouched.
pub fn load_env_file() -> Option<PathBuf> {
    for candidate in env_file_candidates() {
        if candidate.is_file() {
            match dotenvy::from_path(&candidate) {
                Ok(()) => {
                    debug!("Loaded environment from {}", candidate.display());
                    return Some(candidate);
                }
                Err(e) => debug!("Ignoring unreadable env file {}: {}", candidate.display(), e),
            }
        }
    }
    None
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, TranslationError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| TranslationError::configuration(key, format!("Invalid numeric value: {}", value)))
}

// Out-of-range values saturate; `validate` reports them
fn delay_from_secs(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

impl Config {
    /// Load the JSON configuration file if it exists, defaults otherwise
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("Config file {} not found, using defaults", path.display());
            return Ok(Config::default());
        }

        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let config: Config = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Full load: config file, `.env` discovery, then environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        load_env_file();
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), TranslationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(env_keys::API_KEY).filter(|v| !v.trim().is_empty()) {
            self.api_key = value.trim().to_string();
        }
        if let Some(value) = lookup(env_keys::MODEL).filter(|v| !v.trim().is_empty()) {
            self.model = value.trim().to_string();
        }
        if let Some(value) = lookup(env_keys::BATCH_SIZE) {
            self.batch_size = parse_env(env_keys::BATCH_SIZE, &value)?;
        }
        if let Some(value) = lookup(env_keys::MAX_RETRIES) {
            self.max_retries = parse_env(env_keys::MAX_RETRIES, &value)?;
        }
        if let Some(value) = lookup(env_keys::BASE_DELAY) {
            self.base_delay_secs = parse_env(env_keys::BASE_DELAY, &value)?;
        }
        if let Some(value) = lookup(env_keys::MAX_DELAY) {
            self.max_delay_secs = parse_env(env_keys::MAX_DELAY, &value)?;
        }
        if let Some(value) = lookup(env_keys::MAX_CONCURRENT) {
            self.max_concurrent_batches = parse_env(env_keys::MAX_CONCURRENT, &value)?;
        }
        if let Some(value) = lookup(env_keys::DEFAULT_TARGET_LANGUAGE).filter(|v| !v.trim().is_empty()) {
            self.default_target_language = value.trim().to_string();
        }
        if let Some(value) = lookup(env_keys::CACHE_DIR).filter(|v| !v.trim().is_empty()) {
            self.cache_dir = Some(PathBuf::from(value.trim()));
        }
        Ok(())
    }

    /// Validate the values the translation subsystem depends on
    pub fn validate(&self) -> Result<(), TranslationError> {
        if self.api_key.trim().is_empty() {
            return Err(TranslationError::configuration(
                env_keys::API_KEY,
                "API key not found. Set it in ./.env, ~/.env, ~/.config/nichi/.env or the environment",
            ));
        }
        if self.model.trim().is_empty() {
            return Err(TranslationError::configuration(env_keys::MODEL, "Model name is empty"));
        }
        if self.batch_size == 0 {
            return Err(TranslationError::configuration(env_keys::BATCH_SIZE, "Batch size must be at least 1"));
        }
        if self.max_concurrent_batches == 0 {
            return Err(TranslationError::configuration(
                env_keys::MAX_CONCURRENT,
                "Concurrency must be at least 1",
            ));
        }
        for (key, value) in [
            (env_keys::BASE_DELAY, self.base_delay_secs),
            (env_keys::MAX_DELAY, self.max_delay_secs),
        ] {
            if !value.is_finite() || value < 0.0 || Duration::try_from_secs_f64(value).is_err() {
                return Err(TranslationError::configuration(key, format!("Invalid delay: {}", value)));
            }
        }
        if self.base_delay_secs > self.max_delay_secs {
            return Err(TranslationError::configuration(
                env_keys::BASE_DELAY,
                "Base delay cannot exceed the maximum delay",
            ));
        }
        Ok(())
    }

    /// Retry settings handed to the batch client
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: delay_from_secs(self.base_delay_secs),
            max_delay: delay_from_secs(self.max_delay_secs),
            jitter: true,
        }
    }

    /// Batching settings handed to the batch client
    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            batch_size: self.batch_size.max(1),
            max_concurrent_batches: self.max_concurrent_batches.max(1),
        }
    }

    /// Resolved response cache directory
    pub fn resolved_cache_dir(&self) -> PathBuf {
        match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => dirs::cache_dir()
                .unwrap_or_else(env::temp_dir)
                .join("nichi")
                .join("translations"),
        }
    }
}
