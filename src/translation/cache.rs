/*!
 * Response cache for batch translations.
 *
 * Raw model responses are stored on disk, one JSON file per request fingerprint.
 * The fingerprint is a SHA-256 digest of the canonical JSON encoding of the batch
 * texts and language pair, so identical requests always map to the same file no
 * matter which process or platform computed it.
 *
 * Only the raw response is cached. Parsing happens again on every read, which lets
 * parser fixes apply to entries written by older versions.
 */

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

/// File extension of cache records
const RECORD_EXTENSION: &str = "json";

// Field order is the serialization order; keep it alphabetical
#[derive(Serialize)]
struct FingerprintInput<'a> {
    source_language: Option<&'a str>,
    target_language: &'a str,
    texts: &'a [String],
}

/// Compute the cache fingerprint of a batch request
///
/// Returns the lowercase hex SHA-256 of the canonical JSON encoding of
/// `(source_language, target_language, texts)`.
pub fn fingerprint(texts: &[String], target_language: &str, source_language: Option<&str>) -> String {
    let input = FingerprintInput {
        source_language,
        target_language,
        texts,
    };
    // Serializing plain strings cannot fail
    let canonical = serde_json::to_vec(&input).unwrap_or_default();
    let digest = Sha256::digest(&canonical);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// One persisted response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheRecord {
    pub fingerprint: String,
    pub raw_response: String,
    /// RFC 3339 creation time
    pub created_at: String,
}

/// Summary of the cache contents
#[derive(Debug, Clone, PartialEq)]
pub struct CacheInfo {
    pub directory: PathBuf,
    pub count: usize,
    pub total_bytes: u64,
}

impl CacheInfo {
    /// Total size in megabytes
    pub fn size_mb(&self) -> f64 {
        self.total_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Result of clearing the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClearStats {
    pub removed_count: usize,
    pub freed_bytes: u64,
}

/// File-per-fingerprint response cache
#[derive(Debug)]
pub struct ResponseCache {
    /// Directory holding the records
    directory: PathBuf,

    /// Cache hit counter
    hits: AtomicUsize,

    /// Cache miss counter
    misses: AtomicUsize,
}

impl ResponseCache {
    /// Create a cache rooted at `directory`; the directory is created on first write
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Directory holding the records
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn record_path(&self, fingerprint: &str) -> PathBuf {
        self.directory.join(format!("{}.{}", fingerprint, RECORD_EXTENSION))
    }

    /// Look up the raw response stored for a fingerprint
    ///
    /// A record that cannot be read or decoded is deleted and reported as a miss.
    pub fn get(&self, fingerprint: &str) -> Option<String> {
        let path = self.record_path(fingerprint);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    warn!("Unreadable cache entry {}: {}", path.display(), e);
                    self.discard(&path);
                }
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        match serde_json::from_str::<CacheRecord>(&content) {
            Ok(record) if record.fingerprint == fingerprint => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for {}", &fingerprint[..fingerprint.len().min(12)]);
                Some(record.raw_response)
            }
            Ok(_) => {
                warn!("Cache entry {} does not match its fingerprint, removing", path.display());
                self.discard(&path);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                warn!("Corrupted cache entry {}: {}, removing", path.display(), e);
                self.discard(&path);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn discard(&self, path: &Path) {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != ErrorKind::NotFound {
                warn!("Failed to remove cache entry {}: {}", path.display(), e);
            }
        }
    }

    /// Store a raw response
    ///
    /// The record is written to a temporary file in the cache directory and renamed
    /// into place, so readers never observe a partial record.
    pub fn put(&self, fingerprint: &str, raw_response: &str) -> Result<()> {
        fs::create_dir_all(&self.directory)
            .with_context(|| format!("Failed to create cache directory: {}", self.directory.display()))?;

        let record = CacheRecord {
            fingerprint: fingerprint.to_string(),
            raw_response: raw_response.to_string(),
            created_at: Utc::now().to_rfc3339(),
        };
        let json = serde_json::to_string_pretty(&record).context("Failed to encode cache record")?;

        let mut temp = NamedTempFile::new_in(&self.directory)
            .with_context(|| format!("Failed to create temp file in {}", self.directory.display()))?;
        temp.write_all(json.as_bytes())
            .context("Failed to write cache record")?;
        temp.flush().context("Failed to flush cache record")?;

        let path = self.record_path(fingerprint);
        temp.persist(&path)
            .with_context(|| format!("Failed to move cache record into place: {}", path.display()))?;

        debug!("Cached response for {}", &fingerprint[..fingerprint.len().min(12)]);
        Ok(())
    }

    fn record_files(&self) -> Result<Vec<(PathBuf, u64)>> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read cache directory: {}", self.directory.display()));
            }
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.context("Failed to read cache directory entry")?;
            let metadata = entry.metadata().context("Failed to read cache entry metadata")?;
            if metadata.is_file() {
                files.push((entry.path(), metadata.len()));
            }
        }
        Ok(files)
    }

    /// Count records and their total size
    pub fn info(&self) -> Result<CacheInfo> {
        let records: Vec<(PathBuf, u64)> = self
            .record_files()?
            .into_iter()
            .filter(|(path, _)| path.extension().is_some_and(|e| e == RECORD_EXTENSION))
            .collect();

        Ok(CacheInfo {
            directory: self.directory.clone(),
            count: records.len(),
            total_bytes: records.iter().map(|(_, size)| size).sum(),
        })
    }

    /// Delete every record, leaving an empty cache directory
    pub fn clear(&self) -> Result<ClearStats> {
        let mut stats = ClearStats::default();

        for (path, size) in self.record_files()? {
            fs::remove_file(&path).with_context(|| format!("Failed to remove cache entry: {}", path.display()))?;
            if path.extension().is_some_and(|e| e == RECORD_EXTENSION) {
                stats.removed_count += 1;
            }
            stats.freed_bytes += size;
        }

        fs::create_dir_all(&self.directory)
            .with_context(|| format!("Failed to create cache directory: {}", self.directory.display()))?;

        debug!(
            "Cleared {} cache entries ({} bytes)",
            stats.removed_count, stats.freed_bytes
        );
        Ok(stats)
    }

    /// Hits and misses observed by this instance
    pub fn stats(&self) -> (usize, usize) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }
}
