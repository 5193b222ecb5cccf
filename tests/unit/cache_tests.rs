/*!
 * Tests for the on-disk response cache
 */

use anyhow::Result;
use std::fs;

use nichi::translation::ResponseCache;
use nichi::translation::cache::{CacheRecord, fingerprint};
use crate::common;

#[test]
fn test_fingerprint_withSameInput_shouldBeHexSha256() {
    let texts = common::strings(&["Hello", "World"]);
    let key = fingerprint(&texts, "id", Some("en"));

    assert_eq!(key.len(), 64);
    assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    assert_eq!(key, fingerprint(&texts, "id", Some("en")));
    assert_ne!(key, fingerprint(&texts, "id", None));
    assert_ne!(key, fingerprint(&common::strings(&["World", "Hello"]), "id", Some("en")));
}

#[test]
fn test_put_withNewInstance_shouldBeReadableAcrossInstances() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let key = fingerprint(&common::strings(&["Hello"]), "fr", None);

    ResponseCache::new(temp_dir.path()).put(&key, "1. Bonjour")?;
    let reopened = ResponseCache::new(temp_dir.path());

    assert_eq!(reopened.get(&key).as_deref(), Some("1. Bonjour"));
    assert_eq!(reopened.stats(), (1, 0));
    Ok(())
}

#[test]
fn test_record_onDisk_shouldCarryFingerprintAndTimestamp() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let cache = ResponseCache::new(temp_dir.path());
    let key = fingerprint(&common::strings(&["Hello"]), "de", Some("en"));

    cache.put(&key, "1. Hallo")?;

    let content = fs::read_to_string(temp_dir.path().join(format!("{}.json", key)))?;
    let record: CacheRecord = serde_json::from_str(&content)?;
    assert_eq!(record.fingerprint, key);
    assert_eq!(record.raw_response, "1. Hallo");
    assert!(chrono::DateTime::parse_from_rfc3339(&record.created_at).is_ok());
    Ok(())
}

#[test]
fn test_get_withMismatchedFingerprint_shouldMissAndDelete() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let cache = ResponseCache::new(temp_dir.path());
    let key = fingerprint(&common::strings(&["Hello"]), "id", None);
    let path = temp_dir.path().join(format!("{}.json", key));

    let foreign = CacheRecord {
        fingerprint: "something-else".to_string(),
        raw_response: "1. Halo".to_string(),
        created_at: chrono::Utc::now().to_rfc3339(),
    };
    fs::write(&path, serde_json::to_string(&foreign)?)?;

    assert_eq!(cache.get(&key), None);
    assert!(!path.exists());
    assert_eq!(cache.stats(), (0, 1));
    Ok(())
}

#[test]
fn test_clear_withStrayFiles_shouldRemoveEverythingButCountRecords() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let cache = ResponseCache::new(temp_dir.path());
    cache.put(&fingerprint(&common::strings(&["a"]), "id", None), "1. A")?;
    cache.put(&fingerprint(&common::strings(&["b"]), "id", None), "1. B")?;
    common::create_test_file(temp_dir.path(), "leftover.tmp", "junk")?;

    assert_eq!(cache.info()?.count, 2);

    let stats = cache.clear()?;
    assert_eq!(stats.removed_count, 2);
    assert!(stats.freed_bytes > 4);
    assert_eq!(fs::read_dir(temp_dir.path())?.count(), 0);

    let info = cache.info()?;
    assert_eq!(info.count, 0);
    assert_eq!(info.total_bytes, 0);
    Ok(())
}
