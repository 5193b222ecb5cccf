/*!
 * Tests for subtitle processing functionality
 */

use anyhow::Result;
use std::fs;

use nichi::subtitle_processor::{
    SubtitleCollection, SubtitleEntry, Timestamp, parse_srt_bytes, read_srt_file, serialize_entries,
    write_srt_file,
};
use crate::common;

/// Test reading the shared sample file from disk
#[test]
fn test_read_srt_file_withSample_shouldParseAllEntries() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_subtitle(temp_dir.path(), "sample.en.srt")?;

    let entries = read_srt_file(&path)?;

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].index, 1);
    assert_eq!(entries[0].start.as_millis(), 1_000);
    assert_eq!(entries[2].end.to_string(), "00:00:14,000");
    assert_eq!(entries[1].text, "It contains multiple entries.");
    Ok(())
}

/// Test that a collection survives a write and a re-read unchanged
#[test]
fn test_collection_writeThenRead_shouldPreserveEntries() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(
        temp_dir.path(),
        "dialog.en.srt",
        "1\n00:00:01,000 --> 00:00:02,500\n- Hello\n- Hi there\n\n2\n00:01:00,000 --> 00:01:03,000\nFirst line\n\nafter a gap\n",
    )?;

    let collection = SubtitleCollection::from_file(&input)?;
    assert_eq!(collection.entries.len(), 2);
    assert_eq!(collection.entries[1].text, "First line\n\nafter a gap");

    let output = temp_dir.path().join("copy.en.srt");
    collection.write_to_srt(&output)?;

    let reloaded = SubtitleCollection::from_file(&output)?;
    assert_eq!(reloaded.entries, collection.entries);
    Ok(())
}

/// Test that writing creates missing parent directories
#[test]
fn test_write_srt_file_withMissingParent_shouldCreateIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let output = temp_dir.path().join("nested").join("deeper").join("out.srt");
    let entries = vec![SubtitleEntry::new(
        1,
        Timestamp::new(0, 0, 1, 0),
        Timestamp::new(0, 0, 2, 0),
        "Hello",
    )];

    write_srt_file(&output, &entries)?;

    assert_eq!(fs::read_to_string(&output)?, "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n");
    Ok(())
}

/// Test replacing texts while keeping indices and timings
#[test]
fn test_with_texts_withShortList_shouldKeepRemainingOriginals() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_subtitle(temp_dir.path(), "sample.srt")?;
    let collection = SubtitleCollection::from_file(&path)?;

    let replaced = collection.with_texts(&common::strings(&["Satu"]));

    assert_eq!(replaced.len(), 3);
    assert_eq!(replaced[0].text, "Satu");
    assert_eq!(replaced[0].start, collection.entries[0].start);
    assert_eq!(replaced[1].text, collection.entries[1].text);
    assert_eq!(replaced[2].index, 3);
    Ok(())
}

/// Test that Windows-1252 content decodes to the expected characters
#[test]
fn test_parse_srt_bytes_withWindows1252Quotes_shouldDecode() {
    let mut bytes = b"1\r\n00:00:01,000 --> 00:00:02,000\r\n".to_vec();
    bytes.extend_from_slice(&[0x93, b'C', b'a', b'f', 0xE9, 0x94]);
    bytes.extend_from_slice(b"\r\n");

    let entries = parse_srt_bytes(&bytes);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].text, "\u{201C}Caf\u{e9}\u{201D}");
}

/// Test that an input with no valid blocks yields nothing
#[test]
fn test_parse_srt_bytes_withNoValidBlocks_shouldBeEmpty() {
    assert!(parse_srt_bytes(b"").is_empty());
    assert!(parse_srt_bytes(b"just some notes\nwithout timings\n").is_empty());
    assert_eq!(serialize_entries(&[]), "");
}
