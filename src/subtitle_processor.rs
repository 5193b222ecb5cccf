use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use regex::Regex;
use once_cell::sync::Lazy;
use anyhow::{Result, Context, anyhow};
use log::{debug, warn};

// @module: Subtitle entry model and SRT codec

/// File extension handled by the codec
pub const SRT_EXTENSION: &str = "srt";

// @const: SRT time range line, dot accepted in place of the comma
static TIME_RANGE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d{2}:\d{2}:\d{2}[,.]\d{3})\s*-->\s*(\d{2}:\d{2}:\d{2}[,.]\d{3})")
        .expect("time range regex is valid")
});

// @const: Single timestamp
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2}):(\d{2}):(\d{2})[,.](\d{3})$").expect("timestamp regex is valid")
});

/// Wall-clock offset with millisecond resolution
///
/// Every field is clamped into its own range on construction; there is no carry
/// between fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    hours: u8,
    minutes: u8,
    seconds: u8,
    millis: u16,
}

impl Timestamp {
    /// Build a timestamp, clamping each component
    pub fn new(hours: u32, minutes: u32, seconds: u32, millis: u32) -> Self {
        Self {
            hours: hours.min(99) as u8,
            minutes: minutes.min(59) as u8,
            seconds: seconds.min(59) as u8,
            millis: millis.min(999) as u16,
        }
    }

    /// Build a timestamp from a millisecond offset
    pub fn from_millis(ms: u64) -> Self {
        Self::new(
            (ms / 3_600_000).min(99) as u32,
            ((ms % 3_600_000) / 60_000) as u32,
            ((ms % 60_000) / 1_000) as u32,
            (ms % 1_000) as u32,
        )
    }

    /// Total offset in milliseconds
    pub fn as_millis(&self) -> u64 {
        self.hours as u64 * 3_600_000
            + self.minutes as u64 * 60_000
            + self.seconds as u64 * 1_000
            + self.millis as u64
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02},{:03}", self.hours, self.minutes, self.seconds, self.millis)
    }
}

impl FromStr for Timestamp {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let caps = TIMESTAMP_REGEX
            .captures(s.trim())
            .ok_or_else(|| anyhow!("Invalid timestamp format: {}", s))?;

        let field = |i: usize| -> Result<u32> {
            caps[i].parse::<u32>().with_context(|| format!("Invalid timestamp field in {}", s))
        };

        Ok(Self::new(field(1)?, field(2)?, field(3)?, field(4)?))
    }
}

// @struct: Single subtitle entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    // @field: Sequence number as found in the file
    pub index: usize,

    // @field: Start offset
    pub start: Timestamp,

    // @field: End offset
    pub end: Timestamp,

    // @field: Cue text, embedded newlines preserved
    pub text: String,
}

impl SubtitleEntry {
    /// Creates a new subtitle entry
    pub fn new(index: usize, start: Timestamp, end: Timestamp, text: impl Into<String>) -> Self {
        SubtitleEntry {
            index,
            start,
            end,
            text: text.into(),
        }
    }

    /// Same entry with its text replaced
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        SubtitleEntry {
            index: self.index,
            start: self.start,
            end: self.end,
            text: text.into(),
        }
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.index)?;
        writeln!(f, "{} --> {}", self.start, self.end)?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Text encodings attempted when decoding a subtitle file, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Windows1252,
    Latin1,
}

/// Decode attempt order
pub const DECODE_PRIORITY: [TextEncoding; 3] = [
    TextEncoding::Utf8,
    TextEncoding::Windows1252,
    TextEncoding::Latin1,
];

// 0x80..=0x9F in Windows-1252; None marks the five unassigned bytes
const WINDOWS_1252_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'), None, Some('\u{201A}'), Some('\u{0192}'),
    Some('\u{201E}'), Some('\u{2026}'), Some('\u{2020}'), Some('\u{2021}'),
    Some('\u{02C6}'), Some('\u{2030}'), Some('\u{0160}'), Some('\u{2039}'),
    Some('\u{0152}'), None, Some('\u{017D}'), None,
    None, Some('\u{2018}'), Some('\u{2019}'), Some('\u{201C}'),
    Some('\u{201D}'), Some('\u{2022}'), Some('\u{2013}'), Some('\u{2014}'),
    Some('\u{02DC}'), Some('\u{2122}'), Some('\u{0161}'), Some('\u{203A}'),
    Some('\u{0153}'), None, Some('\u{017E}'), Some('\u{0178}'),
];

impl TextEncoding {
    /// Decode bytes, returning None when they are not valid in this encoding
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
            TextEncoding::Windows1252 => bytes
                .iter()
                .map(|&b| match b {
                    0x80..=0x9F => WINDOWS_1252_HIGH[(b - 0x80) as usize],
                    _ => Some(b as char),
                })
                .collect(),
            TextEncoding::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

/// Decode subtitle bytes with the first encoding that accepts them
pub fn decode_subtitle_bytes(bytes: &[u8]) -> (String, TextEncoding) {
    for encoding in DECODE_PRIORITY {
        if let Some(text) = encoding.decode(bytes) {
            return (text, encoding);
        }
    }
    // Latin-1 maps every byte, so the loop always returns
    (String::from_utf8_lossy(bytes).into_owned(), TextEncoding::Latin1)
}

/// Parse raw subtitle bytes into entries
pub fn parse_srt_bytes(bytes: &[u8]) -> Vec<SubtitleEntry> {
    let (content, encoding) = decode_subtitle_bytes(bytes);
    if encoding != TextEncoding::Utf8 {
        debug!("Subtitle content decoded as {:?}", encoding);
    }
    parse_srt_string(&content)
}

/// Parse SRT text into entries
///
/// A block ends only where a blank line is followed by a numeric index line whose next
/// non-blank line is a time range, so blank lines and bare numbers inside cue text stay
/// part of the cue. Malformed blocks are skipped.
pub fn parse_srt_string(content: &str) -> Vec<SubtitleEntry> {
    let content = content.trim_start_matches('\u{feff}');
    let lines: Vec<&str> = content.lines().collect();

    let mut blocks: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut after_blank = true;

    for (i, &line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !current.is_empty() {
                current.push(line);
            }
            after_blank = true;
            continue;
        }

        if after_blank && !current.is_empty() && starts_block(&lines, i) {
            blocks.push(std::mem::take(&mut current));
        }

        current.push(line);
        after_blank = false;
    }

    if !current.is_empty() {
        blocks.push(current);
    }

    let total_blocks = blocks.len();
    let entries: Vec<SubtitleEntry> = blocks.iter().filter_map(|block| parse_block(block)).collect();

    if entries.len() != total_blocks {
        warn!("Skipped {} malformed subtitle block(s)", total_blocks - entries.len());
    }

    entries
}

fn is_index_line(line: &str) -> bool {
    !line.is_empty() && line.bytes().all(|b| b.is_ascii_digit())
}

// An index line opens a block only when the next non-blank line is a time range
fn starts_block(lines: &[&str], at: usize) -> bool {
    if !is_index_line(lines[at].trim()) {
        return false;
    }
    lines[at + 1..]
        .iter()
        .find(|line| !line.trim().is_empty())
        .is_some_and(|line| TIME_RANGE_REGEX.is_match(line))
}

fn parse_block(lines: &[&str]) -> Option<SubtitleEntry> {
    if lines.len() < 3 {
        return None;
    }

    let index = lines[0].trim().parse::<usize>().ok()?;

    let caps = TIME_RANGE_REGEX.captures(lines[1])?;
    let start = caps[1].parse::<Timestamp>().ok()?;
    let end = caps[2].parse::<Timestamp>().ok()?;

    let text = lines[2..].join("\n");
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    Some(SubtitleEntry::new(index, start, end, text))
}

/// Serialize entries in the given order
pub fn serialize_entries(entries: &[SubtitleEntry]) -> String {
    entries.iter().map(|entry| entry.to_string()).collect()
}

/// Read and parse an SRT file
pub fn read_srt_file<P: AsRef<Path>>(path: P) -> Result<Vec<SubtitleEntry>> {
    let path = path.as_ref();
    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read subtitle file: {}", path.display()))?;
    Ok(parse_srt_bytes(&bytes))
}

/// Write entries to an SRT file
///
/// Content goes to a temporary file in the target directory which is then renamed over
/// the destination.
pub fn write_srt_file<P: AsRef<Path>>(path: P, entries: &[SubtitleEntry]) -> Result<()> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    fs::create_dir_all(&parent)
        .with_context(|| format!("Failed to create directory: {}", parent.display()))?;

    let mut file = tempfile::NamedTempFile::new_in(&parent)
        .with_context(|| format!("Failed to create temporary file in {}", parent.display()))?;
    file.write_all(serialize_entries(entries).as_bytes())?;
    file.flush()?;
    file.persist(path)
        .map_err(|e| anyhow!("Failed to write subtitle file {}: {}", path.display(), e.error))?;

    Ok(())
}

/// Collection of subtitle entries with metadata
#[derive(Debug, Clone)]
pub struct SubtitleCollection {
    /// Source filename
    pub source_file: PathBuf,

    /// List of subtitle entries
    pub entries: Vec<SubtitleEntry>,
}

impl SubtitleCollection {
    /// Load a collection from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        Ok(SubtitleCollection {
            source_file: path.to_path_buf(),
            entries: read_srt_file(path)?,
        })
    }

    /// Entry texts in order
    pub fn texts(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.text.clone()).collect()
    }

    /// Pair original indices and timings with new texts at the same position
    ///
    /// Entries without a corresponding text keep their original text.
    pub fn with_texts(&self, texts: &[String]) -> Vec<SubtitleEntry> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, entry)| match texts.get(i) {
                Some(text) => entry.with_text(text.clone()),
                None => entry.clone(),
            })
            .collect()
    }

    /// Write the collection to an SRT file
    pub fn write_to_srt<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_srt_file(path, &self.entries)
    }
}
