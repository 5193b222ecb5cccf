/*!
 * Subtitle filename convention.
 *
 * Media servers such as Jellyfin read language, track and modifier flags from
 * dot-separated filename segments: `name[.track].language[.modifier].srt`.
 * This module splits a filename into those parts and rebuilds it for another
 * language. Pure string handling, no filesystem access.
 */

use std::path::Path;

use crate::subtitle_processor::SRT_EXTENSION;

/// Trailing tokens recognized as modifiers
pub const MODIFIER_TOKENS: [&str; 4] = ["sdh", "forced", "cc", "hi"];

/// Whether a segment is one of the known modifier tokens
pub fn is_modifier(segment: &str) -> bool {
    MODIFIER_TOKENS.iter().any(|m| m.eq_ignore_ascii_case(segment))
}

/// Position of the metadata fields at the end of the stem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `name`
    NameOnly,
    /// `name.language`
    NameLanguage,
    /// `name.language.modifier`
    NameLanguageModifier,
    /// `name.track.language`; name absorbs any extra leading segments
    NameTrackLanguage,
    /// `name.track.language.modifier`; name absorbs any extra leading segments
    NameTrackLanguageModifier,
}

impl Layout {
    /// Pick the layout from the stem segment count and whether the last segment is a modifier
    pub fn for_segments(segment_count: usize, last_is_modifier: bool) -> Self {
        match (segment_count, last_is_modifier) {
            (0 | 1, _) => Layout::NameOnly,
            (2, _) => Layout::NameLanguage,
            (3, true) => Layout::NameLanguageModifier,
            (3, false) => Layout::NameTrackLanguage,
            (_, true) => Layout::NameTrackLanguageModifier,
            (_, false) => Layout::NameTrackLanguage,
        }
    }

    // Number of metadata segments after the name: (track, language, modifier)
    fn trailing(&self) -> (bool, bool, bool) {
        match self {
            Layout::NameOnly => (false, false, false),
            Layout::NameLanguage => (false, true, false),
            Layout::NameLanguageModifier => (false, true, true),
            Layout::NameTrackLanguage => (true, true, false),
            Layout::NameTrackLanguageModifier => (true, true, true),
        }
    }
}

/// Decomposed subtitle filename
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubtitleFilename {
    pub name: Option<String>,
    pub track: Option<String>,
    pub language: Option<String>,
    pub modifier: Option<String>,
    /// Extension including the leading dot, empty when absent
    pub extension: String,
}

impl SubtitleFilename {
    /// Parse a filename (a full path is reduced to its file name)
    pub fn parse(filename: &str) -> Self {
        let path = Path::new(filename);
        let file_name = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| filename.to_string());
        let file_path = Path::new(&file_name);

        let extension = file_path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let stem = file_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let segments: Vec<&str> = if stem.is_empty() { Vec::new() } else { stem.split('.').collect() };
        let last_is_modifier = segments.last().is_some_and(|s| is_modifier(s));
        let layout = Layout::for_segments(segments.len(), last_is_modifier);

        let mut result = SubtitleFilename {
            extension,
            ..Default::default()
        };

        let (has_track, has_language, has_modifier) = layout.trailing();
        let mut end = segments.len();
        let mut take_last = |present: bool| -> Option<String> {
            if present && end > 0 {
                end -= 1;
                Some(segments[end].to_string())
            } else {
                None
            }
        };

        result.modifier = take_last(has_modifier);
        result.language = take_last(has_language);
        result.track = take_last(has_track);

        if end > 0 {
            result.name = Some(segments[..end].join("."));
        }

        result
    }

    /// Same filename with the language segment replaced
    pub fn with_language(&self, language: &str) -> Self {
        SubtitleFilename {
            language: Some(language.to_string()),
            ..self.clone()
        }
    }

    /// Rebuild the filename, defaulting to `.srt` when there was no extension
    pub fn to_filename(&self) -> String {
        let parts: Vec<&str> = [&self.name, &self.track, &self.language, &self.modifier]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .collect();

        let extension = if self.extension.is_empty() {
            format!(".{}", SRT_EXTENSION)
        } else {
            self.extension.clone()
        };

        format!("{}{}", parts.join("."), extension)
    }
}

/// Output filename for a translation into `target_language`
///
/// Keeps name, track and modifier; only the language segment changes.
pub fn format_output_filename(input_filename: &str, target_language: &str) -> String {
    SubtitleFilename::parse(input_filename)
        .with_language(target_language)
        .to_filename()
}

/// Language segment of a subtitle filename, if any
pub fn detect_language(filename: &str) -> Option<String> {
    SubtitleFilename::parse(filename).language
}
