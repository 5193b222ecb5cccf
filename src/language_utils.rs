use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for subtitle translation
///
/// Holds the table of languages offered for translation and helpers for
/// turning ISO 639-1 / 639-2 codes into names the model understands.
/// Languages offered for translation, as (code, English name)
const SUPPORTED_LANGUAGES: [(&str, &str); 22] = [
    ("en", "English"),
    ("id", "Indonesian"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("ru", "Russian"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("zh", "Chinese"),
    ("ar", "Arabic"),
    ("hi", "Hindi"),
    ("th", "Thai"),
    ("vi", "Vietnamese"),
    ("nl", "Dutch"),
    ("sv", "Swedish"),
    ("da", "Danish"),
    ("no", "Norwegian"),
    ("fi", "Finnish"),
    ("pl", "Polish"),
    ("tr", "Turkish"),
];

/// The supported language table in display order
pub fn supported_languages() -> &'static [(&'static str, &'static str)] {
    &SUPPORTED_LANGUAGES
}

/// Whether a code is in the supported table
pub fn is_supported(code: &str) -> bool {
    let code = code.trim().to_lowercase();
    SUPPORTED_LANGUAGES.iter().any(|(c, _)| *c == code)
}

// ISO 639-2/B codes that differ from their 639-2/T form
fn bibliographic_to_terminology(code: &str) -> Option<&'static str> {
    Some(match code {
        "fre" => "fra",
        "ger" => "deu",
        "dut" => "nld",
        "gre" => "ell",
        "chi" => "zho",
        "cze" => "ces",
        "ice" => "isl",
        "alb" => "sqi",
        "arm" => "hye",
        "baq" => "eus",
        "bur" => "mya",
        "per" => "fas",
        "geo" => "kat",
        "may" => "msa",
        "mac" => "mkd",
        "rum" => "ron",
        "slo" => "slk",
        "wel" => "cym",
        _ => return None,
    })
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    match normalized_code.len() {
        2 => {
            if let Some(lang) = Language::from_639_1(&normalized_code) {
                return Ok(lang.to_639_3().to_string());
            }
        }
        3 => {
            if Language::from_639_3(&normalized_code).is_some() {
                return Ok(normalized_code);
            }
            if let Some(part2t) = bibliographic_to_terminology(&normalized_code) {
                return Ok(part2t.to_string());
            }
        }
        _ => {}
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Check if two language codes represent the same language
///
/// Codes that are not ISO codes are compared case-insensitively.
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part2t(code1), normalize_to_part2t(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => code1.trim().eq_ignore_ascii_case(code2.trim()),
    }
}

/// Human readable language name for prompts and listings
///
/// Looks in the supported table first, then ISO 639 data, and finally returns the
/// code unchanged.
pub fn get_language_name(code: &str) -> String {
    let lowered = code.trim().to_lowercase();
    if let Some((_, name)) = SUPPORTED_LANGUAGES.iter().find(|(c, _)| *c == lowered) {
        return (*name).to_string();
    }

    normalize_to_part2t(&lowered)
        .ok()
        .and_then(|part2t| Language::from_639_3(&part2t))
        .map(|lang| lang.to_name().to_string())
        .unwrap_or_else(|| code.to_string())
}
