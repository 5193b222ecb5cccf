/*!
 * Response parsing for numbered batch translations.
 *
 * Models do not always answer with a clean `1. ... 2. ...` list: they add a
 * preamble, wrap one translation over several lines, skip or repeat numbers. The
 * parser recovers what it can in two passes:
 *
 * 1. A state machine walks the non-blank lines. A line starting with the next
 *    expected number opens a new translation, any other line continues the open
 *    one. The open translation is only emitted when exactly one translation per
 *    preceding number has been emitted so far, so skipped or repeated numbering
 *    never shifts later entries.
 * 2. If that does not yield one translation per input, non-blank lines are taken
 *    positionally with their number prefix stripped.
 *
 * The final list always has the same length as the input, padded with the
 * original texts.
 */

use once_cell::sync::Lazy;
use regex::Regex;

static NUMBER_PREFIX_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\s*").expect("number prefix regex is valid"));

/// Parser state between lines
#[derive(Debug, Clone, PartialEq, Eq)]
enum ParseState {
    /// Nothing collected since the last numbered line
    Idle,
    /// Collecting the lines of one translation
    Accumulating(String),
}

/// Line-by-line state machine over a numbered response
#[derive(Debug)]
pub struct NumberedResponseParser {
    state: ParseState,
    /// Number the next item line must start with
    expected_number: usize,
    translations: Vec<String>,
}

impl Default for NumberedResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl NumberedResponseParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::Idle,
            expected_number: 1,
            translations: Vec::new(),
        }
    }

    /// Number the next item line must start with
    pub fn expected_number(&self) -> usize {
        self.expected_number
    }

    // Remainder after "{expected}." and optional whitespace, if the line is the next item
    fn match_expected<'a>(&self, line: &'a str) -> Option<&'a str> {
        let rest = line.strip_prefix(self.expected_number.to_string().as_str())?;
        let rest = rest.strip_prefix('.')?;
        Some(rest.trim_start())
    }

    // The pending translation is due when every earlier number already has exactly one
    fn is_flush_due(&self) -> bool {
        self.expected_number >= 2 && self.translations.len() == self.expected_number - 2
    }

    fn start(text: &str) -> ParseState {
        if text.is_empty() {
            ParseState::Idle
        } else {
            ParseState::Accumulating(text.to_string())
        }
    }

    /// Feed one response line
    pub fn feed_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        if let Some(remainder) = self.match_expected(line) {
            let due = self.is_flush_due();
            let previous = std::mem::replace(&mut self.state, Self::start(remainder));
            if let ParseState::Accumulating(pending) = previous {
                if due {
                    self.translations.push(pending.trim().to_string());
                }
            }
            self.expected_number += 1;
            return;
        }

        self.state = match std::mem::replace(&mut self.state, ParseState::Idle) {
            ParseState::Accumulating(mut pending) => {
                pending.push('\n');
                pending.push_str(line);
                ParseState::Accumulating(pending)
            }
            // A line before any numbered item starts its own translation
            ParseState::Idle => ParseState::Accumulating(line.to_string()),
        };
    }

    /// Flush the open translation and return everything collected
    pub fn finish(mut self) -> Vec<String> {
        if let ParseState::Accumulating(pending) = std::mem::replace(&mut self.state, ParseState::Idle) {
            self.translations.push(pending.trim().to_string());
        }
        self.translations
    }
}

/// Run the state machine over a whole response
pub fn parse_numbered(response: &str) -> Vec<String> {
    let mut parser = NumberedResponseParser::new();
    for line in response.trim().lines() {
        parser.feed_line(line);
    }
    parser.finish()
}

/// Positional fallback: one non-blank line per original, number prefix stripped
pub fn parse_positional(response: &str, originals: &[String]) -> Vec<String> {
    let lines: Vec<&str> = response
        .trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    originals
        .iter()
        .enumerate()
        .map(|(i, original)| {
            let cleaned = lines
                .get(i)
                .map(|line| NUMBER_PREFIX_REGEX.replace(line, "").into_owned())
                .unwrap_or_default();
            if cleaned.is_empty() { original.clone() } else { cleaned }
        })
        .collect()
}

/// Parse a raw model response into exactly one translation per original text
pub fn parse_response(response: &str, originals: &[String]) -> Vec<String> {
    let mut translations = parse_numbered(response);

    if translations.len() != originals.len() {
        log::debug!(
            "Numbered parse produced {} of {} translations, using positional fallback",
            translations.len(),
            originals.len()
        );
        translations = parse_positional(response, originals);
    }

    translations.truncate(originals.len());
    let produced = translations.len();
    translations.extend(originals[produced..].iter().cloned());
    translations
}
