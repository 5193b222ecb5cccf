/*!
 * Prompt template for batch subtitle translation.
 *
 * A batch is sent as a numbered list (`1. text`, `2. text`, ...) wrapped in fixed
 * instructions. The model is asked to answer with the same numbering so the
 * response parser can map translations back to entries.
 */

use crate::language_utils::get_language_name;

/// Phrase used when the source language is unknown
pub const DETECTED_LANGUAGE: &str = "the detected language";

/// Instruction template wrapped around a numbered batch
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

impl PromptTemplate {
    /// The default batch translation prompt
    pub const BATCH_TRANSLATION: &'static str = "Translate the following subtitle text from {source_language} to {target_language}.

Instructions:
1. Maintain original tone and style
2. Keep non-dialogue cues like [music] or (laughs) unchanged
3. Translate idioms to natural equivalents, not literally
4. Use proper gender-specific terms when needed
5. For multi-line subtitles, preserve line breaks
6. Return ONLY the numbered translations, no explanations

Text to translate:
{numbered_texts}";

    /// Create a new prompt template
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Render the template with the given language names and numbered list
    pub fn render(&self, source_language: &str, target_language: &str, numbered_texts: &str) -> String {
        self.template
            .replace("{source_language}", source_language)
            .replace("{target_language}", target_language)
            .replace("{numbered_texts}", numbered_texts)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(Self::BATCH_TRANSLATION)
    }
}

/// Number the texts one per item, `"{n}. {trimmed text}"`, joined by newlines
pub fn numbered_list(texts: &[String]) -> String {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| format!("{}. {}", i + 1, text.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the full prompt for one batch
///
/// Language codes are expanded to their English names; without a source language
/// the model is told to detect it.
pub fn build_batch_prompt(
    template: &PromptTemplate,
    texts: &[String],
    target_language: &str,
    source_language: Option<&str>,
) -> String {
    let source = source_language
        .filter(|code| !code.trim().is_empty())
        .map(get_language_name)
        .unwrap_or_else(|| DETECTED_LANGUAGE.to_string());
    let target = get_language_name(target_language);

    template.render(&source, &target, &numbered_list(texts))
}
