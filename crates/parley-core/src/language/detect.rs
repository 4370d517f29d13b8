//! Script-based language detection.

use parley_types::language::Language;

/// Sinhala Unicode block.
const SINHALA_RANGE: std::ops::RangeInclusive<char> = '\u{0D80}'..='\u{0DFF}';

/// Whether `text` contains at least one character of `language`'s script.
///
/// English is Latin-script and treated as always present.
pub fn contains_script(text: &str, language: Language) -> bool {
    match language {
        Language::Si => text.chars().any(|c| SINHALA_RANGE.contains(&c)),
        Language::En => true,
    }
}

/// Best-effort detection. Empty or blank text defaults to English.
pub fn detect_language(text: &str) -> Language {
    if text.trim().is_empty() {
        return Language::En;
    }
    if contains_script(text, Language::Si) {
        Language::Si
    } else {
        Language::En
    }
}
