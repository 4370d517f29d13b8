//! Term-table translator between Sinhala and English.
//!
//! Substitutes known cloud-service vocabulary and common greetings. It is a
//! stand-in engine behind `LanguageAdapter`; anything not in the table passes
//! through untouched.

use dashmap::DashMap;
use parley_types::language::{Language, TranslationError};

use super::adapter::LanguageAdapter;

/// Sinhala term to English equivalent.
const SI_EN_TERMS: &[(&str, &str)] = &[
    ("ක්ලවුඩ්", "cloud"),
    ("සේවාව", "service"),
    ("සර්වර්", "server"),
    ("ගබඩාව", "storage"),
    ("දත්ත", "data"),
    ("ගිණුම", "account"),
    ("ආරක්ෂාව", "security"),
    ("ජාලය", "network"),
    ("වින්‍යාසය", "configuration"),
    ("ගැටලුව", "problem"),
    ("දෝෂය", "error"),
    ("උදව්", "help"),
    ("සහාය", "support"),
    ("ආයුබෝවන්", "hello"),
    ("හලෝ", "hello"),
    ("හායි", "hi"),
    ("ස්තුතියි", "thank you"),
    ("ස්තූති", "thanks"),
];

const MAX_CACHE_ENTRIES: usize = 1024;

type CacheKey = (Language, Language, String);

/// Lexicon-based `LanguageAdapter` with a translation cache.
pub struct LexiconTranslator {
    si_to_en: Vec<(&'static str, &'static str)>,
    cache: DashMap<CacheKey, String>,
}

impl LexiconTranslator {
    pub fn new() -> Self {
        let mut si_to_en = SI_EN_TERMS.to_vec();
        // Longest first so compound terms win over their prefixes.
        si_to_en.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));
        Self {
            si_to_en,
            cache: DashMap::new(),
        }
    }

    /// Number of cached translations.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    fn sinhala_to_english(&self, text: &str) -> Result<String, TranslationError> {
        let mut out = text.to_string();
        let mut replaced = false;
        for (si, en) in &self.si_to_en {
            if out.contains(si) {
                out = out.replace(si, &format!(" {en} "));
                replaced = true;
            }
        }
        if !replaced {
            return Err(TranslationError::NoMatch);
        }
        Ok(normalize_whitespace(&out))
    }

    fn english_to_sinhala(&self, text: &str) -> Result<String, TranslationError> {
        let mut replaced = false;
        let words: Vec<String> = text
            .split_whitespace()
            .map(|word| {
                let core = word.trim_matches(|c: char| c.is_ascii_punctuation());
                let lookup = core.to_lowercase();
                match SI_EN_TERMS.iter().find(|(_, en)| *en == lookup) {
                    Some((si, _)) if !core.is_empty() => {
                        replaced = true;
                        word.replacen(core, si, 1)
                    }
                    _ => word.to_string(),
                }
            })
            .collect();
        if !replaced {
            return Err(TranslationError::NoMatch);
        }
        Ok(words.join(" "))
    }
}

impl Default for LexiconTranslator {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl LanguageAdapter for LexiconTranslator {
    async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<String, TranslationError> {
        if source == target {
            return Ok(text.to_string());
        }

        let key = (source, target, text.to_string());
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit.clone());
        }

        let translated = match (source, target) {
            (Language::Si, Language::En) => self.sinhala_to_english(text)?,
            (Language::En, Language::Si) => self.english_to_sinhala(text)?,
            (from, to) => return Err(TranslationError::Unsupported { from, to }),
        };

        if self.cache.len() >= MAX_CACHE_ENTRIES {
            self.cache.clear();
        }
        self.cache.insert(key, translated.clone());
        tracing::debug!(%source, %target, "lexicon translation cached");
        Ok(translated)
    }
}
