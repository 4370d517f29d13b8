//! Conversation languages and translation errors.
//!
//! English is the processing language: inference and summarization run on
//! English text. Sinhala is the secondary language that inbound messages may
//! need translating from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A language a conversation can be held in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Si,
}

impl Language {
    /// The language inference is performed in.
    pub const PROCESSING: Language = Language::En;

    /// Whether text in this language must be translated before processing.
    pub fn is_secondary(&self) -> bool {
        *self != Self::PROCESSING
    }

    /// ISO 639-1 code.
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Si => "si",
        }
    }

    /// English display name.
    pub fn name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Si => "Sinhala",
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::En
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Language::En),
            "si" | "sinhala" => Ok(Language::Si),
            other => Err(format!("unsupported language: '{other}'")),
        }
    }
}

/// Errors from the language processing adapter.
///
/// All variants are recoverable: the router falls back to the original text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslationError {
    #[error("unsupported translation pair: {from} -> {to}")]
    Unsupported { from: Language, to: Language },

    #[error("no translatable terms found")]
    NoMatch,

    #[error("translation engine error: {0}")]
    Engine(String),
}
