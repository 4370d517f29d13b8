//! LanguageAdapter trait definition.

use parley_types::language::{Language, TranslationError};

/// Translates text between a conversation language and the processing
/// language.
///
/// Every error is recoverable: callers fall back to the untranslated text.
pub trait LanguageAdapter: Send + Sync {
    fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> impl std::future::Future<Output = Result<String, TranslationError>> + Send;
}
