//! Language detection and the translation port.

pub mod adapter;
pub mod detect;
pub mod lexicon;

pub use adapter::LanguageAdapter;
pub use detect::{contains_script, detect_language};
pub use lexicon::LexiconTranslator;
