use thiserror::Error;

/// Errors from repository operations (used by trait definitions in parley-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors from the conversation summarizer. Never fatal to a pipeline.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("nothing to summarize")]
    EmptyHistory,

    #[error("summarizer timed out after {0}s")]
    Timeout(u64),

    #[error("summarizer backend error: {0}")]
    Backend(String),
}

pub use crate::inference::InferenceError;
pub use crate::language::TranslationError;
