//! Inference request and error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::language::Language;

/// Input handed to an inference backend for one reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    /// Text to respond to, already translated when translation applied.
    pub text: String,
    /// Language the reply should be generated in.
    pub language: Language,
    pub web_search_enabled: bool,
}

/// Errors from an inference backend.
///
/// The session layer turns every variant into the fixed apology reply.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("provider error: {0}")]
    Provider(String),

    #[error("provider returned an empty response")]
    EmptyResponse,

    #[error("malformed provider response: {0}")]
    Malformed(String),

    #[error("inference timed out after {0}s")]
    Timeout(u64),

    #[error("no API key configured for provider '{0}'")]
    MissingApiKey(String),
}
