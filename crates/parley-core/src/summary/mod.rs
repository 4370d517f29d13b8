//! Rolling conversation summaries.

pub mod extractive;

pub use extractive::ExtractiveSummarizer;

use parley_types::chat::HistoryEntry;
use parley_types::error::SummaryError;

/// Derives a short summary from a conversation's history.
///
/// Called after every inbound message; callers bound it with a timeout and
/// treat every error as "keep the previous summary".
pub trait Summarizer: Send + Sync {
    fn summarize(
        &self,
        history: &[HistoryEntry],
    ) -> impl std::future::Future<Output = Result<String, SummaryError>> + Send;
}
