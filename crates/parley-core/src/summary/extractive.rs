//! Extractive summarizer: no model call, just the opening sentence of each
//! recent user message.

use parley_types::chat::{HistoryEntry, MessageRole};
use parley_types::error::SummaryError;

use super::Summarizer;

/// Longest topic snippet taken from a single message, in characters.
const TOPIC_MAX_CHARS: usize = 80;

pub struct ExtractiveSummarizer {
    window: usize,
    max_chars: usize,
}

impl ExtractiveSummarizer {
    /// `window` is the number of most recent entries considered;
    /// `max_chars` caps the summary length.
    pub fn new(window: usize, max_chars: usize) -> Self {
        Self {
            window: window.max(1),
            max_chars: max_chars.max(16),
        }
    }

    fn build(&self, history: &[HistoryEntry]) -> String {
        let start = history.len().saturating_sub(self.window);
        let recent = &history[start..];

        let user_count = history.iter().filter(|e| e.role == MessageRole::User).count();
        let assistant_count = history.len() - user_count;

        let mut topics: Vec<String> = Vec::new();
        for entry in recent.iter().filter(|e| e.role == MessageRole::User) {
            let topic = first_sentence(&entry.content);
            if !topic.is_empty() && !topics.contains(&topic) {
                topics.push(topic);
            }
        }

        let mut summary = format!(
            "{} messages ({} from the user, {} from the assistant).",
            history.len(),
            user_count,
            assistant_count
        );
        if !topics.is_empty() {
            summary.push_str(" Recent topics: ");
            summary.push_str(&topics.join("; "));
            summary.push('.');
        }
        truncate_chars(&summary, self.max_chars)
    }
}

fn first_sentence(text: &str) -> String {
    let trimmed = text.trim();
    let end = trimmed
        .find(['.', '?', '!', '\n'])
        .unwrap_or(trimmed.len());
    truncate_chars(trimmed[..end].trim(), TOPIC_MAX_CHARS)
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}

impl Summarizer for ExtractiveSummarizer {
    async fn summarize(&self, history: &[HistoryEntry]) -> Result<String, SummaryError> {
        if history.is_empty() {
            return Err(SummaryError::EmptyHistory);
        }
        Ok(self.build(history))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn entry(role: MessageRole, content: &str) -> HistoryEntry {
        HistoryEntry {
            message_id: Uuid::now_v7(),
            role,
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_empty_history_is_error() {
        let s = ExtractiveSummarizer::new(10, 200);
        assert!(matches!(
            s.summarize(&[]).await,
            Err(SummaryError::EmptyHistory)
        ));
    }

    #[tokio::test]
    async fn test_summary_counts_and_topics() {
        let s = ExtractiveSummarizer::new(10, 500);
        let history = vec![
            entry(MessageRole::User, "How do I reset my cloud account? It is locked."),
            entry(MessageRole::Assistant, "Open the settings page."),
            entry(MessageRole::User, "thanks"),
        ];
        let summary = s.summarize(&history).await.unwrap();
        assert!(summary.starts_with("3 messages (2 from the user, 1 from the assistant)."));
        assert!(summary.contains("How do I reset my cloud account"));
        assert!(summary.contains("thanks"));
        assert!(!summary.contains("It is locked"));
        assert!(!summary.contains("settings page"));
    }

    #[tokio::test]
    async fn test_window_limits_topics() {
        let s = ExtractiveSummarizer::new(1, 500);
        let history = vec![
            entry(MessageRole::User, "first question"),
            entry(MessageRole::User, "second question"),
        ];
        let summary = s.summarize(&history).await.unwrap();
        assert!(summary.contains("second question"));
        assert!(!summary.contains("first question"));
        assert!(summary.starts_with("2 messages"));
    }

    #[tokio::test]
    async fn test_summary_respects_max_chars() {
        let s = ExtractiveSummarizer::new(10, 40);
        let history = vec![entry(MessageRole::User, &"word ".repeat(50))];
        let summary = s.summarize(&history).await.unwrap();
        assert!(summary.chars().count() <= 40);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn test_first_sentence() {
        assert_eq!(first_sentence("  Hi there. More"), "Hi there");
        assert_eq!(first_sentence("no terminator"), "no terminator");
    }
}
