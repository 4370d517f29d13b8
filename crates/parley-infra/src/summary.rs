//! Summarizer implementations selected by configuration.

use parley_core::summary::{ExtractiveSummarizer, Summarizer};
use parley_types::chat::HistoryEntry;
use parley_types::config::{InferenceConfig, ModelProfile, SummaryConfig, SummaryEngine};
use parley_types::error::SummaryError;
use secrecy::SecretString;

use crate::llm::openrouter::OpenRouterClient;

const SUMMARY_MAX_TOKENS: u32 = 256;
const SUMMARY_TEMPERATURE: f32 = 0.3;

const SUMMARY_PROMPT: &str = "Summarize the following conversation between a user and an \
    assistant in at most three sentences. Keep the topics the user asked about and any facts \
    the assistant gave. Reply with the summary only.";

/// Summarizes the recent window of a conversation with a chat model.
pub struct LlmSummarizer {
    client: OpenRouterClient,
    profile: ModelProfile,
    window: usize,
    max_chars: usize,
}

impl LlmSummarizer {
    pub fn new(client: OpenRouterClient, config: &SummaryConfig) -> Self {
        Self {
            client,
            profile: ModelProfile {
                model: config.model.clone(),
                max_tokens: SUMMARY_MAX_TOKENS,
                temperature: SUMMARY_TEMPERATURE,
            },
            window: config.window.max(1),
            max_chars: config.max_chars,
        }
    }
}

/// `role: content` lines for the last `window` entries.
fn transcript(history: &[HistoryEntry], window: usize) -> String {
    let start = history.len().saturating_sub(window);
    history[start..]
        .iter()
        .map(|entry| format!("{}: {}", entry.role, entry.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

impl Summarizer for LlmSummarizer {
    #[tracing::instrument(
        name = "summarize_context",
        skip(self, history),
        fields(model = %self.profile.model, message_count = history.len())
    )]
    async fn summarize(&self, history: &[HistoryEntry]) -> Result<String, SummaryError> {
        if history.is_empty() {
            return Err(SummaryError::EmptyHistory);
        }

        let summary = self
            .client
            .complete(&self.profile, SUMMARY_PROMPT, &transcript(history, self.window))
            .await
            .map_err(|e| SummaryError::Backend(e.to_string()))?;

        Ok(truncate_chars(&summary, self.max_chars))
    }
}

/// The summarizer named by `summary.engine`.
pub enum ConfiguredSummarizer {
    Extractive(ExtractiveSummarizer),
    Llm(LlmSummarizer),
}

impl ConfiguredSummarizer {
    /// Build from config. The `llm` engine needs an API key; without one it
    /// degrades to the extractive summarizer.
    pub fn from_config(
        summary: &SummaryConfig,
        inference: &InferenceConfig,
        api_key: Option<&SecretString>,
    ) -> Self {
        match (summary.engine, api_key) {
            (SummaryEngine::Llm, Some(key)) => Self::Llm(LlmSummarizer::new(
                OpenRouterClient::new(key, &inference.base_url),
                summary,
            )),
            (SummaryEngine::Llm, None) => {
                tracing::warn!("llm summary engine needs an API key, using extractive summaries");
                Self::extractive(summary)
            }
            (SummaryEngine::Extractive, _) => Self::extractive(summary),
        }
    }

    fn extractive(summary: &SummaryConfig) -> Self {
        Self::Extractive(ExtractiveSummarizer::new(summary.window, summary.max_chars))
    }

    pub fn engine(&self) -> SummaryEngine {
        match self {
            Self::Extractive(_) => SummaryEngine::Extractive,
            Self::Llm(_) => SummaryEngine::Llm,
        }
    }
}

impl Summarizer for ConfiguredSummarizer {
    async fn summarize(&self, history: &[HistoryEntry]) -> Result<String, SummaryError> {
        match self {
            Self::Extractive(inner) => inner.summarize(history).await,
            Self::Llm(inner) => inner.summarize(history).await,
        }
    }
}
