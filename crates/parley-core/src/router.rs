//! Message router: the per-message language pipeline.
//!
//! Given one inbound message that the session layer has already persisted,
//! the router decides whether it needs translating into the processing
//! language, assembles the conversation history in that language, and hands
//! back a [`RoutingDecision`]. The rolling summary is refreshed from that
//! history on a detached task, so reply generation never waits for it.
//!
//! Translation and summary problems degrade to "use the best text we have";
//! only failing to read history from the repository is an error.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parley_types::chat::{ConversationSummary, HistoryEntry, TranslationRecord};
use parley_types::error::{RepositoryError, SummaryError};
use parley_types::inference::InferenceRequest;
use parley_types::language::Language;
use uuid::Uuid;

use crate::chat::repository::ChatRepository;
use crate::language::{LanguageAdapter, contains_script};
use crate::summary::Summarizer;

/// Errors that abort routing.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("persistence error: {0}")]
    Persistence(#[from] RepositoryError),
}

/// One message to route.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    /// Id of the already-persisted user message.
    pub message_id: Uuid,
    pub content: String,
    pub conversation_id: Uuid,
    pub caller_id: Uuid,
    /// The conversation's language.
    pub language: Language,
    pub web_search_enabled: bool,
}

/// A translation produced during routing, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationDraft {
    pub translated_text: String,
    pub source_language: Language,
    pub target_language: Language,
}

impl TranslationDraft {
    /// Turn the draft into an immutable record for `message_id`.
    pub fn into_record(
        self,
        message_id: Uuid,
        conversation_id: Uuid,
        original_text: &str,
    ) -> TranslationRecord {
        TranslationRecord {
            id: Uuid::now_v7(),
            message_id,
            conversation_id,
            original_text: original_text.to_string(),
            translated_text: self.translated_text,
            source_language: self.source_language,
            target_language: self.target_language,
            created_at: Utc::now(),
        }
    }
}

/// How a routed message should be processed downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingDecision {
    pub original_content: String,
    /// Translated text when translation happened, otherwise the original.
    pub processed_content: String,
    /// The conversation's language.
    pub language: Language,
    pub web_search_enabled: bool,
    pub translation: Option<TranslationDraft>,
    /// Whether inference should run on `processed_content` in the
    /// processing language.
    pub use_processed_text: bool,
}

impl RoutingDecision {
    /// Language the reply is generated in.
    pub fn effective_language(&self) -> Language {
        if self.use_processed_text {
            Language::PROCESSING
        } else {
            self.language
        }
    }

    pub fn inference_request(&self) -> InferenceRequest {
        InferenceRequest {
            text: self.processed_content.clone(),
            language: self.effective_language(),
            web_search_enabled: self.web_search_enabled,
        }
    }
}

/// Routes inbound messages through translation, history assembly, and
/// summary refresh.
pub struct MessageRouter<R, A, S> {
    repo: Arc<R>,
    adapter: Arc<A>,
    summarizer: Arc<S>,
    summary_timeout: Duration,
}

impl<R, A, S> MessageRouter<R, A, S>
where
    R: ChatRepository + 'static,
    A: LanguageAdapter,
    S: Summarizer + 'static,
{
    pub fn new(repo: Arc<R>, adapter: Arc<A>, summarizer: Arc<S>, summary_timeout: Duration) -> Self {
        Self {
            repo,
            adapter,
            summarizer,
            summary_timeout,
        }
    }

    /// Route one message. See the module docs for the pipeline.
    #[tracing::instrument(
        name = "route_message",
        skip(self, request),
        fields(
            conversation_id = %request.conversation_id,
            message_id = %request.message_id,
            caller_id = %request.caller_id,
            language = %request.language,
        )
    )]
    pub async fn route(&self, request: RouteRequest) -> Result<RoutingDecision, RouteError> {
        let translation = self.translate(&request).await;

        let history = self.assemble_history(&request, translation.as_ref()).await?;
        tokio::spawn(refresh_summary(
            self.repo.clone(),
            self.summarizer.clone(),
            self.summary_timeout,
            request.conversation_id,
            history,
        ));

        let use_processed_text = translation.is_some();
        let processed_content = translation
            .as_ref()
            .map(|t| t.translated_text.clone())
            .unwrap_or_else(|| request.content.clone());

        Ok(RoutingDecision {
            original_content: request.content,
            processed_content,
            language: request.language,
            web_search_enabled: request.web_search_enabled,
            translation,
            use_processed_text,
        })
    }

    async fn translate(&self, request: &RouteRequest) -> Option<TranslationDraft> {
        if !request.language.is_secondary() || !contains_script(&request.content, request.language)
        {
            return None;
        }

        match self
            .adapter
            .translate(&request.content, request.language, Language::PROCESSING)
            .await
        {
            Ok(text) => Some(TranslationDraft {
                translated_text: text,
                source_language: request.language,
                target_language: Language::PROCESSING,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "translation failed, routing original text");
                None
            }
        }
    }

    /// History in the processing language for secondary-language threads,
    /// raw otherwise. The current message always reflects this run's text.
    async fn assemble_history(
        &self,
        request: &RouteRequest,
        fresh: Option<&TranslationDraft>,
    ) -> Result<Vec<HistoryEntry>, RouteError> {
        let messages = self
            .repo
            .get_messages(&request.conversation_id, None)
            .await?;

        let translated: HashMap<Uuid, String> = if request.language.is_secondary() {
            // Records come oldest first, so later ones overwrite.
            self.repo
                .get_translations(&request.conversation_id)
                .await?
                .into_iter()
                .map(|r| (r.message_id, r.translated_text))
                .collect()
        } else {
            HashMap::new()
        };

        let current_text = fresh
            .map(|t| t.translated_text.clone())
            .unwrap_or_else(|| request.content.clone());

        let mut history: Vec<HistoryEntry> = messages
            .into_iter()
            .map(|m| {
                let content = if m.id == request.message_id {
                    current_text.clone()
                } else {
                    translated.get(&m.id).cloned().unwrap_or(m.content)
                };
                HistoryEntry {
                    message_id: m.id,
                    role: m.role,
                    content,
                }
            })
            .collect();

        if !history.iter().any(|e| e.message_id == request.message_id) {
            history.push(HistoryEntry {
                message_id: request.message_id,
                role: parley_types::chat::MessageRole::User,
                content: current_text,
            });
        }

        Ok(history)
    }
}

/// Summarize `history` within `timeout` and store the result. Failures keep
/// the previous summary. A refresh built from a shorter history than the
/// stored one (an older pipeline finishing late) is dropped.
async fn refresh_summary<R, S>(
    repo: Arc<R>,
    summarizer: Arc<S>,
    timeout: Duration,
    conversation_id: Uuid,
    history: Vec<HistoryEntry>,
) where
    R: ChatRepository,
    S: Summarizer,
{
    let outcome = tokio::time::timeout(timeout, summarizer.summarize(&history))
        .await
        .unwrap_or(Err(SummaryError::Timeout(timeout.as_secs())));

    let summary = match outcome {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(%conversation_id, error = %e, "summary refresh skipped");
            return;
        }
    };

    let record = ConversationSummary {
        conversation_id,
        summary,
        message_count: history.len() as u32,
        updated_at: Utc::now(),
    };
    match repo.get_summary(&conversation_id).await {
        Ok(Some(current)) if current.message_count > record.message_count => {
            tracing::debug!(%conversation_id, "newer summary already stored");
            return;
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(%conversation_id, error = %e, "failed to read summary");
            return;
        }
    }
    if let Err(e) = repo.upsert_summary(&record).await {
        tracing::warn!(%conversation_id, error = %e, "failed to store summary");
    } else {
        tracing::debug!(%conversation_id, message_count = record.message_count, "summary refreshed");
    }
}
