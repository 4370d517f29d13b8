//! ChatRepository trait definition.
//!
//! The persistence gateway for users, threads, messages, reactions,
//! translations, and conversation summaries. Core code never touches storage
//! except through this trait.

use parley_types::chat::{
    ChatMessage, ChatStats, ConversationSummary, ReactionKind, Thread, TranslationRecord, User,
};
use parley_types::error::RepositoryError;
use parley_types::language::Language;
use uuid::Uuid;

/// Repository trait for chat persistence.
///
/// Implementations live in parley-infra (e.g., `SqliteChatRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
///
/// Message reads take an optional `viewer`: when present, each returned
/// message carries that user's own reaction in `user_reaction`.
pub trait ChatRepository: Send + Sync {
    // --- Messages ---

    /// Append a message to its thread.
    fn create_message(
        &self,
        message: &ChatMessage,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Replace a message's content in place and bump `updated_at`.
    ///
    /// Returns the updated message (without viewer reaction), or
    /// `RepositoryError::NotFound`.
    fn update_message(
        &self,
        message_id: &Uuid,
        content: &str,
    ) -> impl std::future::Future<Output = Result<ChatMessage, RepositoryError>> + Send;

    /// Delete a message together with its reactions and translations.
    fn delete_message(
        &self,
        message_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Messages for a thread in arrival order.
    fn get_messages(
        &self,
        conversation_id: &Uuid,
        viewer: Option<&Uuid>,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;

    fn get_message(
        &self,
        message_id: &Uuid,
        viewer: Option<&Uuid>,
    ) -> impl std::future::Future<Output = Result<Option<ChatMessage>, RepositoryError>> + Send;

    /// The most recently created assistant message in a thread.
    fn get_last_assistant_message(
        &self,
        conversation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<ChatMessage>, RepositoryError>> + Send;

    // --- Translations ---

    fn save_translation(
        &self,
        record: &TranslationRecord,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// All translation records for a thread, oldest first.
    fn get_translations(
        &self,
        conversation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<TranslationRecord>, RepositoryError>> + Send;

    // --- Summaries ---

    /// Insert or wholesale replace the thread's summary.
    fn upsert_summary(
        &self,
        summary: &ConversationSummary,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn get_summary(
        &self,
        conversation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<ConversationSummary>, RepositoryError>> + Send;

    // --- Threads ---

    fn create_thread(
        &self,
        thread: &Thread,
    ) -> impl std::future::Future<Output = Result<Thread, RepositoryError>> + Send;

    fn get_thread(
        &self,
        conversation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Thread>, RepositoryError>> + Send;

    /// Threads owned by a user, most recently updated first.
    fn list_threads(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Thread>, RepositoryError>> + Send;

    /// Set the title and bump `updated_at`. `NotFound` if the thread is gone.
    fn rename_thread(
        &self,
        conversation_id: &Uuid,
        title: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn set_web_search(
        &self,
        conversation_id: &Uuid,
        enabled: bool,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Change the language in one step, unless the thread already has a
    /// user message. Returns `false`, leaving the row untouched, when it is
    /// locked.
    fn set_thread_language(
        &self,
        conversation_id: &Uuid,
        language: Language,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Delete a thread and everything that belongs to it.
    fn delete_thread(
        &self,
        conversation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Set the thread's `updated_at` to now.
    fn touch_thread(
        &self,
        conversation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    // --- Reactions ---

    fn get_reaction(
        &self,
        message_id: &Uuid,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<ReactionKind>, RepositoryError>> + Send;

    /// Set or clear (`None`) a user's reaction to a message.
    fn set_reaction(
        &self,
        message_id: &Uuid,
        user_id: &Uuid,
        reaction: Option<ReactionKind>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    // --- Users ---

    fn get_user(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<User>, RepositoryError>> + Send;

    fn upsert_user(
        &self,
        user: &User,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    // --- Stats ---

    fn get_stats(&self) -> impl std::future::Future<Output = Result<ChatStats, RepositoryError>> + Send;
}
