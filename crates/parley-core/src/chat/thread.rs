//! Thread service: ownership checks, the language lock, and user
//! preferences.
//!
//! A thread's language is taken from its owner's preference when it is
//! created and can only change while the thread has no user messages. The
//! change runs under the conversation's pipeline lock, so it never
//! interleaves with a submission that is recording the first message.

use std::sync::Arc;

use chrono::Utc;
use parley_types::chat::{
    ChatMessage, ChatStats, ConversationSummary, CreateThreadRequest, Thread, User,
};
use parley_types::error::RepositoryError;
use parley_types::language::Language;
use uuid::Uuid;

use super::repository::ChatRepository;
use crate::session::ConversationLockMap;

const DEFAULT_TITLE: &str = "New Chat";
const MAX_TITLE_CHARS: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum ThreadError {
    #[error("thread not found")]
    NotFound,

    #[error("thread belongs to another user")]
    Forbidden,

    #[error("thread language is locked once it has user messages")]
    LanguageLocked,

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] RepositoryError),
}

pub struct ThreadService<R> {
    repo: Arc<R>,
    locks: Arc<ConversationLockMap>,
}

impl<R: ChatRepository> ThreadService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            repo,
            locks: Arc::new(ConversationLockMap::new()),
        }
    }

    /// Share the session manager's conversation locks.
    pub fn with_locks(mut self, locks: Arc<ConversationLockMap>) -> Self {
        self.locks = locks;
        self
    }

    /// Fetch a user, creating a default profile on first sight.
    pub async fn ensure_user(&self, user_id: Uuid) -> Result<User, ThreadError> {
        if let Some(user) = self.repo.get_user(&user_id).await? {
            return Ok(user);
        }
        let short = user_id.simple().to_string();
        let user = User {
            id: user_id,
            display_name: format!("user-{}", &short[short.len() - 8..]),
            preferred_language: Language::default(),
            created_at: Utc::now(),
        };
        self.repo.upsert_user(&user).await?;
        tracing::info!(%user_id, "user profile created");
        Ok(user)
    }

    /// Change the language new threads are created in. Existing threads
    /// keep theirs.
    pub async fn set_preferred_language(
        &self,
        user_id: Uuid,
        language: Language,
    ) -> Result<User, ThreadError> {
        let mut user = self.ensure_user(user_id).await?;
        user.preferred_language = language;
        self.repo.upsert_user(&user).await?;
        Ok(user)
    }

    pub async fn create_thread(
        &self,
        user_id: Uuid,
        request: CreateThreadRequest,
    ) -> Result<Thread, ThreadError> {
        let user = self.ensure_user(user_id).await?;
        let title = match request.title {
            Some(title) => validate_title(&title)?,
            None => DEFAULT_TITLE.to_string(),
        };
        let now = Utc::now();
        let thread = Thread {
            id: Uuid::now_v7(),
            user_id,
            title,
            language: user.preferred_language,
            web_search_enabled: request.web_search_enabled,
            created_at: now,
            updated_at: now,
        };
        let created = self.repo.create_thread(&thread).await?;
        tracing::info!(
            conversation_id = %created.id,
            language = %created.language,
            "thread created"
        );
        Ok(created)
    }

    /// Load a thread the caller owns.
    pub async fn get_thread(&self, caller: Uuid, conversation_id: Uuid) -> Result<Thread, ThreadError> {
        let thread = self
            .repo
            .get_thread(&conversation_id)
            .await?
            .ok_or(ThreadError::NotFound)?;
        if thread.user_id != caller {
            return Err(ThreadError::Forbidden);
        }
        Ok(thread)
    }

    pub async fn list_threads(&self, caller: Uuid) -> Result<Vec<Thread>, ThreadError> {
        Ok(self.repo.list_threads(&caller).await?)
    }

    pub async fn rename_thread(
        &self,
        caller: Uuid,
        conversation_id: Uuid,
        title: &str,
    ) -> Result<Thread, ThreadError> {
        self.get_thread(caller, conversation_id).await?;
        let title = validate_title(title)?;
        self.repo.rename_thread(&conversation_id, &title).await?;
        self.get_thread(caller, conversation_id).await
    }

    /// Change a thread's language. Rejected with `LanguageLocked` once any
    /// user message exists; setting the current language is always a no-op.
    pub async fn set_language(
        &self,
        caller: Uuid,
        conversation_id: Uuid,
        language: Language,
    ) -> Result<Thread, ThreadError> {
        let locks = self.locks.get(conversation_id);
        let _pipeline = locks.pipeline.lock().await;

        let thread = self.get_thread(caller, conversation_id).await?;
        if thread.language == language {
            return Ok(thread);
        }
        if !self.repo.set_thread_language(&conversation_id, language).await? {
            tracing::debug!(%conversation_id, "language change refused, thread locked");
            return Err(ThreadError::LanguageLocked);
        }
        self.get_thread(caller, conversation_id).await
    }

    pub async fn set_web_search(
        &self,
        caller: Uuid,
        conversation_id: Uuid,
        enabled: bool,
    ) -> Result<Thread, ThreadError> {
        self.get_thread(caller, conversation_id).await?;
        self.repo.set_web_search(&conversation_id, enabled).await?;
        self.get_thread(caller, conversation_id).await
    }

    pub async fn delete_thread(&self, caller: Uuid, conversation_id: Uuid) -> Result<(), ThreadError> {
        self.get_thread(caller, conversation_id).await?;
        self.repo.delete_thread(&conversation_id).await?;
        tracing::info!(%conversation_id, "thread deleted");
        Ok(())
    }

    /// Messages with the caller's own reactions filled in.
    pub async fn messages(
        &self,
        caller: Uuid,
        conversation_id: Uuid,
    ) -> Result<Vec<ChatMessage>, ThreadError> {
        self.get_thread(caller, conversation_id).await?;
        Ok(self.repo.get_messages(&conversation_id, Some(&caller)).await?)
    }

    pub async fn summary(
        &self,
        caller: Uuid,
        conversation_id: Uuid,
    ) -> Result<Option<ConversationSummary>, ThreadError> {
        self.get_thread(caller, conversation_id).await?;
        Ok(self.repo.get_summary(&conversation_id).await?)
    }

    pub async fn stats(&self) -> Result<ChatStats, ThreadError> {
        Ok(self.repo.get_stats().await?)
    }
}

fn validate_title(title: &str) -> Result<String, ThreadError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ThreadError::Validation("title must not be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(ThreadError::Validation(format!(
            "title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(title.to_string())
}
