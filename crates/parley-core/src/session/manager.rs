//! Session manager: submission pipelines, reactions, and presence.
//!
//! Submissions for one conversation run one at a time behind a fair
//! (FIFO) pipeline lock, so a later edit cannot delete or replace the reply
//! of a pipeline that is still generating. Every persist-then-broadcast pair
//! additionally holds a short commit lock, which keeps message events in
//! commit order for every member of the room.

use std::sync::Arc;
use std::time::Duration;

use parley_types::chat::{ChatMessage, MessageRole, ReactionKind, Thread};
use parley_types::error::RepositoryError;
use parley_types::event::ServerEvent;
use parley_types::inference::InferenceRequest;
use uuid::Uuid;

use crate::chat::repository::ChatRepository;
use crate::inference::BoxInferenceBackend;
use crate::language::LanguageAdapter;
use crate::router::{MessageRouter, RouteError, RouteRequest};
use crate::summary::Summarizer;

use super::locks::{ConversationLockMap, ConversationLocks};
use super::rooms::{ConnectionId, EventSender, RoomRegistry};

/// Errors surfaced to the connection that issued a command.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("persistence error: {0}")]
    Persistence(#[from] RepositoryError),

    #[error("conversation not found")]
    ConversationNotFound,

    #[error("message not found")]
    MessageNotFound,

    #[error("conversation belongs to another user")]
    Forbidden,

    #[error("invalid request: {0}")]
    Validation(String),
}

impl From<RouteError> for SessionError {
    fn from(e: RouteError) -> Self {
        match e {
            RouteError::Persistence(inner) => SessionError::Persistence(inner),
        }
    }
}

/// Tunables for the submission pipeline.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub inference_timeout: Duration,
    pub summary_timeout: Duration,
    /// Assistant reply stored when inference fails or times out.
    pub apology_text: String,
}

/// One inbound chat message or edit.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub conversation_id: Uuid,
    pub content: String,
    pub caller_id: Uuid,
    pub is_edit: bool,
    /// The user message being edited. Required when `is_edit`.
    pub target_message_id: Option<Uuid>,
}

/// Messages written by a completed pipeline.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    /// The new or edited user message.
    pub user_message: ChatMessage,
    pub reply: ChatMessage,
    /// Whether the reply is the fixed apology.
    pub fell_back: bool,
}

pub struct SessionManager<R, A, S> {
    repo: Arc<R>,
    router: MessageRouter<R, A, S>,
    backend: BoxInferenceBackend,
    rooms: Arc<RoomRegistry>,
    locks: Arc<ConversationLockMap>,
    settings: SessionSettings,
}

impl<R, A, S> SessionManager<R, A, S>
where
    R: ChatRepository + 'static,
    A: LanguageAdapter,
    S: Summarizer + 'static,
{
    pub fn new(
        repo: Arc<R>,
        adapter: Arc<A>,
        summarizer: Arc<S>,
        backend: BoxInferenceBackend,
        rooms: Arc<RoomRegistry>,
        settings: SessionSettings,
    ) -> Self {
        let router = MessageRouter::new(
            repo.clone(),
            adapter,
            summarizer,
            settings.summary_timeout,
        );
        Self {
            repo,
            router,
            backend,
            rooms,
            locks: Arc::new(ConversationLockMap::new()),
            settings,
        }
    }

    pub fn rooms(&self) -> &Arc<RoomRegistry> {
        &self.rooms
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    // --- Presence ---

    pub fn connect(&self, sender: EventSender) -> ConnectionId {
        self.rooms.connect(sender)
    }

    /// Remove the connection from every room. Pipelines it started keep
    /// running and still broadcast to the remaining members.
    pub fn disconnect(&self, connection: ConnectionId) {
        self.rooms.disconnect(connection);
    }

    pub fn join(&self, connection: ConnectionId, conversation_id: Uuid) {
        if self.rooms.join(connection, conversation_id) {
            tracing::debug!(%connection, %conversation_id, "joined room");
        }
    }

    pub fn leave(&self, connection: ConnectionId, conversation_id: Uuid) {
        if self.rooms.leave(connection, conversation_id) {
            tracing::debug!(%connection, %conversation_id, "left room");
        }
    }

    pub fn start_typing(&self, origin: ConnectionId, conversation_id: Uuid, role: MessageRole) {
        if !self.rooms.start_typing(conversation_id, origin, role) {
            tracing::debug!(connection = %origin, %conversation_id, "typing ignored, not a member");
        }
    }

    pub fn stop_typing(&self, origin: ConnectionId, conversation_id: Uuid) {
        self.rooms.stop_typing(conversation_id, origin);
    }

    /// Drop the locks kept for a conversation (after it is deleted).
    pub fn forget_conversation(&self, conversation_id: Uuid) {
        self.locks.forget(conversation_id);
    }

    /// The lock map, for services that must not interleave with a running
    /// pipeline.
    pub fn conversation_locks(&self) -> Arc<ConversationLockMap> {
        self.locks.clone()
    }

    fn locks_for(&self, conversation_id: Uuid) -> Arc<ConversationLocks> {
        self.locks.get(conversation_id)
    }

    fn report(&self, origin: Option<ConnectionId>, error: &SessionError) {
        if let Some(connection) = origin {
            self.rooms.send_to(
                connection,
                ServerEvent::Error {
                    message: error.to_string(),
                },
            );
        }
    }

    // --- Submission pipeline ---

    /// Run the new-message or edit pipeline for one submission.
    ///
    /// Failures before `processing_started` reach only `origin`. Failures
    /// after it also reach only `origin`, and the room still gets
    /// `processing_complete`.
    #[tracing::instrument(
        name = "submit_message",
        skip(self, request),
        fields(
            conversation_id = %request.conversation_id,
            caller_id = %request.caller_id,
            is_edit = request.is_edit,
        )
    )]
    pub async fn submit_message(
        &self,
        origin: ConnectionId,
        request: SubmitRequest,
    ) -> Result<SubmitOutcome, SessionError> {
        let conversation_id = request.conversation_id;
        let locks = self.locks_for(conversation_id);
        let _pipeline = locks.pipeline.lock().await;

        let (thread, user_message) = match self.accept(&request, &locks).await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(error = %e, "submission rejected");
                self.report(Some(origin), &e);
                return Err(e);
            }
        };

        self.rooms
            .broadcast(conversation_id, &ServerEvent::ProcessingStarted { conversation_id });

        let outcome = self
            .respond(&thread, &request, user_message, &locks)
            .await;

        self.rooms
            .broadcast(conversation_id, &ServerEvent::ProcessingComplete { conversation_id });

        if let Err(e) = &outcome {
            tracing::warn!(error = %e, "pipeline failed after processing started");
            self.report(Some(origin), e);
        }
        outcome
    }

    /// Validate, then persist and broadcast the user message.
    async fn accept(
        &self,
        request: &SubmitRequest,
        locks: &ConversationLocks,
    ) -> Result<(Thread, ChatMessage), SessionError> {
        let content = request.content.trim();
        if content.is_empty() {
            return Err(SessionError::Validation("message content is empty".to_string()));
        }

        let thread = self
            .repo
            .get_thread(&request.conversation_id)
            .await?
            .ok_or(SessionError::ConversationNotFound)?;
        if thread.user_id != request.caller_id {
            return Err(SessionError::Forbidden);
        }

        let message = if request.is_edit {
            self.apply_edit(request, content, locks).await?
        } else {
            let message = ChatMessage::new(thread.id, MessageRole::User, content);
            let _commit = locks.commit.lock().await;
            self.repo.create_message(&message).await?;
            self.rooms.broadcast(
                thread.id,
                &ServerEvent::MessageCreated {
                    message: message.clone(),
                },
            );
            message
        };

        self.touch(thread.id).await;
        Ok((thread, message))
    }

    async fn apply_edit(
        &self,
        request: &SubmitRequest,
        content: &str,
        locks: &ConversationLocks,
    ) -> Result<ChatMessage, SessionError> {
        let target = request
            .target_message_id
            .ok_or_else(|| SessionError::Validation("edit requires target_message_id".to_string()))?;
        let existing = self
            .repo
            .get_message(&target, None)
            .await?
            .ok_or(SessionError::MessageNotFound)?;
        if existing.conversation_id != request.conversation_id {
            return Err(SessionError::MessageNotFound);
        }
        if existing.role != MessageRole::User {
            return Err(SessionError::Validation(
                "only user messages can be edited".to_string(),
            ));
        }

        let _commit = locks.commit.lock().await;
        let updated = self.repo.update_message(&target, content).await?;
        self.rooms.broadcast(
            request.conversation_id,
            &ServerEvent::MessageUpdated {
                message: updated.clone(),
            },
        );
        Ok(updated)
    }

    /// Route, persist the translation, replace the previous reply on edit,
    /// generate, and persist the reply.
    async fn respond(
        &self,
        thread: &Thread,
        request: &SubmitRequest,
        user_message: ChatMessage,
        locks: &ConversationLocks,
    ) -> Result<SubmitOutcome, SessionError> {
        let decision = self
            .router
            .route(RouteRequest {
                message_id: user_message.id,
                content: user_message.content.clone(),
                conversation_id: thread.id,
                caller_id: request.caller_id,
                language: thread.language,
                web_search_enabled: thread.web_search_enabled,
            })
            .await?;

        if let Some(draft) = decision.translation.clone() {
            let record = draft.into_record(user_message.id, thread.id, &decision.original_content);
            self.repo.save_translation(&record).await?;
        }

        if request.is_edit {
            if let Some(previous) = self.repo.get_last_assistant_message(&thread.id).await? {
                let _commit = locks.commit.lock().await;
                self.repo.delete_message(&previous.id).await?;
                self.rooms.broadcast(
                    thread.id,
                    &ServerEvent::MessageDeleted {
                        conversation_id: thread.id,
                        message_id: previous.id,
                    },
                );
            }
        }

        let (text, fell_back) = self.generate(&decision.inference_request()).await;
        let reply = ChatMessage::new(thread.id, MessageRole::Assistant, text);
        {
            let _commit = locks.commit.lock().await;
            self.repo.create_message(&reply).await?;
            self.rooms.broadcast(
                thread.id,
                &ServerEvent::MessageCreated {
                    message: reply.clone(),
                },
            );
        }
        self.touch(thread.id).await;

        tracing::info!(
            reply_id = %reply.id,
            translated = decision.use_processed_text,
            fell_back,
            "reply delivered"
        );
        Ok(SubmitOutcome {
            user_message,
            reply,
            fell_back,
        })
    }

    /// Bounded inference. Any failure becomes the apology text.
    async fn generate(&self, request: &InferenceRequest) -> (String, bool) {
        let timeout = self.settings.inference_timeout;
        match tokio::time::timeout(timeout, self.backend.generate(request)).await {
            Ok(Ok(text)) if !text.trim().is_empty() => (text, false),
            Ok(Ok(_)) => {
                tracing::warn!(backend = self.backend.name(), "inference returned empty text");
                (self.settings.apology_text.clone(), true)
            }
            Ok(Err(e)) => {
                tracing::warn!(backend = self.backend.name(), error = %e, "inference failed");
                (self.settings.apology_text.clone(), true)
            }
            Err(_) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    timeout_secs = timeout.as_secs_f64(),
                    "inference timed out"
                );
                (self.settings.apology_text.clone(), true)
            }
        }
    }

    async fn touch(&self, conversation_id: Uuid) {
        if let Err(e) = self.repo.touch_thread(&conversation_id).await {
            tracing::warn!(%conversation_id, error = %e, "failed to update thread timestamp");
        }
    }

    // --- Reactions ---

    /// Toggle `caller_id`'s reaction and broadcast one `message_updated`
    /// with fresh tallies. Returns the message as `caller_id` sees it.
    pub async fn react(
        &self,
        origin: Option<ConnectionId>,
        message_id: Uuid,
        caller_id: Uuid,
        kind: ReactionKind,
    ) -> Result<ChatMessage, SessionError> {
        let result = self.apply_reaction(message_id, caller_id, kind).await;
        if let Err(e) = &result {
            self.report(origin, e);
        }
        result
    }

    async fn apply_reaction(
        &self,
        message_id: Uuid,
        caller_id: Uuid,
        kind: ReactionKind,
    ) -> Result<ChatMessage, SessionError> {
        let message = self
            .repo
            .get_message(&message_id, None)
            .await?
            .ok_or(SessionError::MessageNotFound)?;
        let conversation_id = message.conversation_id;
        let locks = self.locks_for(conversation_id);

        let _commit = locks.commit.lock().await;
        let current = self.repo.get_reaction(&message_id, &caller_id).await?;
        let next = ReactionKind::next(current, kind);
        self.repo.set_reaction(&message_id, &caller_id, next).await?;

        let fresh = self
            .repo
            .get_message(&message_id, None)
            .await?
            .ok_or(SessionError::MessageNotFound)?;
        self.rooms.broadcast(
            conversation_id,
            &ServerEvent::MessageUpdated {
                message: fresh.clone(),
            },
        );
        tracing::debug!(%message_id, ?current, ?next, "reaction toggled");

        Ok(ChatMessage {
            user_reaction: next,
            ..fresh
        })
    }
}
