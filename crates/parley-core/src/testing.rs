//! In-memory doubles for the four leaf contracts, shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use parley_types::chat::{
    ChatMessage, ChatStats, ConversationSummary, HistoryEntry, MessageRole, ReactionKind, Thread,
    TranslationRecord, User,
};
use parley_types::error::{RepositoryError, SummaryError};
use parley_types::inference::{InferenceError, InferenceRequest};
use parley_types::language::{Language, TranslationError};
use uuid::Uuid;

use crate::chat::repository::ChatRepository;
use crate::inference::InferenceBackend;
use crate::language::LanguageAdapter;
use crate::summary::Summarizer;

/// Poll `condition` every 10 ms for up to two seconds. Used for work that
/// runs on detached tasks, such as summary refreshes.
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    threads: HashMap<Uuid, Thread>,
    messages: Vec<ChatMessage>,
    reactions: HashMap<(Uuid, Uuid), ReactionKind>,
    translations: Vec<TranslationRecord>,
    summaries: HashMap<Uuid, ConversationSummary>,
}

/// `ChatRepository` over plain collections. Operations named in
/// `fail_on` return `RepositoryError::Query`.
#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<State>,
    failing: Mutex<HashSet<&'static str>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    fn check(&self, op: &'static str) -> Result<(), RepositoryError> {
        if self.failing.lock().unwrap().contains(op) {
            Err(RepositoryError::Query(format!("{op} failed")))
        } else {
            Ok(())
        }
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state.lock().unwrap().messages.clone()
    }

    pub fn translations(&self) -> Vec<TranslationRecord> {
        self.state.lock().unwrap().translations.clone()
    }

    pub fn summary(&self, conversation_id: Uuid) -> Option<ConversationSummary> {
        self.state.lock().unwrap().summaries.get(&conversation_id).cloned()
    }

    pub fn thread(&self, conversation_id: Uuid) -> Option<Thread> {
        self.state.lock().unwrap().threads.get(&conversation_id).cloned()
    }

    /// Insert a thread owned by `user_id` in `language`.
    pub fn seed_thread(&self, user_id: Uuid, language: Language, web_search_enabled: bool) -> Thread {
        let now = Utc::now();
        let thread = Thread {
            id: Uuid::now_v7(),
            user_id,
            title: "Test thread".to_string(),
            language,
            web_search_enabled,
            created_at: now,
            updated_at: now,
        };
        self.state
            .lock()
            .unwrap()
            .threads
            .insert(thread.id, thread.clone());
        thread
    }

    fn with_viewer(state: &State, mut message: ChatMessage, viewer: Option<&Uuid>) -> ChatMessage {
        message.likes = state
            .reactions
            .iter()
            .filter(|((m, _), k)| *m == message.id && **k == ReactionKind::Like)
            .count() as u32;
        message.dislikes = state
            .reactions
            .iter()
            .filter(|((m, _), k)| *m == message.id && **k == ReactionKind::Dislike)
            .count() as u32;
        message.user_reaction =
            viewer.and_then(|v| state.reactions.get(&(message.id, *v)).copied());
        message
    }
}

impl ChatRepository for InMemoryRepository {
    async fn create_message(&self, message: &ChatMessage) -> Result<(), RepositoryError> {
        self.check("create_message")?;
        self.state.lock().unwrap().messages.push(message.clone());
        Ok(())
    }

    async fn update_message(
        &self,
        message_id: &Uuid,
        content: &str,
    ) -> Result<ChatMessage, RepositoryError> {
        self.check("update_message")?;
        let mut state = self.state.lock().unwrap();
        let message = state
            .messages
            .iter_mut()
            .find(|m| m.id == *message_id)
            .ok_or(RepositoryError::NotFound)?;
        message.content = content.to_string();
        message.updated_at = Utc::now();
        let updated = message.clone();
        Ok(Self::with_viewer(&state, updated, None))
    }

    async fn delete_message(&self, message_id: &Uuid) -> Result<(), RepositoryError> {
        self.check("delete_message")?;
        let mut state = self.state.lock().unwrap();
        state.messages.retain(|m| m.id != *message_id);
        state.reactions.retain(|(m, _), _| m != message_id);
        state.translations.retain(|t| t.message_id != *message_id);
        Ok(())
    }

    async fn get_messages(
        &self,
        conversation_id: &Uuid,
        viewer: Option<&Uuid>,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        self.check("get_messages")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .messages
            .iter()
            .filter(|m| m.conversation_id == *conversation_id)
            .cloned()
            .map(|m| Self::with_viewer(&state, m, viewer))
            .collect())
    }

    async fn get_message(
        &self,
        message_id: &Uuid,
        viewer: Option<&Uuid>,
    ) -> Result<Option<ChatMessage>, RepositoryError> {
        self.check("get_message")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .messages
            .iter()
            .find(|m| m.id == *message_id)
            .cloned()
            .map(|m| Self::with_viewer(&state, m, viewer)))
    }

    async fn get_last_assistant_message(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<ChatMessage>, RepositoryError> {
        self.check("get_last_assistant_message")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .messages
            .iter()
            .rev()
            .find(|m| m.conversation_id == *conversation_id && m.role == MessageRole::Assistant)
            .cloned())
    }

    async fn save_translation(&self, record: &TranslationRecord) -> Result<(), RepositoryError> {
        self.check("save_translation")?;
        self.state.lock().unwrap().translations.push(record.clone());
        Ok(())
    }

    async fn get_translations(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<TranslationRecord>, RepositoryError> {
        self.check("get_translations")?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .translations
            .iter()
            .filter(|t| t.conversation_id == *conversation_id)
            .cloned()
            .collect())
    }

    async fn upsert_summary(&self, summary: &ConversationSummary) -> Result<(), RepositoryError> {
        self.check("upsert_summary")?;
        self.state
            .lock()
            .unwrap()
            .summaries
            .insert(summary.conversation_id, summary.clone());
        Ok(())
    }

    async fn get_summary(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<ConversationSummary>, RepositoryError> {
        self.check("get_summary")?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .summaries
            .get(conversation_id)
            .cloned())
    }

    async fn create_thread(&self, thread: &Thread) -> Result<Thread, RepositoryError> {
        self.check("create_thread")?;
        self.state
            .lock()
            .unwrap()
            .threads
            .insert(thread.id, thread.clone());
        Ok(thread.clone())
    }

    async fn get_thread(&self, conversation_id: &Uuid) -> Result<Option<Thread>, RepositoryError> {
        self.check("get_thread")?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .threads
            .get(conversation_id)
            .cloned())
    }

    async fn list_threads(&self, user_id: &Uuid) -> Result<Vec<Thread>, RepositoryError> {
        self.check("list_threads")?;
        let mut threads: Vec<Thread> = self
            .state
            .lock()
            .unwrap()
            .threads
            .values()
            .filter(|t| t.user_id == *user_id)
            .cloned()
            .collect();
        threads.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(threads)
    }

    async fn rename_thread(&self, conversation_id: &Uuid, title: &str) -> Result<(), RepositoryError> {
        self.check("rename_thread")?;
        let mut state = self.state.lock().unwrap();
        let thread = state
            .threads
            .get_mut(conversation_id)
            .ok_or(RepositoryError::NotFound)?;
        thread.title = title.to_string();
        thread.updated_at = Utc::now();
        Ok(())
    }

    async fn set_web_search(&self, conversation_id: &Uuid, enabled: bool) -> Result<(), RepositoryError> {
        self.check("set_web_search")?;
        let mut state = self.state.lock().unwrap();
        let thread = state
            .threads
            .get_mut(conversation_id)
            .ok_or(RepositoryError::NotFound)?;
        thread.web_search_enabled = enabled;
        thread.updated_at = Utc::now();
        Ok(())
    }

    async fn set_thread_language(
        &self,
        conversation_id: &Uuid,
        language: Language,
    ) -> Result<bool, RepositoryError> {
        self.check("set_thread_language")?;
        let mut state = self.state.lock().unwrap();
        let locked = state
            .messages
            .iter()
            .any(|m| m.conversation_id == *conversation_id && m.role == MessageRole::User);
        let thread = state
            .threads
            .get_mut(conversation_id)
            .ok_or(RepositoryError::NotFound)?;
        if locked {
            return Ok(false);
        }
        thread.language = language;
        thread.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete_thread(&self, conversation_id: &Uuid) -> Result<(), RepositoryError> {
        self.check("delete_thread")?;
        let mut state = self.state.lock().unwrap();
        state.threads.remove(conversation_id);
        state.messages.retain(|m| m.conversation_id != *conversation_id);
        state
            .translations
            .retain(|t| t.conversation_id != *conversation_id);
        state.summaries.remove(conversation_id);
        Ok(())
    }

    async fn touch_thread(&self, conversation_id: &Uuid) -> Result<(), RepositoryError> {
        self.check("touch_thread")?;
        if let Some(thread) = self.state.lock().unwrap().threads.get_mut(conversation_id) {
            thread.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn get_reaction(
        &self,
        message_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Option<ReactionKind>, RepositoryError> {
        self.check("get_reaction")?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .reactions
            .get(&(*message_id, *user_id))
            .copied())
    }

    async fn set_reaction(
        &self,
        message_id: &Uuid,
        user_id: &Uuid,
        reaction: Option<ReactionKind>,
    ) -> Result<(), RepositoryError> {
        self.check("set_reaction")?;
        let mut state = self.state.lock().unwrap();
        match reaction {
            Some(kind) => {
                state.reactions.insert((*message_id, *user_id), kind);
            }
            None => {
                state.reactions.remove(&(*message_id, *user_id));
            }
        }
        Ok(())
    }

    async fn get_user(&self, user_id: &Uuid) -> Result<Option<User>, RepositoryError> {
        self.check("get_user")?;
        Ok(self.state.lock().unwrap().users.get(user_id).cloned())
    }

    async fn upsert_user(&self, user: &User) -> Result<(), RepositoryError> {
        self.check("upsert_user")?;
        self.state
            .lock()
            .unwrap()
            .users
            .insert(user.id, user.clone());
        Ok(())
    }

    async fn get_stats(&self) -> Result<ChatStats, RepositoryError> {
        self.check("get_stats")?;
        let state = self.state.lock().unwrap();
        Ok(ChatStats {
            users: state.users.len() as u64,
            threads: state.threads.len() as u64,
            messages: state.messages.len() as u64,
            translations: state.translations.len() as u64,
        })
    }
}

// ---------------------------------------------------------------------------
// Language adapter
// ---------------------------------------------------------------------------

/// Adapter whose every call fails.
pub struct FailingAdapter;

impl LanguageAdapter for FailingAdapter {
    async fn translate(
        &self,
        _text: &str,
        _source: Language,
        _target: Language,
    ) -> Result<String, TranslationError> {
        Err(TranslationError::Engine("adapter offline".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Summarizer
// ---------------------------------------------------------------------------

enum SummaryMode {
    Ok,
    Fail,
    Slow(Duration),
}

/// Records every history it is asked to summarize.
pub struct RecordingSummarizer {
    mode: SummaryMode,
    seen: Mutex<Vec<Vec<HistoryEntry>>>,
}

impl RecordingSummarizer {
    pub fn new() -> Self {
        Self {
            mode: SummaryMode::Ok,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            mode: SummaryMode::Fail,
            ..Self::new()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            mode: SummaryMode::Slow(delay),
            ..Self::new()
        }
    }

    pub fn histories(&self) -> Vec<Vec<HistoryEntry>> {
        self.seen.lock().unwrap().clone()
    }
}

impl Summarizer for RecordingSummarizer {
    async fn summarize(&self, history: &[HistoryEntry]) -> Result<String, SummaryError> {
        self.seen.lock().unwrap().push(history.to_vec());
        match self.mode {
            SummaryMode::Ok => Ok(format!("summary of {} entries", history.len())),
            SummaryMode::Fail => Err(SummaryError::Backend("summarizer down".to_string())),
            SummaryMode::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok("late".to_string())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Inference backend
// ---------------------------------------------------------------------------

#[derive(Clone)]
enum Script {
    Reply(String),
    Echo,
    Fail,
    Slow(Duration),
}

/// Backend with a fixed behaviour that records requests and tracks how many
/// calls overlap.
pub struct ScriptedBackend {
    script: Script,
    delay: Duration,
    requests: Mutex<Vec<InferenceRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedBackend {
    fn with(script: Script) -> Self {
        Self {
            script,
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn reply(text: &str) -> Self {
        Self::with(Script::Reply(text.to_string()))
    }

    /// Replies with `"echo: {text}"`.
    pub fn echo() -> Self {
        Self::with(Script::Echo)
    }

    pub fn failing() -> Self {
        Self::with(Script::Fail)
    }

    /// Never answers within `delay`.
    pub fn slow(delay: Duration) -> Self {
        Self::with(Script::Slow(delay))
    }

    /// Sleep `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn requests(&self) -> Vec<InferenceRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl InferenceBackend for std::sync::Arc<ScriptedBackend> {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &InferenceRequest) -> Result<String, InferenceError> {
        self.as_ref().run(request).await
    }
}

impl InferenceBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &InferenceRequest) -> Result<String, InferenceError> {
        self.run(request).await
    }
}

impl ScriptedBackend {
    async fn run(&self, request: &InferenceRequest) -> Result<String, InferenceError> {
        self.requests.lock().unwrap().push(request.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let result = match &self.script {
            Script::Reply(text) => Ok(text.clone()),
            Script::Echo => Ok(format!("echo: {}", request.text)),
            Script::Fail => Err(InferenceError::Provider("backend exited with status 1".to_string())),
            Script::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                Ok("too late".to_string())
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
