//! Thread, message, reaction, translation, and summary types for Parley.
//!
//! These types model multilingual conversations between a user and the
//! assistant: threads, their messages, per-user reactions, translation
//! records, and the rolling conversation summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::language::Language;

/// Author of a message within a thread.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (role IN ('user', 'assistant'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A reaction a user can leave on a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl ReactionKind {
    /// Resolve the toggle: requesting the active reaction clears it,
    /// anything else replaces it.
    pub fn next(current: Option<ReactionKind>, requested: ReactionKind) -> Option<ReactionKind> {
        match current {
            Some(active) if active == requested => None,
            _ => Some(requested),
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReactionKind::Like => write!(f, "like"),
            ReactionKind::Dislike => write!(f, "dislike"),
        }
    }
}

impl FromStr for ReactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "like" => Ok(ReactionKind::Like),
            "dislike" => Ok(ReactionKind::Dislike),
            other => Err(format!("invalid reaction: '{other}'")),
        }
    }
}

/// A conversation thread owned by a single user.
///
/// `language` is fixed from the owner's preference at creation and becomes
/// immutable once the thread holds a user message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub language: Language,
    pub web_search_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating a thread.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateThreadRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub web_search_enabled: bool,
}

/// A single message within a thread.
///
/// `likes`/`dislikes` are tallies across all users. `user_reaction` is the
/// viewing caller's own reaction and is `None` when no viewer is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub likes: u32,
    pub dislikes: u32,
    #[serde(default)]
    pub user_reaction: Option<ReactionKind>,
}

impl ChatMessage {
    /// Build a fresh message with zero tallies, timestamped now.
    pub fn new(conversation_id: Uuid, role: MessageRole, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            conversation_id,
            role,
            content: content.into(),
            created_at: now,
            updated_at: now,
            likes: 0,
            dislikes: 0,
            user_reaction: None,
        }
    }
}

/// One line of conversation history as fed to a summarizer.
///
/// `content` is the processing-language text when a translation exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub message_id: Uuid,
    pub role: MessageRole,
    pub content: String,
}

/// Immutable record of one translation performed for a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub id: Uuid,
    pub message_id: Uuid,
    pub conversation_id: Uuid,
    pub original_text: String,
    pub translated_text: String,
    pub source_language: Language,
    pub target_language: Language,
    pub created_at: DateTime<Utc>,
}

/// Rolling summary of a conversation. One per thread, replaced wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation_id: Uuid,
    pub summary: String,
    /// Number of history entries the summary was derived from.
    pub message_count: u32,
    pub updated_at: DateTime<Utc>,
}

/// A chat participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
    pub preferred_language: Language,
    pub created_at: DateTime<Utc>,
}

/// Aggregate counters reported by the status command and stats endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatStats {
    pub users: u64,
    pub threads: u64,
    pub messages: u64,
    pub translations: u64,
}
