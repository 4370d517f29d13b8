//! Session boundary events and commands.
//!
//! `ServerEvent` is what a connection receives; `ClientCommand` is what it
//! sends. Both travel as JSON objects tagged by `"type"`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::{ChatMessage, MessageRole};

/// Events pushed to connections subscribed to a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A message was appended to the conversation.
    MessageCreated { message: ChatMessage },

    /// A message's content or reaction tallies changed.
    MessageUpdated { message: ChatMessage },

    /// A message was removed (the previous assistant reply during an edit).
    MessageDeleted {
        conversation_id: Uuid,
        message_id: Uuid,
    },

    /// The conversation started generating a reply.
    ProcessingStarted { conversation_id: Uuid },

    /// Reply generation finished, successfully or not.
    ProcessingComplete { conversation_id: Uuid },

    /// Another participant started typing.
    TypingStarted {
        conversation_id: Uuid,
        role: MessageRole,
    },

    /// The typing participant stopped.
    TypingStopped { conversation_id: Uuid },

    /// Sent only to the connection whose command failed.
    Error { message: String },

    /// Reply to a client ping.
    Pong,
}

impl ServerEvent {
    /// Conversation the event belongs to, if any.
    pub fn conversation_id(&self) -> Option<Uuid> {
        match self {
            ServerEvent::MessageCreated { message } | ServerEvent::MessageUpdated { message } => {
                Some(message.conversation_id)
            }
            ServerEvent::MessageDeleted {
                conversation_id, ..
            }
            | ServerEvent::ProcessingStarted { conversation_id }
            | ServerEvent::ProcessingComplete { conversation_id }
            | ServerEvent::TypingStarted {
                conversation_id, ..
            }
            | ServerEvent::TypingStopped { conversation_id } => Some(*conversation_id),
            ServerEvent::Error { .. } | ServerEvent::Pong => None,
        }
    }
}

/// Commands a client sends over its WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    JoinRoom {
        conversation_id: Uuid,
    },
    LeaveRoom {
        conversation_id: Uuid,
    },
    SubmitMessage {
        conversation_id: Uuid,
        content: String,
        #[serde(default)]
        is_edit: bool,
        #[serde(default)]
        target_message_id: Option<Uuid>,
    },
    TypingStarted {
        conversation_id: Uuid,
        #[serde(default = "default_typing_role")]
        role: MessageRole,
    },
    TypingStopped {
        conversation_id: Uuid,
    },
    Ping,
}

fn default_typing_role() -> MessageRole {
    MessageRole::User
}
