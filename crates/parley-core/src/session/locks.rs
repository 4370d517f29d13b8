//! Per-conversation locks.
//!
//! The pipeline lock is held for a whole submission, and by any settings
//! change that depends on which messages exist (the language lock). The
//! commit lock is held around each persist-then-broadcast pair. Both are
//! fair `tokio::sync::Mutex`es, so waiters proceed in arrival order.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct ConversationLocks {
    pub pipeline: Mutex<()>,
    pub commit: Mutex<()>,
}

/// Lazily created locks keyed by conversation id. Shared between the
/// session manager and the thread service.
#[derive(Debug, Default)]
pub struct ConversationLockMap {
    locks: DashMap<Uuid, Arc<ConversationLocks>>,
}

impl ConversationLockMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The locks for `conversation_id`, created on first use.
    pub fn get(&self, conversation_id: Uuid) -> Arc<ConversationLocks> {
        self.locks.entry(conversation_id).or_default().clone()
    }

    pub fn forget(&self, conversation_id: Uuid) {
        self.locks.remove(&conversation_id);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
