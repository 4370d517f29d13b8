//! Session and presence management: rooms, typing signals, and the
//! per-conversation submission pipeline.

pub mod locks;
pub mod manager;
pub mod rooms;

pub use locks::{ConversationLockMap, ConversationLocks};
pub use manager::{SessionError, SessionManager, SessionSettings, SubmitOutcome, SubmitRequest};
pub use rooms::{ConnectionId, EventSender, RoomRegistry, TypingState};
