//! In-memory room membership and typing presence.
//!
//! Every live connection registers an outbound `mpsc` sender. Rooms are keyed
//! by conversation id and hold the subscribed connections plus at most one
//! active typing signal. Sending to a connection whose receiver is gone is a
//! silent no-op.

use std::collections::HashSet;

use dashmap::DashMap;
use parley_types::chat::MessageRole;
use parley_types::event::ServerEvent;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identifier of one live connection.
pub type ConnectionId = Uuid;

/// Outbound queue of a connection. FIFO, so per-connection delivery order
/// matches send order.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// The connection currently typing in a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingState {
    pub connection: ConnectionId,
    pub role: MessageRole,
}

#[derive(Debug, Default)]
struct Room {
    members: HashSet<ConnectionId>,
    typing: Option<TypingState>,
}

/// Connection registry and conversation rooms.
#[derive(Default)]
pub struct RoomRegistry {
    connections: DashMap<ConnectionId, EventSender>,
    rooms: DashMap<Uuid, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and return its id.
    pub fn connect(&self, sender: EventSender) -> ConnectionId {
        let id = Uuid::now_v7();
        self.connections.insert(id, sender);
        tracing::debug!(connection = %id, "connection registered");
        id
    }

    /// Drop a connection and remove it from every room. Typing signals it
    /// held are cleared. Returns the rooms it was in.
    pub fn disconnect(&self, connection: ConnectionId) -> Vec<Uuid> {
        self.connections.remove(&connection);

        let mut left = Vec::new();
        self.rooms.retain(|conversation_id, room| {
            if room.members.remove(&connection) {
                left.push(*conversation_id);
            }
            if room.typing.is_some_and(|t| t.connection == connection) {
                room.typing = None;
            }
            !room.members.is_empty()
        });
        tracing::debug!(connection = %connection, rooms = left.len(), "connection removed");
        left
    }

    /// Subscribe a connection to a conversation. Returns `false` if it was
    /// already a member.
    pub fn join(&self, connection: ConnectionId, conversation_id: Uuid) -> bool {
        self.rooms
            .entry(conversation_id)
            .or_default()
            .members
            .insert(connection)
    }

    /// Unsubscribe a connection. Returns `false` if it was not a member.
    pub fn leave(&self, connection: ConnectionId, conversation_id: Uuid) -> bool {
        let removed = match self.rooms.get_mut(&conversation_id) {
            Some(mut room) => {
                let removed = room.members.remove(&connection);
                if room.typing.is_some_and(|t| t.connection == connection) {
                    room.typing = None;
                }
                removed
            }
            None => false,
        };
        self.rooms
            .remove_if(&conversation_id, |_, room| room.members.is_empty());
        removed
    }

    pub fn is_member(&self, connection: ConnectionId, conversation_id: Uuid) -> bool {
        self.rooms
            .get(&conversation_id)
            .is_some_and(|room| room.members.contains(&connection))
    }

    pub fn members(&self, conversation_id: Uuid) -> Vec<ConnectionId> {
        self.rooms
            .get(&conversation_id)
            .map(|room| room.members.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn typing(&self, conversation_id: Uuid) -> Option<TypingState> {
        self.rooms.get(&conversation_id).and_then(|room| room.typing)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Send to a single connection. Returns whether it was queued.
    pub fn send_to(&self, connection: ConnectionId, event: ServerEvent) -> bool {
        match self.connections.get(&connection) {
            Some(sender) => sender.send(event).is_ok(),
            None => false,
        }
    }

    /// Send to every member of a room. Returns the number of deliveries.
    pub fn broadcast(&self, conversation_id: Uuid, event: &ServerEvent) -> usize {
        self.fan_out(conversation_id, None, event)
    }

    /// Send to every member except `sender`.
    pub fn broadcast_except(
        &self,
        conversation_id: Uuid,
        sender: ConnectionId,
        event: &ServerEvent,
    ) -> usize {
        self.fan_out(conversation_id, Some(sender), event)
    }

    fn fan_out(&self, conversation_id: Uuid, skip: Option<ConnectionId>, event: &ServerEvent) -> usize {
        // Snapshot members so no room guard is held while sending.
        let members = self.members(conversation_id);
        members
            .into_iter()
            .filter(|m| Some(*m) != skip)
            .filter(|m| self.send_to(*m, event.clone()))
            .count()
    }

    /// Record `connection` as typing and notify the other members.
    ///
    /// Ignored unless `connection` is a member of the room.
    pub fn start_typing(&self, conversation_id: Uuid, connection: ConnectionId, role: MessageRole) -> bool {
        let recorded = match self.rooms.get_mut(&conversation_id) {
            Some(mut room) if room.members.contains(&connection) => {
                room.typing = Some(TypingState { connection, role });
                true
            }
            _ => false,
        };
        if recorded {
            self.broadcast_except(
                conversation_id,
                connection,
                &ServerEvent::TypingStarted {
                    conversation_id,
                    role,
                },
            );
        }
        recorded
    }

    /// Clear `connection`'s typing signal and notify the other members.
    ///
    /// Returns `false`, and sends nothing, when `connection` is not the one
    /// typing in that room.
    pub fn stop_typing(&self, conversation_id: Uuid, connection: ConnectionId) -> bool {
        let cleared = match self.rooms.get_mut(&conversation_id) {
            Some(mut room) if room.typing.is_some_and(|t| t.connection == connection) => {
                room.typing = None;
                true
            }
            _ => false,
        };
        if cleared {
            self.broadcast_except(
                conversation_id,
                connection,
                &ServerEvent::TypingStopped { conversation_id },
            );
        }
        cleared
    }
}

impl std::fmt::Debug for RoomRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomRegistry")
            .field("connections", &self.connections.len())
            .field("rooms", &self.rooms.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn connect(registry: &RoomRegistry) -> (ConnectionId, UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (registry.connect(tx), rx)
    }

    fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_join_is_idempotent() {
        let registry = RoomRegistry::new();
        let (conn, _rx) = connect(&registry);
        let conv = Uuid::now_v7();
        assert!(registry.join(conn, conv));
        assert!(!registry.join(conn, conv));
        assert_eq!(registry.members(conv), vec![conn]);
    }

    #[test]
    fn test_leave_twice_matches_leave_once() {
        let registry = RoomRegistry::new();
        let (a, mut rx_a) = connect(&registry);
        let (b, mut rx_b) = connect(&registry);
        let conv = Uuid::now_v7();
        registry.join(a, conv);
        registry.join(b, conv);

        assert!(registry.leave(a, conv));
        assert!(!registry.leave(a, conv));

        assert_eq!(registry.members(conv), vec![b]);
        assert!(drain(&mut rx_a).is_empty());
        assert!(drain(&mut rx_b).is_empty());
    }

    #[test]
    fn test_leave_unjoined_room_is_noop() {
        let registry = RoomRegistry::new();
        let (conn, _rx) = connect(&registry);
        assert!(!registry.leave(conn, Uuid::now_v7()));
        assert_eq!(registry.room_count(), 0);
    }

    #[test]
    fn test_empty_rooms_are_dropped() {
        let registry = RoomRegistry::new();
        let (conn, _rx) = connect(&registry);
        let conv = Uuid::now_v7();
        registry.join(conn, conv);
        registry.leave(conn, conv);
        assert_eq!(registry.room_count(), 0);
    }

    #[test]
    fn test_broadcast_reaches_members_only() {
        let registry = RoomRegistry::new();
        let (a, mut rx_a) = connect(&registry);
        let (_b, mut rx_b) = connect(&registry);
        let conv = Uuid::now_v7();
        registry.join(a, conv);

        let delivered = registry.broadcast(conv, &ServerEvent::ProcessingStarted { conversation_id: conv });
        assert_eq!(delivered, 1);
        assert_eq!(drain(&mut rx_a).len(), 1);
        assert!(drain(&mut rx_b).is_empty());
    }

    #[test]
    fn test_typing_excludes_sender() {
        let registry = RoomRegistry::new();
        let (a, mut rx_a) = connect(&registry);
        let (b, mut rx_b) = connect(&registry);
        let conv = Uuid::now_v7();
        registry.join(a, conv);
        registry.join(b, conv);

        registry.start_typing(conv, a, MessageRole::User);

        assert!(drain(&mut rx_a).is_empty());
        assert_eq!(
            drain(&mut rx_b),
            vec![ServerEvent::TypingStarted {
                conversation_id: conv,
                role: MessageRole::User
            }]
        );
        assert_eq!(
            registry.typing(conv),
            Some(TypingState {
                connection: a,
                role: MessageRole::User
            })
        );
    }

    #[test]
    fn test_stop_typing_is_idempotent() {
        let registry = RoomRegistry::new();
        let (a, _rx_a) = connect(&registry);
        let (b, mut rx_b) = connect(&registry);
        let conv = Uuid::now_v7();
        registry.join(a, conv);
        registry.join(b, conv);
        registry.start_typing(conv, a, MessageRole::User);
        drain(&mut rx_b);

        assert!(registry.stop_typing(conv, a));
        assert!(!registry.stop_typing(conv, a));

        assert_eq!(
            drain(&mut rx_b),
            vec![ServerEvent::TypingStopped {
                conversation_id: conv
            }]
        );
    }

    #[test]
    fn test_disconnect_leaves_every_room() {
        let registry = RoomRegistry::new();
        let (a, _rx_a) = connect(&registry);
        let (b, _rx_b) = connect(&registry);
        let first = Uuid::now_v7();
        let second = Uuid::now_v7();
        registry.join(a, first);
        registry.join(a, second);
        registry.join(b, second);
        registry.start_typing(second, a, MessageRole::User);

        let mut left = registry.disconnect(a);
        left.sort();
        let mut expected = vec![first, second];
        expected.sort();
        assert_eq!(left, expected);

        assert_eq!(registry.connection_count(), 1);
        assert_eq!(registry.members(second), vec![b]);
        assert!(registry.typing(second).is_none());
        assert!(!registry.send_to(a, ServerEvent::Pong));
    }

    #[test]
    fn test_send_to_closed_receiver_is_noop() {
        let registry = RoomRegistry::new();
        let (conn, rx) = connect(&registry);
        drop(rx);
        assert!(!registry.send_to(conn, ServerEvent::Pong));
    }

    #[test]
    fn test_non_member_cannot_type() {
        let registry = RoomRegistry::new();
        let (member, mut rx_member) = connect(&registry);
        let (outsider, _rx_outsider) = connect(&registry);
        let conv = Uuid::now_v7();
        registry.join(member, conv);

        assert!(!registry.start_typing(conv, outsider, MessageRole::User));
        assert!(drain(&mut rx_member).is_empty());
        assert!(registry.typing(conv).is_none());

        // No room is created for a conversation nobody joined.
        assert!(!registry.start_typing(Uuid::now_v7(), outsider, MessageRole::User));
        assert_eq!(registry.room_count(), 1);
    }

    #[test]
    fn test_stop_typing_only_clears_own_signal() {
        let registry = RoomRegistry::new();
        let (a, mut rx_a) = connect(&registry);
        let (b, mut rx_b) = connect(&registry);
        let conv = Uuid::now_v7();
        registry.join(a, conv);
        registry.join(b, conv);
        registry.start_typing(conv, a, MessageRole::User);
        drain(&mut rx_b);

        assert!(!registry.stop_typing(conv, b));
        assert!(drain(&mut rx_a).is_empty());
        assert_eq!(
            registry.typing(conv),
            Some(TypingState {
                connection: a,
                role: MessageRole::User
            })
        );

        assert!(registry.stop_typing(conv, a));
        assert_eq!(
            drain(&mut rx_b),
            vec![ServerEvent::TypingStopped {
                conversation_id: conv
            }]
        );
    }
}
