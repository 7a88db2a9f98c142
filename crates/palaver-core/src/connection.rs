//! Push-channel session state machine.
//!
//! Owns the one live push connection for the current viewer. Uses the action
//! pattern: methods return actions for the driver to execute, so nothing here
//! touches a socket.
//!
//! # Lifecycle
//!
//! ```text
//! ┌─────────┐  start(identity)   ┌──────────────────┐
//! │ Stopped │───────────────────>│ Open(identity)   │──┐ start(other)
//! └─────────┘                    └──────────────────┘  │ Close + Open
//!      ^                            │        ^         │
//!      │          stop(reason)      │        └─────────┘
//!      └────────────────────────────┘
//! ```
//!
//! Outbound emits while stopped are dropped, not queued. Inbound frames while
//! stopped are discarded: the listeners went away with the session.

use palaver_proto::{
    ConversationId, Frame, Message, Payload, ViewerIdentity,
    payloads::{chat::ConversationScope, session::Presence},
};
use tracing::{debug, info, warn};

use crate::error::ConnectionError;

/// Actions returned by the connection state machine.
///
/// The driver executes these in order:
/// - `Open`: connect the push transport for this identity
/// - `SendFrame`: serialize and send the frame over the transport
/// - `Close`: disconnect the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Connect the push transport
    Open {
        /// Identity the transport authenticates as
        identity: ViewerIdentity,
    },

    /// Send this frame to the server
    SendFrame(Frame),

    /// Disconnect the push transport
    Close {
        /// Reason for closing the connection
        reason: String,
    },
}

/// Server-originated event, decoded from an inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A participant started typing.
    Typing {
        /// Conversation the participant is typing in
        conversation: ConversationId,
    },

    /// A participant stopped typing.
    StopTyping {
        /// Conversation the participant was typing in
        conversation: ConversationId,
    },

    /// A message was delivered.
    MessageReceived(Message),
}

/// One live push connection, bound to a single identity.
#[derive(Debug, Clone)]
struct ConnectionSession {
    identity: ViewerIdentity,
    joined: Option<ConversationId>,
}

impl ConnectionSession {
    fn new(identity: ViewerIdentity) -> Self {
        Self { identity, joined: None }
    }

    fn identity(&self) -> &ViewerIdentity {
        &self.identity
    }
}

/// Owner of the single push-channel session.
///
/// Pure state machine: no I/O, no environment storage.
///
/// # Invariants
///
/// - At most one session exists at a time.
/// - A session's identity never changes; a new identity means a new session.
#[derive(Debug, Clone, Default)]
pub struct ConnectionManager {
    session: Option<ConnectionSession>,
}

impl ConnectionManager {
    /// Create a manager with no session.
    pub fn new() -> Self {
        Self { session: None }
    }

    /// Whether a session is open.
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Identity of the open session.
    pub fn identity(&self) -> Option<&ViewerIdentity> {
        self.session.as_ref().map(ConnectionSession::identity)
    }

    /// Open a session for `identity` and register presence.
    ///
    /// Already open for the same identity: no-op. Open for a different
    /// identity: the old session is closed first.
    pub fn start(&mut self, identity: ViewerIdentity) -> Vec<ConnectionAction> {
        if self.identity() == Some(&identity) {
            debug!(user = %identity.user_id, "session already open");
            return Vec::new();
        }

        let mut actions = self.stop("identity changed");

        info!(user = %identity.user_id, "opening push session");
        let presence = Payload::PresenceRegister(Presence { user_id: identity.user_id.clone() });
        self.session = Some(ConnectionSession::new(identity.clone()));

        actions.push(ConnectionAction::Open { identity });
        actions.extend(self.send(presence));
        actions
    }

    /// Close the session, if any.
    ///
    /// Idempotent: with no session this returns no actions.
    pub fn stop(&mut self, reason: &str) -> Vec<ConnectionAction> {
        match self.session.take() {
            Some(session) => {
                info!(user = %session.identity.user_id, reason, "closing push session");
                vec![ConnectionAction::Close { reason: reason.to_string() }]
            },
            None => Vec::new(),
        }
    }

    /// Ask the server to route `conversation`'s events to this session.
    pub fn join_conversation(&mut self, conversation: &ConversationId) -> Vec<ConnectionAction> {
        if let Some(session) = self.session.as_mut() {
            session.joined = Some(conversation.clone());
        }
        self.send(Payload::JoinConversation(ConversationScope::new(conversation.clone())))
    }

    /// Stop re-joining the last conversation on reconnect.
    ///
    /// The server has no leave event, so nothing is sent.
    pub fn leave(&mut self) {
        if let Some(conversation) = self.session.as_mut().and_then(|s| s.joined.take()) {
            debug!(%conversation, "left conversation");
        }
    }

    /// Tell the server the viewer started typing.
    pub fn emit_typing(&self, conversation: &ConversationId) -> Vec<ConnectionAction> {
        self.send(Payload::Typing(ConversationScope::new(conversation.clone())))
    }

    /// Tell the server the viewer stopped typing.
    pub fn emit_stop_typing(&self, conversation: &ConversationId) -> Vec<ConnectionAction> {
        self.send(Payload::StopTyping(ConversationScope::new(conversation.clone())))
    }

    /// Fan a persisted message out to the other participants.
    pub fn emit_new_message(&self, message: &Message) -> Vec<ConnectionAction> {
        self.send(Payload::NewMessage(message.clone()))
    }

    /// Re-register after the transport reconnected on its own.
    ///
    /// Re-sends presence and the current join. Events pushed while the
    /// transport was down are not replayed.
    pub fn restore(&self) -> Vec<ConnectionAction> {
        let Some(session) = self.session.as_ref() else {
            debug!("transport restored without a session");
            return Vec::new();
        };

        let user_id = session.identity.user_id.clone();
        let joined = session.joined.clone();
        info!(user = %user_id, joined = ?joined, "re-registering after reconnect");

        let mut actions = self.send(Payload::PresenceRegister(Presence { user_id }));
        if let Some(conversation) = joined {
            let join = Payload::JoinConversation(ConversationScope::new(conversation));
            actions.extend(self.send(join));
        }
        actions
    }

    /// Decode an inbound frame into an event.
    ///
    /// Returns `Ok(None)` when no session is open.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::Protocol` if the frame does not decode
    /// - `ConnectionError::UnexpectedFrame` if the opcode only flows outbound
    pub fn handle_frame(&self, frame: &Frame) -> Result<Option<InboundEvent>, ConnectionError> {
        if self.session.is_none() {
            debug!(opcode = frame.header.opcode(), "no session, discarding frame");
            return Ok(None);
        }

        let event = match Payload::from_frame(frame)? {
            Payload::Typing(scope) => InboundEvent::Typing { conversation: scope.conversation },
            Payload::StopTyping(scope) => {
                InboundEvent::StopTyping { conversation: scope.conversation }
            },
            Payload::MessageReceived(message) => InboundEvent::MessageReceived(message),
            Payload::PresenceRegister(_) | Payload::JoinConversation(_) | Payload::NewMessage(_) => {
                return Err(ConnectionError::UnexpectedFrame { opcode: frame.header.opcode() });
            },
        };

        Ok(Some(event))
    }

    fn send(&self, payload: Payload) -> Vec<ConnectionAction> {
        if self.session.is_none() {
            debug!(opcode = ?payload.opcode(), "no session, dropping emit");
            return Vec::new();
        }

        match payload.into_frame() {
            Ok(frame) => vec![ConnectionAction::SendFrame(frame)],
            Err(error) => {
                warn!(%error, "failed to encode outbound event");
                Vec::new()
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use palaver_proto::{AuthToken, MessageId, Opcode, UserId};

    use super::*;

    fn alice() -> ViewerIdentity {
        ViewerIdentity::new("alice", AuthToken::new("t-alice"))
    }

    fn sent_payloads(actions: &[ConnectionAction]) -> Vec<Payload> {
        actions
            .iter()
            .filter_map(|action| match action {
                ConnectionAction::SendFrame(frame) => Some(Payload::from_frame(frame).unwrap()),
                _ => None,
            })
            .collect()
    }

    fn message(conversation: &str) -> Message {
        Message {
            id: MessageId::from("m1"),
            conversation: ConversationId::from(conversation),
            sender: UserId::from("bob"),
            content: "hello".to_string(),
            created_at: 0,
        }
    }

    #[test]
    fn start_opens_and_registers_presence() {
        let mut conn = ConnectionManager::new();

        let actions = conn.start(alice());

        assert_eq!(actions[0], ConnectionAction::Open { identity: alice() });
        assert_eq!(
            sent_payloads(&actions),
            vec![Payload::PresenceRegister(Presence { user_id: UserId::from("alice") })]
        );
        assert!(conn.is_open());
    }

    #[test]
    fn start_same_identity_is_noop() {
        let mut conn = ConnectionManager::new();
        conn.start(alice());

        assert!(conn.start(alice()).is_empty());
    }

    #[test]
    fn start_new_identity_replaces_session() {
        let mut conn = ConnectionManager::new();
        conn.start(alice());

        let bob = ViewerIdentity::new("bob", AuthToken::new("t-bob"));
        let actions = conn.start(bob.clone());

        assert!(matches!(actions[0], ConnectionAction::Close { .. }));
        assert_eq!(actions[1], ConnectionAction::Open { identity: bob.clone() });
        assert_eq!(conn.identity(), Some(&bob));
    }

    #[test]
    fn stop_is_idempotent() {
        let mut conn = ConnectionManager::new();
        assert!(conn.stop("teardown").is_empty());

        conn.start(alice());
        assert_eq!(conn.stop("teardown").len(), 1);
        assert!(conn.stop("teardown").is_empty());
        assert!(!conn.is_open());
    }

    #[test]
    fn emits_dropped_without_session() {
        let mut conn = ConnectionManager::new();
        let c1 = ConversationId::from("c1");

        assert!(conn.join_conversation(&c1).is_empty());
        assert!(conn.emit_typing(&c1).is_empty());
        assert!(conn.emit_stop_typing(&c1).is_empty());
        assert!(conn.emit_new_message(&message("c1")).is_empty());
    }

    #[test]
    fn emits_carry_matching_opcodes() {
        let mut conn = ConnectionManager::new();
        conn.start(alice());
        let c1 = ConversationId::from("c1");

        let mut actions = conn.join_conversation(&c1);
        actions.extend(conn.emit_typing(&c1));
        actions.extend(conn.emit_stop_typing(&c1));
        actions.extend(conn.emit_new_message(&message("c1")));

        let opcodes: Vec<_> = sent_payloads(&actions).iter().map(Payload::opcode).collect();
        assert_eq!(
            opcodes,
            vec![Opcode::JoinConversation, Opcode::Typing, Opcode::StopTyping, Opcode::NewMessage]
        );
    }

    #[test]
    fn handle_frame_decodes_server_events() {
        let mut conn = ConnectionManager::new();
        conn.start(alice());

        let frame = Payload::MessageReceived(message("c1")).into_frame().unwrap();
        let event = conn.handle_frame(&frame).unwrap();
        assert_eq!(event, Some(InboundEvent::MessageReceived(message("c1"))));

        let frame = Payload::Typing(ConversationScope::new(ConversationId::from("c1")))
            .into_frame()
            .unwrap();
        let event = conn.handle_frame(&frame).unwrap();
        assert_eq!(event, Some(InboundEvent::Typing { conversation: ConversationId::from("c1") }));
    }

    #[test]
    fn handle_frame_rejects_outbound_only_opcodes() {
        let mut conn = ConnectionManager::new();
        conn.start(alice());

        let frame = Payload::NewMessage(message("c1")).into_frame().unwrap();
        let result = conn.handle_frame(&frame);

        assert_eq!(
            result,
            Err(ConnectionError::UnexpectedFrame { opcode: Opcode::NewMessage.to_u16() })
        );
    }

    #[test]
    fn handle_frame_without_session_discards() {
        let conn = ConnectionManager::new();

        let frame = Payload::MessageReceived(message("c1")).into_frame().unwrap();
        assert_eq!(conn.handle_frame(&frame), Ok(None));
    }

    #[test]
    fn restore_rejoins_last_conversation() {
        let mut conn = ConnectionManager::new();
        conn.start(alice());
        conn.join_conversation(&ConversationId::from("c1"));
        conn.join_conversation(&ConversationId::from("c2"));

        let actions = conn.restore();

        assert_eq!(
            sent_payloads(&actions),
            vec![
                Payload::PresenceRegister(Presence { user_id: UserId::from("alice") }),
                Payload::JoinConversation(ConversationScope::new(ConversationId::from("c2"))),
            ]
        );
    }

    #[test]
    fn restore_after_leave_sends_presence_only() {
        let mut conn = ConnectionManager::new();
        conn.start(alice());
        conn.join_conversation(&ConversationId::from("c1"));

        conn.leave();
        let actions = conn.restore();

        assert_eq!(
            sent_payloads(&actions),
            vec![Payload::PresenceRegister(Presence { user_id: UserId::from("alice") })]
        );
    }

    #[test]
    fn restore_without_session_is_noop() {
        let conn = ConnectionManager::new();
        assert!(conn.restore().is_empty());
    }
}
