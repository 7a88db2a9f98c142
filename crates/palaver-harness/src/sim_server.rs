//! In-memory chat backend for simulation.
//!
//! `SimServer` plays every collaborator the client talks to: the message
//! store behind history/create/delete requests, and the push channel that
//! relays typing and new-message events between participants.
//!
//! # Routing
//!
//! - `MessageReceived` goes to every participant of the conversation except
//!   the sender, whether or not they have it open. Viewers need it for
//!   notifications.
//! - `Typing`/`StopTyping` go only to participants currently joined to the
//!   conversation.
//! - Nothing is queued for a viewer whose push session is down. Missed events
//!   are gone for good.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, VecDeque},
    sync::{Arc, Mutex, PoisonError},
};

use palaver_client::{Request, RequestKind, Response, SyncError};
use palaver_proto::{
    AuthToken, ConversationId, Frame, Message, MessageId, Payload, UserId, ViewerIdentity,
    payloads::chat::ConversationScope,
};
use tracing::{debug, warn};

/// Base for server-assigned timestamps (Unix millis).
const EPOCH_MILLIS: u64 = 1_700_000_000_000;

/// Request class for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestClass {
    /// History fetches.
    History,
    /// Message creation.
    Create,
    /// Conversation deletion.
    Delete,
}

impl RequestClass {
    fn of(kind: &RequestKind) -> Self {
        match kind {
            RequestKind::FetchHistory { .. } => Self::History,
            RequestKind::CreateMessage { .. } => Self::Create,
            RequestKind::DeleteConversation { .. } => Self::Delete,
        }
    }
}

#[derive(Debug, Default)]
struct Conversation {
    participants: BTreeSet<UserId>,
    messages: Vec<Message>,
}

#[derive(Debug, Default)]
struct Session {
    registered: bool,
    joined: Option<ConversationId>,
    inbox: VecDeque<Frame>,
}

/// Simulated chat backend.
#[derive(Debug, Default)]
pub struct SimServer {
    tokens: HashMap<String, UserId>,
    conversations: BTreeMap<ConversationId, Conversation>,
    sessions: HashMap<UserId, Session>,
    failures: HashMap<RequestClass, VecDeque<SyncError>>,
    received: Vec<(UserId, Payload)>,
    next_message: u64,
}

/// Server shared between drivers and the test body.
pub type SharedSimServer = Arc<Mutex<SimServer>>;

/// Wrap `server` for sharing.
pub fn create_shared_server(server: SimServer) -> SharedSimServer {
    Arc::new(Mutex::new(server))
}

/// Lock a shared server, ignoring poisoning from a failed test thread.
pub fn lock(server: &SharedSimServer) -> std::sync::MutexGuard<'_, SimServer> {
    server.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SimServer {
    /// Empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user and return credentials that authenticate as them.
    pub fn register_user(&mut self, user: impl Into<UserId>, token: &str) -> ViewerIdentity {
        let user = user.into();
        self.tokens.insert(token.to_string(), user.clone());
        ViewerIdentity::new(user, AuthToken::new(token))
    }

    /// Create a conversation among `participants`.
    pub fn create_conversation<U: Into<UserId>>(
        &mut self,
        conversation: impl Into<ConversationId>,
        participants: impl IntoIterator<Item = U>,
    ) {
        let participants = participants.into_iter().map(Into::into).collect();
        self.conversations
            .insert(conversation.into(), Conversation { participants, messages: Vec::new() });
    }

    /// Persist a message without pushing it anywhere.
    ///
    /// Returns `None` if the conversation does not exist.
    pub fn seed(
        &mut self,
        conversation: &ConversationId,
        sender: &UserId,
        content: &str,
    ) -> Option<Message> {
        let message = self.mint(conversation, sender, content);
        let stored = self.conversations.get_mut(conversation)?;
        stored.messages.push(message.clone());
        Some(message)
    }

    /// A participant posts from outside the simulated viewers: persist and
    /// fan out.
    ///
    /// Returns `None` if the conversation does not exist.
    pub fn post(
        &mut self,
        conversation: &ConversationId,
        sender: &UserId,
        content: &str,
    ) -> Option<Message> {
        let message = self.seed(conversation, sender, content)?;
        self.fan_out(&message);
        Some(message)
    }

    /// A participant outside the simulated viewers starts or stops typing.
    pub fn remote_typing(&mut self, conversation: &ConversationId, from: &UserId, typing: bool) {
        let scope = ConversationScope::new(conversation.clone());
        let payload = if typing { Payload::Typing(scope) } else { Payload::StopTyping(scope) };
        self.relay_typing(conversation, from, payload);
    }

    /// Make the next request of `class` fail with `error`.
    pub fn fail_next(&mut self, class: RequestClass, error: SyncError) {
        self.failures.entry(class).or_default().push_back(error);
    }

    /// Serve a collaborator request.
    pub fn handle_request(&mut self, request: &Request) -> Result<Response, SyncError> {
        if let Some(error) =
            self.failures.get_mut(&RequestClass::of(&request.kind)).and_then(VecDeque::pop_front)
        {
            debug!(id = %request.id, %error, "injected failure");
            return Err(error);
        }

        let user = self
            .tokens
            .get(request.credential.expose())
            .cloned()
            .ok_or_else(|| SyncError::Auth("invalid credential".into()))?;

        match &request.kind {
            RequestKind::FetchHistory { conversation } => {
                let stored = self.participant_of(conversation, &user)?;
                Ok(Response::History(stored.messages.clone()))
            },
            RequestKind::CreateMessage { conversation, content } => {
                if content.trim().is_empty() {
                    return Err(SyncError::Validation("empty message".into()));
                }
                self.participant_of(conversation, &user)?;
                let message = self
                    .seed(conversation, &user, content)
                    .ok_or_else(|| SyncError::Validation("unknown conversation".into()))?;
                Ok(Response::Created(message))
            },
            RequestKind::DeleteConversation { conversation } => {
                self.participant_of(conversation, &user)?;
                self.conversations.remove(conversation);
                for session in self.sessions.values_mut() {
                    if session.joined.as_ref() == Some(conversation) {
                        session.joined = None;
                    }
                }
                Ok(Response::Deleted)
            },
        }
    }

    /// A viewer's push transport connected.
    pub fn connect(&mut self, user: &UserId) {
        self.sessions.insert(user.clone(), Session::default());
    }

    /// A viewer's push transport dropped. Undelivered frames are lost.
    pub fn disconnect(&mut self, user: &UserId) {
        self.sessions.remove(user);
    }

    /// Connect and register a participant that only observes its inbox.
    pub fn connect_observer(&mut self, user: &UserId) {
        self.sessions.insert(user.clone(), Session { registered: true, ..Default::default() });
    }

    /// Handle a frame a viewer sent on the push channel.
    pub fn receive_frame(&mut self, from: &UserId, frame: &Frame) {
        let payload = match Payload::from_frame(frame) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(%from, %error, "undecodable frame dropped");
                return;
            },
        };
        self.received.push((from.clone(), payload.clone()));

        let Some(session) = self.sessions.get_mut(from) else {
            warn!(%from, "frame from disconnected viewer dropped");
            return;
        };

        match payload {
            Payload::PresenceRegister(presence) => {
                if &presence.user_id == from {
                    session.registered = true;
                } else {
                    warn!(%from, claimed = %presence.user_id, "presence for another user ignored");
                }
            },
            Payload::JoinConversation(scope) => {
                session.joined = Some(scope.conversation);
            },
            Payload::Typing(ref scope) | Payload::StopTyping(ref scope) => {
                let conversation = scope.conversation.clone();
                self.relay_typing(&conversation, from, payload);
            },
            Payload::NewMessage(message) => {
                if &message.sender == from {
                    self.fan_out(&message);
                } else {
                    warn!(%from, sender = %message.sender, "relay for another sender ignored");
                }
            },
            Payload::MessageReceived(_) => {
                warn!(%from, "server-only event sent by viewer");
            },
        }
    }

    /// Next frame queued for `user`.
    pub fn take_frame(&mut self, user: &UserId) -> Option<Frame> {
        self.sessions.get_mut(user)?.inbox.pop_front()
    }

    /// Drain every frame queued for `user`.
    pub fn drain_frames(&mut self, user: &UserId) -> Vec<Frame> {
        self.sessions.get_mut(user).map(|s| s.inbox.drain(..).collect()).unwrap_or_default()
    }

    /// Whether `user` has frames waiting.
    pub fn has_frames(&self, user: &UserId) -> bool {
        self.sessions.get(user).is_some_and(|s| !s.inbox.is_empty())
    }

    /// Whether `user` has announced presence on a live session.
    pub fn is_registered(&self, user: &UserId) -> bool {
        self.sessions.get(user).is_some_and(|s| s.registered)
    }

    /// Conversation `user` is joined to.
    pub fn joined(&self, user: &UserId) -> Option<&ConversationId> {
        self.sessions.get(user)?.joined.as_ref()
    }

    /// Persisted messages of `conversation`.
    pub fn messages(&self, conversation: &ConversationId) -> &[Message] {
        self.conversations.get(conversation).map_or(&[], |c| c.messages.as_slice())
    }

    /// Whether `conversation` exists.
    pub fn has_conversation(&self, conversation: &ConversationId) -> bool {
        self.conversations.contains_key(conversation)
    }

    /// Every payload viewers have sent, in arrival order.
    pub fn received(&self) -> &[(UserId, Payload)] {
        &self.received
    }

    fn mint(&mut self, conversation: &ConversationId, sender: &UserId, content: &str) -> Message {
        self.next_message += 1;
        Message {
            id: MessageId::new(format!("m{}", self.next_message)),
            conversation: conversation.clone(),
            sender: sender.clone(),
            content: content.to_string(),
            created_at: EPOCH_MILLIS + self.next_message * 1000,
        }
    }

    fn participant_of(
        &self,
        conversation: &ConversationId,
        user: &UserId,
    ) -> Result<&Conversation, SyncError> {
        let stored = self
            .conversations
            .get(conversation)
            .ok_or_else(|| SyncError::Validation(format!("unknown conversation {conversation}")))?;
        if !stored.participants.contains(user) {
            return Err(SyncError::Auth(format!("{user} is not in {conversation}")));
        }
        Ok(stored)
    }

    fn fan_out(&mut self, message: &Message) {
        let Some(stored) = self.conversations.get(&message.conversation) else {
            return;
        };
        let Ok(frame) = Payload::MessageReceived(message.clone()).into_frame() else {
            warn!(id = %message.id, "message too large to relay");
            return;
        };

        for participant in &stored.participants {
            if participant == &message.sender {
                continue;
            }
            if let Some(session) = self.sessions.get_mut(participant)
                && session.registered
            {
                session.inbox.push_back(frame.clone());
            }
        }
    }

    fn relay_typing(&mut self, conversation: &ConversationId, from: &UserId, payload: Payload) {
        let Some(stored) = self.conversations.get(conversation) else {
            return;
        };
        let Ok(frame) = payload.into_frame() else {
            return;
        };

        for participant in &stored.participants {
            if participant == from {
                continue;
            }
            if let Some(session) = self.sessions.get_mut(participant)
                && session.registered
                && session.joined.as_ref() == Some(conversation)
            {
                session.inbox.push_back(frame.clone());
            }
        }
    }
}
