//! Client state machine.
//!
//! Composes the push session, message store, typing coordinator and
//! notification deduper around one active-conversation selection. Every
//! handler runs to completion and returns actions; collaborator calls leave
//! as [`Request`]s and come back as [`Completion`]s.

use std::collections::{BTreeMap, HashMap};

use palaver_core::{
    connection::{ConnectionAction, ConnectionManager, InboundEvent},
    env::Environment,
    error::SyncError,
};
use palaver_proto::{AuthToken, ConversationId, Frame, Message, ViewerIdentity};
use tracing::{debug, info, warn};

use crate::{
    config::ClientConfig,
    error::ClientError,
    event::{
        ClientAction, ClientEvent, Completion, Failure, FailureKind, Request, RequestId,
        RequestKind, Response,
    },
    notify::{NotificationDeduper, PendingNotification, Routed},
    store::{AppendOutcome, MessageStore},
    typing::{TypingCoordinator, TypingSignal},
};

/// What an outstanding request was for.
#[derive(Debug, Clone)]
enum Pending {
    History { conversation: ConversationId },
    Create { conversation: ConversationId },
    Delete { conversation: ConversationId },
}

/// Synchronization core for one viewer.
///
/// # Invariants
///
/// - The store's conversation is the active conversation.
/// - Typing and remote-typing state refer to the active conversation only.
/// - Nothing pending in the deduper belongs to the active conversation.
pub struct Client<E: Environment> {
    env: E,
    config: ClientConfig,
    connection: ConnectionManager,
    store: MessageStore,
    typing: TypingCoordinator<E::Instant>,
    notifications: NotificationDeduper,
    requests: HashMap<RequestId, Pending>,
    next_request: u64,
}

impl<E: Environment> Client<E> {
    /// Create a stopped client.
    pub fn new(env: E, config: ClientConfig) -> Self {
        let typing = TypingCoordinator::new(config.typing_timeout);
        Self {
            env,
            config,
            connection: ConnectionManager::new(),
            store: MessageStore::new(),
            typing,
            notifications: NotificationDeduper::new(),
            requests: HashMap::new(),
            next_request: 1,
        }
    }

    /// Client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Identity of the open session.
    pub fn identity(&self) -> Option<&ViewerIdentity> {
        self.connection.identity()
    }

    /// Whether a push session is open.
    pub fn is_connected(&self) -> bool {
        self.connection.is_open()
    }

    /// The active conversation.
    pub fn active_conversation(&self) -> Option<&ConversationId> {
        self.store.conversation()
    }

    /// Visible log for the active conversation.
    pub fn messages(&self) -> &[Message] {
        self.store.messages()
    }

    /// Whether the active conversation's history is being fetched.
    pub fn is_loading(&self) -> bool {
        self.store.is_loading()
    }

    /// Whether the viewer is typing.
    pub fn is_local_typing(&self) -> bool {
        self.typing.is_local_typing()
    }

    /// Whether a participant is typing in the active conversation.
    pub fn is_remote_typing(&self) -> bool {
        self.typing.is_remote_typing()
    }

    /// Pending notifications, newest first.
    pub fn pending_notifications(&self) -> impl Iterator<Item = &PendingNotification> {
        self.notifications.pending()
    }

    /// Pending notification count per conversation.
    pub fn unread_counts(&self) -> BTreeMap<ConversationId, usize> {
        self.notifications.unread_counts()
    }

    /// Number of requests awaiting completion.
    pub fn outstanding_requests(&self) -> usize {
        self.requests.len()
    }

    /// Time until the next deadline (typing debounce). `None` if nothing is
    /// armed.
    pub fn next_timeout(&self, now: E::Instant) -> Option<std::time::Duration> {
        self.typing.remaining(now)
    }

    /// Process an event and return resulting actions.
    pub fn handle(
        &mut self,
        event: ClientEvent<E::Instant>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        match event {
            ClientEvent::Start { identity } => Ok(self.handle_start(identity)),
            ClientEvent::Stop => Ok(self.handle_stop()),
            ClientEvent::SelectConversation { conversation } => self.handle_select(conversation),
            ClientEvent::ReloadHistory => self.handle_reload(),
            ClientEvent::DraftChanged => Ok(self.handle_draft_changed()),
            ClientEvent::SendMessage { content } => self.handle_send(&content),
            ClientEvent::DeleteConversation => self.handle_delete(),
            ClientEvent::FrameReceived(frame) => self.handle_frame(&frame),
            ClientEvent::RequestCompleted(completion) => self.handle_completion(completion),
            ClientEvent::TransportRestored => Ok(self.handle_restored()),
            ClientEvent::Tick { now } => Ok(self.handle_tick(now)),
        }
    }

    fn handle_start(&mut self, identity: ViewerIdentity) -> Vec<ClientAction> {
        if self.identity().is_some_and(|current| current != &identity) {
            // Conversation state belongs to the previous viewer
            self.reset_view();
        }

        convert(self.connection.start(identity))
    }

    fn handle_stop(&mut self) -> Vec<ClientAction> {
        self.reset_view();
        convert(self.connection.stop("viewer signed out"))
    }

    fn handle_select(
        &mut self,
        conversation: Option<ConversationId>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        info!(from = ?self.store.conversation(), to = ?conversation, "selecting conversation");
        let Some(conversation) = conversation else {
            return Ok(self.deselect());
        };
        let credential = self.credential()?;

        let mut actions = self.deselect();
        self.store.select(Some(conversation.clone()));

        if self.notifications.clear_for_conversation(&conversation) > 0 {
            actions.push(ClientAction::RefreshConversations);
        }
        actions.push(self.fetch_history(conversation, credential));

        Ok(actions)
    }

    fn handle_reload(&mut self) -> Result<Vec<ClientAction>, ClientError> {
        let credential = self.credential()?;
        let Some(conversation) = self.store.conversation().cloned() else {
            debug!("reload without a selection");
            return Ok(Vec::new());
        };

        Ok(vec![self.fetch_history(conversation, credential)])
    }

    fn handle_draft_changed(&mut self) -> Vec<ClientAction> {
        let Some(conversation) = self.store.conversation().cloned() else {
            return Vec::new();
        };

        let now = self.env.now();
        let signals = self.typing.keystroke(&conversation, now);
        signals.into_iter().flat_map(|signal| self.signal(signal)).collect()
    }

    fn handle_send(&mut self, content: &str) -> Result<Vec<ClientAction>, ClientError> {
        let content = content.trim();
        if content.is_empty() {
            debug!("ignoring empty send");
            return Ok(Vec::new());
        }
        if content.chars().count() > self.config.max_content_len {
            debug!(max = self.config.max_content_len, "ignoring oversized send");
            return Ok(Vec::new());
        }
        let Some(conversation) = self.store.conversation().cloned() else {
            debug!("ignoring send without a selection");
            return Ok(Vec::new());
        };
        let credential = self.credential()?;

        let mut actions = Vec::new();
        if let Some(signal) = self.typing.force_idle() {
            actions.extend(self.signal(signal));
        }

        let kind = RequestKind::CreateMessage {
            conversation: conversation.clone(),
            content: content.to_string(),
        };
        let request = self.request(Pending::Create { conversation }, credential, kind);
        actions.push(ClientAction::Request(request));

        Ok(actions)
    }

    fn handle_delete(&mut self) -> Result<Vec<ClientAction>, ClientError> {
        let Some(conversation) = self.store.conversation().cloned() else {
            debug!("ignoring delete without a selection");
            return Ok(Vec::new());
        };
        let credential = self.credential()?;

        let kind = RequestKind::DeleteConversation { conversation: conversation.clone() };
        let request = self.request(Pending::Delete { conversation }, credential, kind);
        Ok(vec![ClientAction::Request(request)])
    }

    fn handle_frame(&mut self, frame: &Frame) -> Result<Vec<ClientAction>, ClientError> {
        let Some(event) = self.connection.handle_frame(frame)? else {
            return Ok(Vec::new());
        };

        let active = self.store.conversation();
        match event {
            InboundEvent::Typing { conversation } => {
                if active == Some(&conversation) {
                    self.typing.remote_started();
                }
                Ok(Vec::new())
            },
            InboundEvent::StopTyping { conversation } => {
                if active == Some(&conversation) {
                    self.typing.remote_stopped();
                }
                Ok(Vec::new())
            },
            InboundEvent::MessageReceived(message) => {
                match self.notifications.route(message, active) {
                    Routed::Active(message) => {
                        if self.store.append_incoming(message) == AppendOutcome::Duplicate {
                            debug!("live message already in log");
                        }
                        Ok(Vec::new())
                    },
                    Routed::Queued => Ok(vec![ClientAction::RefreshConversations]),
                    Routed::Duplicate => Ok(Vec::new()),
                }
            },
        }
    }

    fn handle_completion(
        &mut self,
        completion: Completion,
    ) -> Result<Vec<ClientAction>, ClientError> {
        let Completion { id, outcome } = completion;
        let Some(pending) = self.requests.remove(&id) else {
            debug!(%id, "completion for unknown request");
            return Ok(Vec::new());
        };

        match (pending, outcome) {
            (Pending::History { conversation }, Ok(Response::History(history))) => {
                if !self.store.finish_load(id, history) {
                    return Ok(Vec::new());
                }
                info!(%conversation, len = self.store.messages().len(), "history loaded");
                Ok(convert(self.connection.join_conversation(&conversation)))
            },
            (Pending::History { conversation }, Err(error)) => {
                if !self.store.fail_load(id) {
                    return Ok(Vec::new());
                }
                warn!(%conversation, %error, "history fetch failed");
                Ok(vec![failed(FailureKind::HistoryUnavailable, error)])
            },
            (Pending::Create { conversation }, Ok(Response::Created(message))) => {
                let mut actions = convert(self.connection.emit_new_message(&message));
                let message_id = message.id.clone();

                // Still fanned out after a switch; only appended where visible
                if self.store.conversation() == Some(&conversation) {
                    self.store.append_incoming(message);
                }

                actions.push(ClientAction::MessageSent { conversation, message_id });
                Ok(actions)
            },
            (Pending::Create { conversation }, Err(error)) => {
                warn!(%conversation, %error, "send failed");
                Ok(vec![failed(FailureKind::SendFailed, error)])
            },
            (Pending::Delete { conversation }, Ok(Response::Deleted)) => {
                info!(%conversation, "conversation deleted");
                let mut actions = Vec::new();

                if self.store.conversation() == Some(&conversation) {
                    actions.extend(self.deselect());
                }
                self.notifications.clear_for_conversation(&conversation);

                actions.push(ClientAction::ConversationDeleted { conversation });
                actions.push(ClientAction::RefreshConversations);
                Ok(actions)
            },
            (Pending::Delete { conversation }, Err(error)) => {
                warn!(%conversation, %error, "delete failed");
                Ok(vec![failed(FailureKind::DeleteFailed, error)])
            },
            (pending, Ok(response)) => {
                warn!(%id, ?pending, ?response, "response does not match request");
                if let Pending::History { .. } = pending {
                    self.store.fail_load(id);
                }
                Err(ClientError::MismatchedResponse { id })
            },
        }
    }

    fn handle_restored(&mut self) -> Vec<ClientAction> {
        convert(self.connection.restore())
    }

    fn handle_tick(&mut self, now: E::Instant) -> Vec<ClientAction> {
        match self.typing.tick(now) {
            Some(signal) => self.signal(signal),
            None => Vec::new(),
        }
    }

    fn credential(&self) -> Result<AuthToken, ClientError> {
        self.connection
            .identity()
            .map(|identity| identity.token.clone())
            .ok_or(ClientError::NotStarted)
    }

    fn fetch_history(
        &mut self,
        conversation: ConversationId,
        credential: AuthToken,
    ) -> ClientAction {
        let kind = RequestKind::FetchHistory { conversation: conversation.clone() };
        let request = self.request(Pending::History { conversation }, credential, kind);
        self.store.begin_load(request.id);
        ClientAction::Request(request)
    }

    fn request(&mut self, pending: Pending, credential: AuthToken, kind: RequestKind) -> Request {
        let id = RequestId::new(self.next_request);
        self.next_request += 1;

        debug!(%id, ?kind, "issuing request");
        self.requests.insert(id, pending);
        Request { id, credential, kind }
    }

    fn signal(&self, signal: TypingSignal) -> Vec<ClientAction> {
        let actions = match signal {
            TypingSignal::Start(conversation) => self.connection.emit_typing(&conversation),
            TypingSignal::Stop(conversation) => self.connection.emit_stop_typing(&conversation),
        };
        convert(actions)
    }

    /// Clear the active conversation, stopping any typing signal on it.
    fn deselect(&mut self) -> Vec<ClientAction> {
        let actions = match self.typing.reset() {
            Some(signal) => self.signal(signal),
            None => Vec::new(),
        };
        self.store.select(None);
        self.connection.leave();
        actions
    }

    fn reset_view(&mut self) {
        // Cancels the debounce without a stop signal: the session is going away
        self.typing.reset();
        self.store.select(None);
        self.notifications.clear();
        self.requests.clear();
    }
}

fn convert(actions: Vec<ConnectionAction>) -> Vec<ClientAction> {
    actions.into_iter().map(ClientAction::from).collect()
}

fn failed(kind: FailureKind, error: SyncError) -> ClientAction {
    ClientAction::Failed(Failure { kind, error })
}
