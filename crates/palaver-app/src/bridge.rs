//! Client-to-Application translation layer.
//!
//! The [`Bridge`] wraps the synchronization [`palaver_client::Client`] and
//! adapts it to the application lifecycle.
//!
//! # Responsibilities
//!
//! - Converts [`crate::AppAction`]s into client events.
//! - Accumulates [`Outgoing`] I/O (push frames, collaborator requests,
//!   transport control) for the driver to perform in the next cycle.
//! - Converts client outcomes back into [`crate::AppEvent`]s. Every batch
//!   ends with a fresh [`SyncSnapshot`] so the view never lags the core.
//! - Forwards time ticks generically to support both real-time execution and
//!   deterministic simulation.

use std::time::Duration;

use palaver_client::{
    Client, ClientAction, ClientConfig, ClientError, ClientEvent, Completion, Environment, Request,
};
use palaver_proto::{Frame, ViewerIdentity};
use tracing::debug;

use crate::{AppAction, AppEvent, SyncSnapshot};

/// I/O the driver must perform on behalf of the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    /// Connect the push transport.
    Open {
        /// Identity to authenticate as.
        identity: ViewerIdentity,
    },
    /// Send a frame on the push channel.
    Frame(Frame),
    /// Perform a collaborator request.
    Request(Request),
    /// Disconnect the push transport.
    Close {
        /// Reason for closing.
        reason: String,
    },
    /// Refresh conversation ordering and unread state.
    RefreshConversations,
}

/// Bridge between App and Client logic.
///
/// Generic over Environment to support both production and simulation.
/// The Instant type is determined by the Environment's associated type.
pub struct Bridge<E: Environment> {
    client: Client<E>,
    outgoing: Vec<Outgoing>,
}

impl<E: Environment> Bridge<E> {
    /// Create a new Bridge with the given environment and configuration.
    pub fn new(env: E, config: ClientConfig) -> Self {
        Self { client: Client::new(env, config), outgoing: Vec::new() }
    }

    /// The wrapped client.
    pub fn client(&self) -> &Client<E> {
        &self.client
    }

    /// Current view of the client.
    pub fn snapshot(&self) -> SyncSnapshot {
        SyncSnapshot::capture(&self.client)
    }

    /// Process an App action and return resulting App events.
    pub fn process_app_action(&mut self, action: AppAction) -> Vec<AppEvent> {
        let event = match action {
            AppAction::SignIn { identity } => ClientEvent::Start { identity },
            AppAction::SignOut => ClientEvent::Stop,
            AppAction::Select { conversation } => ClientEvent::SelectConversation { conversation },
            AppAction::Keystroke => ClientEvent::DraftChanged,
            AppAction::Send { content } => ClientEvent::SendMessage { content },
            AppAction::DeleteActive => ClientEvent::DeleteConversation,
            AppAction::Render | AppAction::Quit => return Vec::new(),
        };
        self.dispatch(event)
    }

    /// Handle a frame from the push channel.
    pub fn handle_frame(&mut self, frame: Frame) -> Vec<AppEvent> {
        self.dispatch(ClientEvent::FrameReceived(frame))
    }

    /// Handle a finished collaborator request.
    pub fn handle_completion(&mut self, completion: Completion) -> Vec<AppEvent> {
        self.dispatch(ClientEvent::RequestCompleted(completion))
    }

    /// The push transport came back on its own.
    pub fn handle_transport_restored(&mut self) -> Vec<AppEvent> {
        let mut events = self.dispatch(ClientEvent::TransportRestored);
        events.insert(0, AppEvent::Connectivity { online: true });
        events
    }

    /// Process a time tick.
    pub fn handle_tick(&mut self, now: E::Instant) -> Vec<AppEvent> {
        self.dispatch(ClientEvent::Tick { now })
    }

    /// End the session. Called on teardown.
    pub fn shutdown(&mut self) {
        if self.client.identity().is_none() {
            return;
        }
        // Teardown has no view left to update
        let _ = self.dispatch(ClientEvent::Stop);
    }

    /// How long until the next tick has work to do.
    pub fn next_timeout(&self, now: E::Instant) -> Option<Duration> {
        self.client.next_timeout(now)
    }

    /// Take pending outgoing I/O.
    pub fn take_outgoing(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.outgoing)
    }

    fn dispatch(&mut self, event: ClientEvent<E::Instant>) -> Vec<AppEvent> {
        let result = self.client.handle(event);
        let mut events = self.handle_client_result(result);
        events.push(AppEvent::Synced(self.snapshot()));
        events
    }

    fn handle_client_result(
        &mut self,
        result: Result<Vec<ClientAction>, ClientError>,
    ) -> Vec<AppEvent> {
        match result {
            Ok(actions) => self.process_client_actions(actions),
            Err(e) => vec![AppEvent::Error { message: e.to_string() }],
        }
    }

    fn process_client_actions(&mut self, actions: Vec<ClientAction>) -> Vec<AppEvent> {
        let mut events = Vec::new();

        for action in actions {
            match action {
                ClientAction::Open { identity } => {
                    self.outgoing.push(Outgoing::Open { identity });
                },
                ClientAction::Send(frame) => {
                    self.outgoing.push(Outgoing::Frame(frame));
                },
                ClientAction::Close { reason } => {
                    self.outgoing.push(Outgoing::Close { reason });
                },
                ClientAction::Request(request) => {
                    debug!(id = %request.id, "request queued");
                    self.outgoing.push(Outgoing::Request(request));
                },
                ClientAction::RefreshConversations => {
                    if !self.outgoing.contains(&Outgoing::RefreshConversations) {
                        self.outgoing.push(Outgoing::RefreshConversations);
                    }
                },
                ClientAction::MessageSent { conversation, .. } => {
                    events.push(AppEvent::MessageSent { conversation });
                },
                ClientAction::ConversationDeleted { conversation } => {
                    events.push(AppEvent::ConversationDeleted { conversation });
                },
                ClientAction::Failed(failure) => {
                    events.push(AppEvent::Error { message: failure.to_string() });
                },
            }
        }

        events
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use palaver_client::{RequestKind, Response};
    use palaver_core::env::test_utils::MockEnv;
    use palaver_proto::{AuthToken, ConversationId, Message, MessageId, Payload, UserId};

    use super::*;

    fn signed_in() -> Bridge<MockEnv> {
        let mut bridge = Bridge::new(MockEnv::new(), ClientConfig::default());
        let identity = ViewerIdentity::new("alice", AuthToken::new("token"));
        bridge.process_app_action(AppAction::SignIn { identity });
        bridge
    }

    fn requests(outgoing: &[Outgoing]) -> Vec<Request> {
        outgoing
            .iter()
            .filter_map(|o| match o {
                Outgoing::Request(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn sign_in_opens_transport_and_registers_presence() {
        let mut bridge = signed_in();
        let outgoing = bridge.take_outgoing();

        assert!(matches!(outgoing[0], Outgoing::Open { .. }));
        assert!(matches!(outgoing[1], Outgoing::Frame(_)));
    }

    #[test]
    fn every_batch_ends_with_snapshot() {
        let mut bridge = signed_in();
        let events = bridge.process_app_action(AppAction::Select {
            conversation: Some(ConversationId::from("c1")),
        });

        assert!(matches!(events.last(), Some(AppEvent::Synced(_))));
        let snapshot = bridge.snapshot();
        assert_eq!(snapshot.active, Some(ConversationId::from("c1")));
        assert!(snapshot.loading);
    }

    #[test]
    fn render_and_quit_do_not_reach_client() {
        let mut bridge = signed_in();
        bridge.take_outgoing();

        assert!(bridge.process_app_action(AppAction::Render).is_empty());
        assert!(bridge.process_app_action(AppAction::Quit).is_empty());
        assert!(bridge.take_outgoing().is_empty());
    }

    #[test]
    fn select_while_signed_out_reports_error() {
        let mut bridge = Bridge::new(MockEnv::new(), ClientConfig::default());
        let events = bridge.process_app_action(AppAction::Select {
            conversation: Some(ConversationId::from("c1")),
        });

        assert!(events.iter().any(|e| matches!(e, AppEvent::Error { .. })));
    }

    #[test]
    fn persisted_send_produces_message_sent() {
        let mut bridge = signed_in();
        bridge.process_app_action(AppAction::Select {
            conversation: Some(ConversationId::from("c1")),
        });
        let fetch = requests(&bridge.take_outgoing()).remove(0);
        bridge.handle_completion(Completion::ok(fetch.id, Response::History(Vec::new())));

        bridge.process_app_action(AppAction::Send { content: "  hi  ".into() });
        let create = requests(&bridge.take_outgoing()).remove(0);
        assert!(matches!(
            &create.kind,
            RequestKind::CreateMessage { content, .. } if content == "hi"
        ));

        let message = Message {
            id: MessageId::from("m1"),
            conversation: ConversationId::from("c1"),
            sender: UserId::from("alice"),
            content: "hi".into(),
            created_at: 0,
        };
        let events =
            bridge.handle_completion(Completion::ok(create.id, Response::Created(message)));

        assert!(events.iter().any(|e| matches!(e, AppEvent::MessageSent { .. })));
        assert_eq!(bridge.snapshot().messages.len(), 1);
    }

    #[test]
    fn refresh_is_coalesced_per_cycle() {
        let mut bridge = signed_in();
        bridge.take_outgoing();

        for id in ["m1", "m2", "m3"] {
            let message = Message {
                id: MessageId::from(id),
                conversation: ConversationId::from("c9"),
                sender: UserId::from("bob"),
                content: String::new(),
                created_at: 0,
            };
            let frame = Payload::MessageReceived(message).into_frame().unwrap();
            bridge.handle_frame(frame);
        }

        let outgoing = bridge.take_outgoing();
        assert_eq!(outgoing, vec![Outgoing::RefreshConversations]);
        assert_eq!(bridge.snapshot().pending.len(), 3);
    }

    #[test]
    fn shutdown_closes_once() {
        let mut bridge = signed_in();
        bridge.take_outgoing();

        bridge.shutdown();
        assert!(matches!(bridge.take_outgoing().as_slice(), [Outgoing::Close { .. }]));

        bridge.shutdown();
        assert!(bridge.take_outgoing().is_empty());
    }
}
