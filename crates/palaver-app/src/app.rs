//! Application state machine.
//!
//! This module defines the [`App`] state machine, which holds the UI-facing
//! state completely decoupled from I/O and protocol mechanics.
//!
//! This is a pure state machine: it consumes [`crate::AppEvent`] inputs and
//! viewer commands, and produces [`crate::AppAction`] instructions for the
//! runtime to execute.
//!
//! # Responsibilities
//!
//! - Mirrors the synchronization core through the latest [`SyncSnapshot`].
//! - Owns the draft text. The draft survives failed sends and is cleared only
//!   once the client reports the message persisted.
//! - Tracks a transient, dismissible notice.

use palaver_proto::{ConversationId, ViewerIdentity};

use crate::{AppAction, AppEvent, Notice, SyncSnapshot, UserInput};

const RECONNECTING: &str = "connection lost, reconnecting";

/// Application state machine.
///
/// Pure state machine that processes events and produces actions.
/// No I/O dependencies - fully testable in simulation.
#[derive(Debug, Clone)]
pub struct App {
    /// Latest view of the synchronization core.
    snapshot: SyncSnapshot,
    /// Text being composed.
    draft: String,
    /// Transient banner. `None` if nothing to show.
    notice: Option<Notice>,
    /// Whether the push transport is up.
    online: bool,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// Create a signed-out App.
    pub fn new() -> Self {
        Self { snapshot: SyncSnapshot::default(), draft: String::new(), notice: None, online: true }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Synced(snapshot) => {
                self.snapshot = snapshot;
            },
            AppEvent::MessageSent { .. } => self.draft.clear(),
            AppEvent::ConversationDeleted { conversation } => {
                self.notice = Some(Notice::Info(format!("conversation {conversation} deleted")));
            },
            AppEvent::Connectivity { online } => {
                self.online = online;
                if !online {
                    self.notice = Some(Notice::Info(RECONNECTING.to_string()));
                } else if self.notice.as_ref().is_some_and(|n| n.text() == RECONNECTING) {
                    self.notice = None;
                }
            },
            AppEvent::Error { message } => {
                self.notice = Some(Notice::Error(message));
            },
        }
        vec![AppAction::Render]
    }

    /// Dispatch a viewer input to the matching command.
    pub fn handle_input(&mut self, input: UserInput) -> Vec<AppAction> {
        match input {
            UserInput::SignIn(identity) => self.sign_in(identity),
            UserInput::SignOut => self.sign_out(),
            UserInput::Select(conversation) => self.select_conversation(conversation),
            UserInput::EditDraft(text) => self.update_draft(text),
            UserInput::Submit => self.submit(),
            UserInput::DeleteActive => self.delete_active(),
            UserInput::DismissNotice => self.dismiss_notice(),
            UserInput::Quit => self.quit(),
        }
    }

    /// Start a session for `identity`.
    pub fn sign_in(&self, identity: ViewerIdentity) -> Vec<AppAction> {
        vec![AppAction::SignIn { identity }, AppAction::Render]
    }

    /// End the session, discarding the draft and any notice.
    pub fn sign_out(&mut self) -> Vec<AppAction> {
        self.draft.clear();
        self.notice = None;
        vec![AppAction::SignOut, AppAction::Render]
    }

    /// Open `conversation`, or close the open one.
    pub fn select_conversation(&self, conversation: Option<ConversationId>) -> Vec<AppAction> {
        vec![AppAction::Select { conversation }, AppAction::Render]
    }

    /// Replace the draft text.
    pub fn update_draft(&mut self, text: String) -> Vec<AppAction> {
        self.draft = text;
        vec![AppAction::Keystroke, AppAction::Render]
    }

    /// Submit the draft. Blank drafts are ignored.
    pub fn submit(&self) -> Vec<AppAction> {
        if self.draft.trim().is_empty() {
            return Vec::new();
        }
        vec![AppAction::Send { content: self.draft.clone() }, AppAction::Render]
    }

    /// Delete the open conversation. Ignored when nothing is open.
    pub fn delete_active(&self) -> Vec<AppAction> {
        if self.snapshot.active.is_none() {
            return Vec::new();
        }
        vec![AppAction::DeleteActive, AppAction::Render]
    }

    /// Hide the current notice.
    pub fn dismiss_notice(&mut self) -> Vec<AppAction> {
        self.notice = None;
        vec![AppAction::Render]
    }

    /// Quit the application.
    pub fn quit(&self) -> Vec<AppAction> {
        vec![AppAction::Quit]
    }

    /// Latest view of the synchronization core.
    pub fn snapshot(&self) -> &SyncSnapshot {
        &self.snapshot
    }

    /// Text being composed.
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Transient banner. `None` if nothing to show.
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Whether the push transport is up.
    pub fn is_online(&self) -> bool {
        self.online
    }
}

#[cfg(test)]
mod tests {
    use palaver_proto::AuthToken;

    use super::*;

    fn app_in(conversation: &str) -> App {
        let mut app = App::new();
        let snapshot =
            SyncSnapshot { active: Some(ConversationId::from(conversation)), ..Default::default() };
        app.handle(AppEvent::Synced(snapshot));
        app
    }

    #[test]
    fn api_sign_in() {
        let app = App::new();
        let identity = ViewerIdentity::new("alice", AuthToken::new("t"));
        let actions = app.sign_in(identity);

        assert!(matches!(actions.as_slice(), [AppAction::SignIn { .. }, AppAction::Render]));
    }

    #[test]
    fn api_update_draft() {
        let mut app = App::new();
        let actions = app.update_draft("hel".into());

        assert_eq!(actions, vec![AppAction::Keystroke, AppAction::Render]);
        assert_eq!(app.draft(), "hel");
    }

    #[test]
    fn blank_draft_submit_is_noop() {
        let mut app = app_in("c1");
        app.update_draft("   ".into());

        assert!(app.submit().is_empty());
    }

    #[test]
    fn submit_keeps_draft_until_sent() {
        let mut app = app_in("c1");
        app.update_draft("hello".into());

        let actions = app.submit();
        assert!(matches!(
            actions.as_slice(),
            [AppAction::Send { content }, AppAction::Render] if content == "hello"
        ));
        assert_eq!(app.draft(), "hello");

        app.handle(AppEvent::Error { message: "send failed: network error: down".into() });
        assert_eq!(app.draft(), "hello");
        assert!(matches!(app.notice(), Some(Notice::Error(_))));

        app.handle(AppEvent::MessageSent { conversation: ConversationId::from("c1") });
        assert_eq!(app.draft(), "");
    }

    #[test]
    fn sent_after_switch_clears_draft() {
        let mut app = app_in("c2");
        app.update_draft("hello".into());

        app.handle(AppEvent::MessageSent { conversation: ConversationId::from("c1") });
        assert_eq!(app.draft(), "");
    }

    #[test]
    fn delete_without_selection_is_noop() {
        let app = App::new();
        assert!(app.delete_active().is_empty());

        let app = app_in("c1");
        assert_eq!(app.delete_active(), vec![AppAction::DeleteActive, AppAction::Render]);
    }

    #[test]
    fn notice_is_dismissible() {
        let mut app = App::new();
        app.handle(AppEvent::Error { message: "history unavailable".into() });
        assert!(app.notice().is_some());

        app.dismiss_notice();
        assert!(app.notice().is_none());
    }

    #[test]
    fn reconnect_clears_connectivity_notice_only() {
        let mut app = App::new();
        app.handle(AppEvent::Connectivity { online: false });
        assert!(!app.is_online());
        assert_eq!(app.notice().map(Notice::text), Some(RECONNECTING));

        app.handle(AppEvent::Connectivity { online: true });
        assert!(app.notice().is_none());

        app.handle(AppEvent::Error { message: "delete failed".into() });
        app.handle(AppEvent::Connectivity { online: true });
        assert!(app.notice().is_some());
    }

    #[test]
    fn quit_produces_quit() {
        let mut app = App::new();
        assert_eq!(app.handle_input(UserInput::Quit), vec![AppAction::Quit]);
    }
}
