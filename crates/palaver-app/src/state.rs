//! Observable application state types.
//!
//! [`SyncSnapshot`] is the view model: everything the UI renders about the
//! active conversation and background notifications, copied out of the
//! client after every step. [`Notice`] is the transient, dismissible banner.

use std::collections::BTreeMap;

use palaver_client::{Client, Environment};
use palaver_proto::{ConversationId, Message, UserId};

/// Reactive view of the synchronization core.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSnapshot {
    /// Signed-in viewer. `None` when signed out.
    pub viewer: Option<UserId>,
    /// Active conversation.
    pub active: Option<ConversationId>,
    /// Visible log, in arrival order.
    pub messages: Vec<Message>,
    /// History fetch outstanding.
    pub loading: bool,
    /// A participant is typing in the active conversation.
    pub remote_typing: bool,
    /// Pending notifications, newest first.
    pub pending: Vec<Message>,
    /// Pending count per conversation.
    pub unread: BTreeMap<ConversationId, usize>,
}

impl SyncSnapshot {
    /// Copy the observable state out of `client`.
    pub fn capture<E: Environment>(client: &Client<E>) -> Self {
        Self {
            viewer: client.identity().map(|identity| identity.user_id.clone()),
            active: client.active_conversation().cloned(),
            messages: client.messages().to_vec(),
            loading: client.is_loading(),
            remote_typing: client.is_remote_typing(),
            pending: client.pending_notifications().map(|p| p.message.clone()).collect(),
            unread: client.unread_counts(),
        }
    }
}

/// Transient banner shown to the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Something failed; prior state was preserved.
    Error(String),
    /// Informational status.
    Info(String),
}

impl Notice {
    /// Banner text.
    pub fn text(&self) -> &str {
        match self {
            Self::Error(text) | Self::Info(text) => text,
        }
    }
}
