//! Application input events.
//!
//! This module defines [`AppEvent`], the notifications that drive the
//! [`crate::App`] state machine. They are translated from client actions by
//! the [`crate::Bridge`] or raised by the runtime for transport changes.

use palaver_proto::ConversationId;

use crate::SyncSnapshot;

/// Events processed by the App state machine.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Fresh view of the synchronization core.
    Synced(SyncSnapshot),

    /// A send was persisted.
    MessageSent {
        /// Conversation the message went to.
        conversation: ConversationId,
    },

    /// A conversation was deleted.
    ConversationDeleted {
        /// Deleted conversation.
        conversation: ConversationId,
    },

    /// Push transport dropped or came back.
    Connectivity {
        /// Whether the transport is up.
        online: bool,
    },

    /// Recoverable failure to show the viewer.
    Error {
        /// Error description.
        message: String,
    },
}
