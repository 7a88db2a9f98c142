//! Application side-effects and intents.
//!
//! This module defines the [`AppAction`] enum, which represents instructions
//! produced by the [`crate::App`] state machine for the runtime to execute.

use palaver_proto::{ConversationId, ViewerIdentity};

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Render the UI.
    Render,

    /// Quit the application.
    Quit,

    /// Start the session for a viewer.
    SignIn {
        /// Viewer credentials.
        identity: ViewerIdentity,
    },

    /// End the session.
    SignOut,

    /// Change the active conversation.
    Select {
        /// New selection.
        conversation: Option<ConversationId>,
    },

    /// The draft changed; feeds the typing debounce.
    Keystroke,

    /// Send a message to the active conversation.
    Send {
        /// Draft text as typed.
        content: String,
    },

    /// Delete the active conversation.
    DeleteActive,
}
