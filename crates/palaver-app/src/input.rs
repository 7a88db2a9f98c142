//! Platform-agnostic viewer input.

use palaver_proto::{ConversationId, ViewerIdentity};

/// Viewer input abstraction.
///
/// Decouples application logic from any particular UI toolkit so simulation
/// tests can script the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    /// Credentials became available.
    SignIn(ViewerIdentity),
    /// The viewer signed out.
    SignOut,
    /// Open a conversation, or close the open one with `None`.
    Select(Option<ConversationId>),
    /// The draft text changed.
    EditDraft(String),
    /// Submit the draft.
    Submit,
    /// Delete the open conversation.
    DeleteActive,
    /// Dismiss the current notice.
    DismissNotice,
    /// Leave the application.
    Quit,
}
