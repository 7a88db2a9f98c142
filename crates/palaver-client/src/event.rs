//! Client events and actions.

use std::fmt;

use palaver_core::{connection::ConnectionAction, error::SyncError};
use palaver_proto::{AuthToken, ConversationId, Frame, Message, MessageId, ViewerIdentity};

/// Correlates a collaborator request with its completion.
///
/// Allocated by the client, strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    /// Wrap a raw id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw id value.
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Work for a request/response collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    /// Full ordered history of a conversation.
    FetchHistory {
        /// Conversation to fetch
        conversation: ConversationId,
    },

    /// Persist a new message.
    CreateMessage {
        /// Target conversation
        conversation: ConversationId,
        /// Trimmed message body
        content: String,
    },

    /// Delete a conversation.
    DeleteConversation {
        /// Conversation to delete
        conversation: ConversationId,
    },
}

/// A collaborator call the caller must perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Id to echo back in the [`Completion`].
    pub id: RequestId,
    /// Viewer credential to authenticate with.
    pub credential: AuthToken,
    /// What to do.
    pub kind: RequestKind,
}

/// Successful collaborator result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Ordered history for a [`RequestKind::FetchHistory`].
    History(Vec<Message>),
    /// The persisted message for a [`RequestKind::CreateMessage`].
    Created(Message),
    /// Acknowledgement for a [`RequestKind::DeleteConversation`].
    Deleted,
}

/// Result of a [`Request`], fed back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Id of the request this answers.
    pub id: RequestId,
    /// Response or failure.
    pub outcome: Result<Response, SyncError>,
}

impl Completion {
    /// Successful completion.
    pub fn ok(id: RequestId, response: Response) -> Self {
        Self { id, outcome: Ok(response) }
    }

    /// Failed completion.
    pub fn failed(id: RequestId, error: SyncError) -> Self {
        Self { id, outcome: Err(error) }
    }
}

/// Which operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// History fetch failed.
    HistoryUnavailable,
    /// Message creation failed.
    SendFailed,
    /// Conversation deletion failed.
    DeleteFailed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::HistoryUnavailable => "history unavailable",
            Self::SendFailed => "send failed",
            Self::DeleteFailed => "delete failed",
        })
    }
}

/// Recoverable failure to show the viewer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {error}")]
pub struct Failure {
    /// Operation that failed.
    pub kind: FailureKind,
    /// Underlying collaborator error.
    pub error: SyncError,
}

/// Events the caller feeds into the client.
///
/// The caller is responsible for:
/// - Receiving frames from the push channel
/// - Performing requests and reporting their completions
/// - Driving time forward via ticks
/// - Forwarding viewer intents (select, type, send, delete)
///
/// Generic over `I` (Instant type) to support both real and virtual time.
#[derive(Debug, Clone)]
pub enum ClientEvent<I = std::time::Instant> {
    /// A viewer identity became available.
    Start {
        /// Identity to open the push session for
        identity: ViewerIdentity,
    },

    /// The viewer went away (sign-out or teardown).
    Stop,

    /// The surrounding UI changed the selection.
    SelectConversation {
        /// New selection; `None` clears it
        conversation: Option<ConversationId>,
    },

    /// Re-run the fetch-and-join sequence for the active conversation.
    ReloadHistory,

    /// The draft text changed (a keystroke).
    DraftChanged,

    /// The viewer submitted the draft.
    SendMessage {
        /// Raw draft text; trimmed before use
        content: String,
    },

    /// The viewer asked to delete the active conversation.
    DeleteConversation,

    /// Frame received from the push channel.
    FrameReceived(Frame),

    /// A collaborator request finished.
    RequestCompleted(Completion),

    /// The push transport reconnected on its own.
    TransportRestored,

    /// Time tick for debounce expiry.
    Tick {
        /// Current time from the environment.
        now: I,
    },
}

/// Actions the client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Connect the push transport.
    Open {
        /// Identity to authenticate as
        identity: ViewerIdentity,
    },

    /// Send a frame on the push channel.
    Send(Frame),

    /// Disconnect the push transport.
    Close {
        /// Reason for closing
        reason: String,
    },

    /// Perform a collaborator request and report back a [`Completion`].
    Request(Request),

    /// Ask the conversation-list collaborator to refresh ordering and unread
    /// state.
    RefreshConversations,

    /// A send was persisted; the draft may be cleared.
    MessageSent {
        /// Conversation the message went to
        conversation: ConversationId,
        /// Server-assigned id
        message_id: MessageId,
    },

    /// A conversation was deleted.
    ConversationDeleted {
        /// Deleted conversation
        conversation: ConversationId,
    },

    /// Recoverable failure to show the viewer.
    Failed(Failure),
}

impl From<ConnectionAction> for ClientAction {
    fn from(action: ConnectionAction) -> Self {
        match action {
            ConnectionAction::Open { identity } => Self::Open { identity },
            ConnectionAction::SendFrame(frame) => Self::Send(frame),
            ConnectionAction::Close { reason } => Self::Close { reason },
        }
    }
}
