//! Error types for the synchronization core.
//!
//! Two families:
//!
//! - [`SyncError`]: failures reported by external collaborators (history
//!   fetch, message persistence, conversation deletion). Always recoverable;
//!   the session survives them.
//! - [`ConnectionError`]: malformed or misdirected push-channel frames.

use palaver_proto::ProtocolError;
use thiserror::Error;

/// Failure reported by a request/response collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Transport or service unreachable.
    #[error("network error: {0}")]
    Network(String),

    /// Credential rejected.
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// Input rejected by the collaborator.
    #[error("validation failed: {0}")]
    Validation(String),
}

impl SyncError {
    /// Returns true if retrying the same request may succeed.
    ///
    /// Only network failures are transient. A rejected credential or input
    /// fails the same way until something changes.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Errors raised while interpreting inbound push-channel frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Server sent an event that only flows client to server.
    #[error("unexpected frame: opcode {opcode:#06x} is not a server event")]
    UnexpectedFrame {
        /// Opcode of the offending frame
        opcode: u16,
    },

    /// Frame or payload failed to decode.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}
