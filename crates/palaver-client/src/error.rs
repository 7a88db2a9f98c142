//! Client errors.

use palaver_core::error::ConnectionError;
use thiserror::Error;

use crate::event::RequestId;

/// Errors returned by [`crate::Client::handle`].
///
/// Collaborator failures are not errors here: they surface as
/// [`crate::ClientAction::Failed`] and the session carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Operation needs a credential but no identity has been started.
    #[error("client not started: no viewer identity")]
    NotStarted,

    /// Inbound frame could not be interpreted.
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Completion carried a response of the wrong kind for its request.
    #[error("completion {id} does not match its request")]
    MismatchedResponse {
        /// Request the completion claimed to answer
        id: RequestId,
    },
}
