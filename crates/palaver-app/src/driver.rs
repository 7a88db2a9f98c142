//! The I/O seam of the runtime.
//!
//! A frontend implements [`Driver`] to supply the push transport, the
//! collaborator calls and rendering. [`crate::Runtime`] does the rest.

use std::{future::Future, ops::Sub, time::Duration};

use palaver_client::{Completion, Request};
use palaver_proto::{Frame, ViewerIdentity};

use crate::{App, UserInput};

/// Something the driver observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    /// Viewer input.
    Input(UserInput),
    /// Frame from the push channel.
    Frame(Frame),
    /// A request passed to [`Driver::submit`] finished.
    Completed(Completion),
    /// The push transport reconnected on its own.
    TransportRestored,
    /// The push transport dropped; the driver is reconnecting.
    Disconnected,
}

/// Everything the [`Runtime`](crate::Runtime) needs from the outside world.
///
/// Collaborator requests are fire-and-forget: [`submit`](Driver::submit)
/// starts the work and the outcome comes back later as
/// [`DriverEvent::Completed`], in whatever order the collaborators finish.
pub trait Driver: Send {
    /// I/O failure. Ends the run.
    type Error: std::error::Error + Send + 'static;

    /// Clock reading, real or simulated.
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration>;

    /// Wait for the next event.
    ///
    /// Returns `None` if `timeout` elapsed first. A `None` timeout waits
    /// until something happens.
    fn next_event(
        &mut self,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<Option<DriverEvent>, Self::Error>> + Send;

    /// Connect the push transport as `identity`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be established.
    fn open(
        &mut self,
        identity: &ViewerIdentity,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Send a frame on the push channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is closed or send fails.
    fn send_frame(&mut self, frame: Frame) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Start a collaborator request.
    fn submit(&mut self, request: Request) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Ask the conversation-list collaborator to refresh.
    fn refresh_conversations(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Disconnect the push transport and release its resources.
    fn close(&mut self, reason: &str);

    /// Current time instant.
    fn now(&self) -> Self::Instant;

    /// Render the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, app: &App) -> Result<(), Self::Error>;
}
