//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` plays the viewer and the network for one
//! [`palaver_app::Runtime`]. It implements [`Driver`] so the production
//! orchestration code runs unchanged against a [`SimServer`].
//!
//! # Scheduling
//!
//! Each call to `next_event` picks one ready source: transport notices, push
//! frames waiting on the server, finished requests, or the next script step.
//! Without a seed the order is fixed (network first, script last), so every
//! script step runs against a settled system. With a seed the source and the
//! completion to deliver are drawn from a ChaCha RNG, which reorders
//! completions and interleaves live traffic with fetches reproducibly.
//!
//! When nothing is ready the driver advances virtual time to the runtime's
//! next deadline, and once no deadline remains it quits.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use palaver_app::{App, Driver, DriverEvent, Notice, SyncSnapshot, UserInput};
use palaver_client::{Completion, Request};
use palaver_core::env::Environment;
use palaver_proto::{Frame, UserId, ViewerIdentity};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::{
    SimEnv, SimInstant, SimServer,
    invariants::{InvariantRegistry, SystemSnapshot, ViewerSnapshot},
    sim_server::{SharedSimServer, lock},
};

/// Error type for simulation driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimDriverError {
    /// A scripted [`Step::Fail`] fired.
    Injected,
    /// An invariant failed on render.
    Invariant(String),
}

impl std::fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Injected => write!(f, "SimDriverError: injected failure"),
            Self::Invariant(message) => write!(f, "SimDriverError: {message}"),
        }
    }
}

impl std::error::Error for SimDriverError {}

/// Server-side action run at a scripted point.
pub type RemoteAction = Box<dyn FnOnce(&mut SimServer) + Send>;

/// One scripted step.
pub enum Step {
    /// Viewer input.
    Input(UserInput),
    /// Let virtual time pass.
    Wait(Duration),
    /// Act on the server (another participant posts, types, ...).
    Remote(RemoteAction),
    /// Drop the push transport.
    Disconnect,
    /// Bring the push transport back.
    Reconnect,
    /// Fail the next `next_event` call.
    Fail,
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input(input) => f.debug_tuple("Input").field(input).finish(),
            Self::Wait(duration) => f.debug_tuple("Wait").field(duration).finish(),
            Self::Remote(_) => f.write_str("Remote(..)"),
            Self::Disconnect => f.write_str("Disconnect"),
            Self::Reconnect => f.write_str("Reconnect"),
            Self::Fail => f.write_str("Fail"),
        }
    }
}

/// What the viewer saw at one render.
#[derive(Debug, Clone)]
pub struct RenderedView {
    /// Synced client state.
    pub snapshot: SyncSnapshot,
    /// Draft text.
    pub draft: String,
    /// Banner, if any.
    pub notice: Option<Notice>,
    /// Whether the transport was up.
    pub online: bool,
}

impl From<&App> for RenderedView {
    fn from(app: &App) -> Self {
        Self {
            snapshot: app.snapshot().clone(),
            draft: app.draft().to_string(),
            notice: app.notice().cloned(),
            online: app.is_online(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Source {
    Transport,
    Frame,
    Completion,
    Script,
}

#[derive(Debug, Default)]
struct SharedState {
    script: VecDeque<Step>,
    transport: VecDeque<DriverEvent>,
    completions: Vec<Completion>,
    user: Option<UserId>,
    link_up: bool,
    views: Vec<RenderedView>,
    closed: Vec<String>,
    refreshes: usize,
    rng: Option<ChaCha8Rng>,
    hold_open: bool,
}

/// Simulation driver for deterministic testing.
///
/// Clones share all state, so a test keeps a clone to script the run and
/// inspect the results after handing the original to the runtime.
#[derive(Clone)]
pub struct SimDriver {
    server: SharedSimServer,
    env: SimEnv,
    state: Arc<Mutex<SharedState>>,
    invariants: Option<Arc<InvariantRegistry>>,
}

impl SimDriver {
    /// Create a driver talking to `server` on `env`'s clock.
    pub fn new(server: SharedSimServer, env: SimEnv) -> Self {
        Self { server, env, state: Arc::new(Mutex::new(SharedState::default())), invariants: None }
    }

    /// Draw scheduling decisions from a seeded RNG.
    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        self.lock_state().rng = Some(ChaCha8Rng::seed_from_u64(seed));
        self
    }

    /// Enable invariant checking on every render.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(Arc::new(registry));
        self
    }

    /// Keep running when the script is exhausted instead of quitting.
    #[must_use]
    pub fn hold_open(self) -> Self {
        self.lock_state().hold_open = true;
        self
    }

    /// Append a step to the script.
    pub fn script(&self, step: Step) {
        self.lock_state().script.push_back(step);
    }

    /// Append viewer input to the script.
    pub fn input(&self, input: UserInput) {
        self.script(Step::Input(input));
    }

    /// Append a server-side action to the script.
    pub fn remote(&self, action: impl FnOnce(&mut SimServer) + Send + 'static) {
        self.script(Step::Remote(Box::new(action)));
    }

    /// Every render so far.
    pub fn views(&self) -> Vec<RenderedView> {
        self.lock_state().views.clone()
    }

    /// Most recent render.
    pub fn last_view(&self) -> Option<RenderedView> {
        self.lock_state().views.last().cloned()
    }

    /// Reasons passed to `close`, in order.
    pub fn closed(&self) -> Vec<String> {
        self.lock_state().closed.clone()
    }

    /// Number of conversation-list refreshes requested.
    pub fn refreshes(&self) -> usize {
        self.lock_state().refreshes
    }

    /// Whether a push session is open.
    pub fn is_open(&self) -> bool {
        self.lock_state().user.is_some()
    }

    /// Create a snapshot from App state for invariant checking.
    pub fn snapshot_from_app(&self, app: &App) -> SystemSnapshot {
        SystemSnapshot::single(ViewerSnapshot::from(app.snapshot()))
    }

    /// Check invariants against App state.
    pub fn check_invariants(&self, app: &App) -> Result<(), SimDriverError> {
        let Some(registry) = &self.invariants else {
            return Ok(());
        };
        registry
            .check_all(&self.snapshot_from_app(app))
            .map_err(|violations| SimDriverError::Invariant(violations.to_string()))
    }

    fn lock_state(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn poll(&self, timeout: Option<Duration>) -> Result<Option<DriverEvent>, SimDriverError> {
        let mut state = self.lock_state();

        let frames_ready = state.link_up
            && state.user.as_ref().is_some_and(|user| lock(&self.server).has_frames(user));

        let mut ready = Vec::with_capacity(4);
        if !state.transport.is_empty() {
            ready.push(Source::Transport);
        }
        if frames_ready {
            ready.push(Source::Frame);
        }
        if !state.completions.is_empty() {
            ready.push(Source::Completion);
        }
        if !state.script.is_empty() {
            ready.push(Source::Script);
        }

        let source = match state.rng.as_mut() {
            Some(rng) if !ready.is_empty() => Some(ready[rng.gen_range(0..ready.len())]),
            _ => ready.first().copied(),
        };

        match source {
            Some(Source::Transport) => Ok(state.transport.pop_front()),
            Some(Source::Frame) => {
                let frame =
                    state.user.as_ref().and_then(|user| lock(&self.server).take_frame(user));
                Ok(frame.map(DriverEvent::Frame))
            },
            Some(Source::Completion) => {
                let SharedState { rng, completions, .. } = &mut *state;
                let index = rng.as_mut().map_or(0, |rng| rng.gen_range(0..completions.len()));
                Ok(Some(DriverEvent::Completed(completions.remove(index))))
            },
            Some(Source::Script) => self.run_step(&mut state, timeout),
            None => {
                if let Some(timeout) = timeout {
                    self.env.advance(timeout);
                    Ok(None)
                } else if state.hold_open {
                    Ok(None)
                } else {
                    Ok(Some(DriverEvent::Input(UserInput::Quit)))
                }
            },
        }
    }

    fn run_step(
        &self,
        state: &mut SharedState,
        timeout: Option<Duration>,
    ) -> Result<Option<DriverEvent>, SimDriverError> {
        let Some(step) = state.script.pop_front() else {
            return Ok(None);
        };
        debug!(?step, "script step");

        match step {
            Step::Input(input) => Ok(Some(DriverEvent::Input(input))),
            Step::Wait(duration) => {
                // Stop at the runtime's deadline so it can tick, then resume
                match timeout {
                    Some(deadline) if deadline < duration => {
                        self.env.advance(deadline);
                        state.script.push_front(Step::Wait(duration - deadline));
                    },
                    _ => self.env.advance(duration),
                }
                Ok(None)
            },
            Step::Remote(action) => {
                action(&mut lock(&self.server));
                Ok(None)
            },
            Step::Disconnect => {
                state.link_up = false;
                if let Some(user) = &state.user {
                    lock(&self.server).disconnect(user);
                }
                Ok(Some(DriverEvent::Disconnected))
            },
            Step::Reconnect => {
                state.link_up = true;
                match &state.user {
                    Some(user) => {
                        lock(&self.server).connect(user);
                        Ok(Some(DriverEvent::TransportRestored))
                    },
                    None => Ok(None),
                }
            },
            Step::Fail => Err(SimDriverError::Injected),
        }
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;
    type Instant = SimInstant;

    async fn next_event(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<Option<DriverEvent>, Self::Error> {
        // Let other simulated tasks run between events
        tokio::task::yield_now().await;
        self.poll(timeout)
    }

    async fn open(&mut self, identity: &ViewerIdentity) -> Result<(), Self::Error> {
        let mut state = self.lock_state();
        lock(&self.server).connect(&identity.user_id);
        state.user = Some(identity.user_id.clone());
        state.link_up = true;
        Ok(())
    }

    async fn send_frame(&mut self, frame: Frame) -> Result<(), Self::Error> {
        let state = self.lock_state();
        match &state.user {
            Some(user) if state.link_up => lock(&self.server).receive_frame(user, &frame),
            _ => debug!(opcode = frame.header.opcode(), "transport down, frame dropped"),
        }
        Ok(())
    }

    async fn submit(&mut self, request: Request) -> Result<(), Self::Error> {
        let outcome = lock(&self.server).handle_request(&request);
        self.lock_state().completions.push(Completion { id: request.id, outcome });
        Ok(())
    }

    async fn refresh_conversations(&mut self) -> Result<(), Self::Error> {
        self.lock_state().refreshes += 1;
        Ok(())
    }

    fn close(&mut self, reason: &str) {
        let mut state = self.lock_state();
        if let Some(user) = state.user.take() {
            lock(&self.server).disconnect(&user);
        }
        state.link_up = false;
        state.closed.push(reason.to_string());
    }

    fn now(&self) -> Self::Instant {
        self.env.now()
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        self.lock_state().views.push(RenderedView::from(app));
        self.check_invariants(app)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use palaver_proto::ConversationId;

    use super::*;
    use crate::create_shared_server;

    fn driver() -> SimDriver {
        let mut server = SimServer::new();
        server.register_user("alice", "t");
        server.create_conversation("c1", ["alice", "bob"]);
        SimDriver::new(create_shared_server(server), SimEnv::new())
    }

    #[tokio::test]
    async fn exhausted_script_quits() {
        let mut driver = driver();

        let event = driver.next_event(None).await.unwrap();

        assert_eq!(event, Some(DriverEvent::Input(UserInput::Quit)));
    }

    #[tokio::test]
    async fn idle_with_deadline_advances_clock() {
        let mut driver = driver();
        let start = driver.now();

        let event = driver.next_event(Some(Duration::from_secs(3))).await.unwrap();

        assert_eq!(event, None);
        assert_eq!(driver.now() - start, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn wait_stops_at_deadline() {
        let mut driver = driver();
        driver.script(Step::Wait(Duration::from_secs(5)));
        let start = driver.now();

        driver.next_event(Some(Duration::from_secs(2))).await.unwrap();
        assert_eq!(driver.now() - start, Duration::from_secs(2));

        driver.next_event(None).await.unwrap();
        assert_eq!(driver.now() - start, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn frames_wait_for_open_session() {
        let mut driver = driver();
        let alice = ViewerIdentity::new("alice", palaver_proto::AuthToken::new("t"));
        let c1 = ConversationId::from("c1");

        driver.open(&alice).await.unwrap();
        {
            let mut server = lock(&driver.server);
            server.connect_observer(&alice.user_id);
            server.post(&c1, &UserId::from("bob"), "hi").unwrap();
        }

        let event = driver.next_event(None).await.unwrap();
        assert!(matches!(event, Some(DriverEvent::Frame(_))));
    }

    #[tokio::test]
    async fn scripted_failure_surfaces() {
        let mut driver = driver();
        driver.script(Step::Fail);

        assert_eq!(driver.next_event(None).await, Err(SimDriverError::Injected));
    }
}
