//! Event loop tying the viewer, the sync client and a frontend together.
//!
//! [`Runtime`] owns the [`App`] and the [`Bridge`] and borrows all I/O from a
//! [`Driver`], so one loop serves both the real frontend and the simulation.
//!
//! The push session is released on every exit path: a normal quit, a driver
//! error, and dropping the runtime without running it to completion.

use palaver_client::{ClientConfig, Environment};
use tracing::{debug, warn};

use crate::{App, AppAction, AppEvent, Bridge, Driver, DriverEvent, Outgoing};

/// Owns viewer state and runs it against a [`Driver`].
///
/// `D` supplies events and performs I/O; `E` is the client's clock. Both must
/// agree on the instant type.
pub struct Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    driver: D,
    app: App,
    bridge: Bridge<E>,
    released: bool,
}

impl<D, E> Runtime<D, E>
where
    D: Driver<Instant = E::Instant>,
    E: Environment,
{
    /// Runtime with a signed-out viewer.
    pub fn new(driver: D, env: E, config: ClientConfig) -> Self {
        Self { driver, app: App::new(), bridge: Bridge::new(env, config), released: false }
    }

    /// Run the main event loop until the viewer quits.
    ///
    /// Each cycle:
    /// 1. Waits for a driver event, bounded by the next debounce deadline
    /// 2. Feeds it through App and Bridge until no actions remain
    /// 3. Performs the queued I/O through the driver
    /// 4. Ticks the client if a deadline has passed
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error. The push
    /// session is closed before the error is returned.
    pub async fn run(mut self) -> Result<(), D::Error> {
        let result = self.event_loop().await;
        self.release();
        result
    }

    async fn event_loop(&mut self) -> Result<(), D::Error> {
        self.driver.render(&self.app)?;
        while !self.process_cycle().await? {}
        Ok(())
    }

    /// Wait for one driver event and settle everything it causes. `true` to quit.
    async fn process_cycle(&mut self) -> Result<bool, D::Error> {
        let timeout = self.bridge.next_timeout(self.driver.now());
        let quit = match self.driver.next_event(timeout).await? {
            Some(DriverEvent::Input(input)) => {
                let actions = self.app.handle_input(input);
                self.process_actions(actions).await?
            },
            Some(DriverEvent::Frame(frame)) => {
                let events = self.bridge.handle_frame(frame);
                self.process_bridge_events(events).await?
            },
            Some(DriverEvent::Completed(completion)) => {
                let events = self.bridge.handle_completion(completion);
                self.process_bridge_events(events).await?
            },
            Some(DriverEvent::TransportRestored) => {
                let events = self.bridge.handle_transport_restored();
                self.process_bridge_events(events).await?
            },
            Some(DriverEvent::Disconnected) => {
                let events = vec![AppEvent::Connectivity { online: false }];
                self.process_bridge_events(events).await?
            },
            None => false,
        };
        if quit {
            return Ok(true);
        }

        let now = self.driver.now();
        if self.bridge.next_timeout(now).is_some_and(|left| left.is_zero()) {
            let events = self.bridge.handle_tick(now);
            return self.process_bridge_events(events).await;
        }

        Ok(false)
    }

    /// Run App actions until none are left. `true` on quit.
    async fn process_actions(&mut self, actions: Vec<AppAction>) -> Result<bool, D::Error> {
        let mut queue = actions;

        while !queue.is_empty() {
            for action in std::mem::take(&mut queue) {
                match action {
                    AppAction::Render => self.driver.render(&self.app)?,
                    AppAction::Quit => return Ok(true),

                    // Session operations go through the bridge
                    AppAction::SignIn { .. }
                    | AppAction::SignOut
                    | AppAction::Select { .. }
                    | AppAction::Keystroke
                    | AppAction::Send { .. }
                    | AppAction::DeleteActive => {
                        for event in self.bridge.process_app_action(action) {
                            queue.extend(self.app.handle(event));
                        }
                        self.flush_outgoing().await?;
                    },
                }
            }
        }
        Ok(false)
    }

    /// Feed client-originated events to the App.
    async fn process_bridge_events(&mut self, events: Vec<AppEvent>) -> Result<bool, D::Error> {
        self.flush_outgoing().await?;
        let mut actions: Vec<_> = events.into_iter().flat_map(|e| self.app.handle(e)).collect();
        // One render covers the whole batch
        actions.dedup();
        self.process_actions(actions).await
    }

    /// Perform all queued I/O through the driver.
    async fn flush_outgoing(&mut self) -> Result<(), D::Error> {
        for outgoing in self.bridge.take_outgoing() {
            match outgoing {
                Outgoing::Open { identity } => self.driver.open(&identity).await?,
                Outgoing::Frame(frame) => self.driver.send_frame(frame).await?,
                Outgoing::Request(request) => self.driver.submit(request).await?,
                Outgoing::Close { reason } => self.driver.close(&reason),
                Outgoing::RefreshConversations => self.driver.refresh_conversations().await?,
            }
        }
        Ok(())
    }

    /// Viewer state.
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Client side of the loop.
    pub fn bridge(&self) -> &Bridge<E> {
        &self.bridge
    }
}

impl<D, E> Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    /// Close the push session. Runs at most once.
    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        self.bridge.shutdown();
        for outgoing in self.bridge.take_outgoing() {
            match outgoing {
                Outgoing::Close { reason } => self.driver.close(&reason),
                other => debug!(?other, "dropping I/O queued at teardown"),
            }
        }
    }
}

impl<D, E> Drop for Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    fn drop(&mut self) {
        if !self.released {
            warn!("runtime dropped before completion, releasing session");
        }
        self.release();
    }
}
