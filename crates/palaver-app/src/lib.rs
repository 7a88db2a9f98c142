//! Application layer for palaver
//!
//! Pure state machines and a generic runtime for the UI boundary, so the same
//! orchestration code runs in production and in deterministic simulation.
//!
//! # Components
//!
//! - [`App`]: view-model state machine (draft, notice, synced snapshot)
//! - [`Bridge`]: translates App actions into Client events and queues I/O
//! - [`Driver`]: trait for platform-specific I/O
//! - [`Runtime`]: generic event loop over a Driver
//! - [`SystemEnv`]: real-clock environment

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod bridge;
mod driver;
mod event;
mod input;
mod runtime;
mod state;
mod system_env;

pub use action::AppAction;
pub use app::App;
pub use bridge::{Bridge, Outgoing};
pub use driver::{Driver, DriverEvent};
pub use event::AppEvent;
pub use input::UserInput;
pub use runtime::Runtime;
pub use state::{Notice, SyncSnapshot};
pub use system_env::SystemEnv;
