//! Deterministic simulation harness for palaver.
//!
//! Runs the production [`palaver_app::Runtime`] against simulated
//! collaborators so whole-system behaviour can be tested reproducibly:
//!
//! - [`SimEnv`]: virtual clock shared by the client and the driver
//! - [`SimServer`]: in-memory chat backend with participant fan-out and
//!   failure injection
//! - [`SimDriver`]: scripted viewer and network, with seeded reordering of
//!   request completions
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for the
//! synchronization invariants.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod invariants;
pub mod sim_driver;
pub mod sim_env;
pub mod sim_server;

pub use invariants::{
    Invariant, InvariantRegistry, InvariantResult, LogMatchesActive, LogUnique,
    NothingPendingForActive, PendingUnique, SystemSnapshot, UnreadMatchesPending, ViewerSnapshot,
    Violation, Violations,
};
pub use sim_driver::{RenderedView, SimDriver, SimDriverError, Step};
pub use sim_env::{SimEnv, SimInstant};
pub use sim_server::{RequestClass, SharedSimServer, SimServer, create_shared_server};

/// Install a `tracing` subscriber for tests.
///
/// Filtering follows `RUST_LOG`; output goes through the test writer so it is
/// only shown for failing tests. Safe to call from every test.
pub fn init_test_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
}
