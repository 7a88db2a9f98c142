//! Core building blocks for the palaver synchronization client.
//!
//! Sans-IO: nothing in this crate performs I/O. State machines receive the
//! current time as a parameter and return actions for a driver to execute.
//!
//! # Components
//!
//! - [`env::Environment`]: time abstraction (real or virtual)
//! - [`error`]: the failure taxonomy shared by every layer
//! - [`connection::ConnectionManager`]: owns the single push-channel session

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod connection;
pub mod env;
pub mod error;
