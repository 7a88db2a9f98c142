//! Client
//!
//! Action-based synchronization core for one chat viewer. Keeps the active
//! conversation's message log, typing indicators and background notifications
//! consistent across a push channel and on-demand history fetches.
//!
//! # Architecture
//!
//! Follows the same Sans-IO pattern as [`palaver_core`]. The client receives
//! events ([`ClientEvent`]), processes them through pure state machine logic,
//! and returns actions ([`ClientAction`]) for the caller to execute.
//! Collaborator calls (history fetch, message creation, deletion) leave as
//! [`Request`]s and come back as [`Completion`]s.
//!
//! # Components
//!
//! - [`Client`]: composes everything around the active conversation
//! - [`MessageStore`]: duplicate-free log for the active conversation
//! - [`TypingCoordinator`]: local debounce and remote typing flag
//! - [`NotificationDeduper`]: pending notifications for other conversations

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod config;
mod error;
mod event;
mod notify;
mod store;
mod typing;

pub use client::Client;
pub use config::{ClientConfig, DEFAULT_MAX_CONTENT_LEN, DEFAULT_TYPING_TIMEOUT};
pub use error::ClientError;
pub use event::{
    ClientAction, ClientEvent, Completion, Failure, FailureKind, Request, RequestId, RequestKind,
    Response,
};
pub use notify::{NotificationDeduper, PendingNotification, Routed};
pub use palaver_core::{env::Environment, error::SyncError};
pub use store::{AppendOutcome, MessageStore};
pub use typing::{TypingCoordinator, TypingSignal};
