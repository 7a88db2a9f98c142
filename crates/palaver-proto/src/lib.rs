//! Wire format for the palaver push channel.
//!
//! The push channel carries a small, closed set of named events. Each event is
//! a [`Frame`]: a fixed 12-byte binary [`FrameHeader`] followed by a CBOR
//! encoded body. The header's [`Opcode`] names the event, so the body never
//! carries a variant tag of its own.
//!
//! # Components
//!
//! - [`FrameHeader`] / [`Frame`]: transport-level framing
//! - [`Payload`]: typed view of every push event
//! - [`Message`], [`ViewerIdentity`] and the id newtypes: the chat vocabulary
//!   shared by every other crate in the workspace

#![deny(missing_docs)]

pub mod errors;
mod frame;
mod header;
mod opcode;
pub mod payloads;
mod types;

pub use errors::{ProtocolError, Result};
pub use frame::Frame;
pub use header::FrameHeader;
pub use opcode::Opcode;
pub use payloads::Payload;
pub use types::{AuthToken, ConversationId, Message, MessageId, UserId, ViewerIdentity};
