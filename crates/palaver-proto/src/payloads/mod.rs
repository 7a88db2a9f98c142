//! CBOR-encoded push-channel events.
//!
//! The header is raw binary, the body is CBOR. [`Payload`] covers the whole
//! event set; its variant is implied by the frame's opcode, so only the inner
//! struct is serialized.
//!
//! # Invariants
//!
//! Each payload variant maps to exactly one opcode, enforced by the exhaustive
//! matches in [`Payload::opcode`], [`Payload::encode`] and [`Payload::decode`].

pub mod chat;
pub mod session;

use bytes::BufMut;
use serde::de::DeserializeOwned;

use crate::{
    Frame, FrameHeader, Message, Opcode,
    errors::{ProtocolError, Result},
};

/// Every event the push channel can carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    // Outbound only
    /// Announce the viewer after connecting.
    PresenceRegister(session::Presence),
    /// Start watching a conversation.
    JoinConversation(chat::ConversationScope),
    /// Fan a persisted message out to the other participants.
    NewMessage(Message),

    // Both directions
    /// Typing started.
    Typing(chat::ConversationScope),
    /// Typing stopped.
    StopTyping(chat::ConversationScope),

    // Inbound only
    /// Message delivered by the server.
    MessageReceived(Message),
}

impl Payload {
    /// Opcode corresponding to this payload.
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::PresenceRegister(_) => Opcode::PresenceRegister,
            Self::JoinConversation(_) => Opcode::JoinConversation,
            Self::NewMessage(_) => Opcode::NewMessage,
            Self::Typing(_) => Opcode::Typing,
            Self::StopTyping(_) => Opcode::StopTyping,
            Self::MessageReceived(_) => Opcode::MessageReceived,
        }
    }

    /// Encode the payload body (no variant tag) into `dst`.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        let mut writer = dst.writer();

        match self {
            Self::PresenceRegister(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::JoinConversation(inner)
            | Self::Typing(inner)
            | Self::StopTyping(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::NewMessage(inner) | Self::MessageReceived(inner) => {
                ciborium::ser::into_writer(inner, &mut writer)
            },
        }
        .map_err(|e| ProtocolError::CborEncode(e.to_string()))
    }

    /// Decode a payload body for `opcode`.
    ///
    /// The size check runs before the CBOR parser sees the bytes.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadTooLarge` if bytes exceed the maximum
    /// - `ProtocolError::CborDecode` if the body does not match the opcode
    pub fn decode(opcode: Opcode, bytes: &[u8]) -> Result<Self> {
        if bytes.len() > FrameHeader::MAX_PAYLOAD_SIZE as usize {
            return Err(ProtocolError::PayloadTooLarge {
                size: bytes.len(),
                max: FrameHeader::MAX_PAYLOAD_SIZE as usize,
            });
        }

        let payload = match opcode {
            Opcode::PresenceRegister => Self::PresenceRegister(cbor(bytes)?),
            Opcode::JoinConversation => Self::JoinConversation(cbor(bytes)?),
            Opcode::NewMessage => Self::NewMessage(cbor(bytes)?),
            Opcode::Typing => Self::Typing(cbor(bytes)?),
            Opcode::StopTyping => Self::StopTyping(cbor(bytes)?),
            Opcode::MessageReceived => Self::MessageReceived(cbor(bytes)?),
        };

        Ok(payload)
    }

    /// Encode into a frame with the matching opcode.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    pub fn into_frame(self) -> Result<Frame> {
        let mut buf = Vec::new();
        self.encode(&mut buf)?;
        Ok(Frame::new(FrameHeader::new(self.opcode()), buf))
    }

    /// Parse the typed payload out of a frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnknownOpcode` if the header names no known event
    /// - `ProtocolError::CborDecode` if the body does not match the opcode
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        let opcode = frame
            .header
            .opcode_enum()
            .ok_or(ProtocolError::UnknownOpcode(frame.header.opcode()))?;
        Self::decode(opcode, &frame.payload)
    }
}

fn cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::CborDecode(e.to_string()))
}
