//! Frame type combining header and payload.
//!
//! A `Frame` is the unit the push channel moves around: a 12-byte
//! [`FrameHeader`] followed by raw payload bytes. It is a plain data holder;
//! see [`crate::Payload::into_frame`] and [`crate::Payload::from_frame`] for
//! the typed view.

use bytes::{BufMut, Bytes};

use crate::{
    FrameHeader,
    errors::{ProtocolError, Result},
};

/// Complete push-channel frame.
///
/// Layout on the wire: `[FrameHeader: 12 bytes] + [payload: variable]`.
///
/// # Invariants
///
/// - `payload.len()` matches `header.payload_size()`. Enforced by
///   [`Frame::new`] and checked by [`Frame::decode`].
/// - Encoded frames never exceed [`FrameHeader::MAX_PAYLOAD_SIZE`] of payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame header.
    pub header: FrameHeader,

    /// Raw payload bytes (CBOR).
    pub payload: Bytes,
}

impl Frame {
    /// Create a frame, setting the header's payload size from `payload`.
    ///
    /// Does not enforce the size limit; oversized frames are rejected by
    /// [`Frame::encode`].
    #[must_use]
    pub fn new(mut header: FrameHeader, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();

        // Saturate instead of panicking; encode() rejects anything this large.
        let payload_len = u32::try_from(payload.len()).unwrap_or(u32::MAX);
        header.payload_size = payload_len.to_be_bytes();

        Self { header, payload }
    }

    /// Encode into `dst` as `[header] + [payload]`.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadTooLarge` if the payload exceeds
    ///   [`FrameHeader::MAX_PAYLOAD_SIZE`]
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        if self.payload.len() > FrameHeader::MAX_PAYLOAD_SIZE as usize {
            return Err(ProtocolError::PayloadTooLarge {
                size: self.payload.len(),
                max: FrameHeader::MAX_PAYLOAD_SIZE as usize,
            });
        }

        debug_assert_eq!(self.payload.len(), self.header.payload_size() as usize);

        dst.put_slice(&self.header.to_bytes());
        dst.put_slice(&self.payload);

        Ok(())
    }

    /// Encode into a freshly allocated buffer.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(FrameHeader::SIZE + self.payload.len());
        self.encode(&mut buf)?;
        Ok(buf)
    }

    /// Decode a frame from wire bytes.
    ///
    /// Only structural validation happens here; the payload stays raw. Bytes
    /// past the claimed payload are ignored.
    ///
    /// # Errors
    ///
    /// - Any header validation error from [`FrameHeader::from_bytes`]
    /// - `ProtocolError::FrameTruncated` if fewer payload bytes than claimed
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header = FrameHeader::from_bytes(bytes)?;
        let payload_size = header.payload_size() as usize;

        let body = bytes.get(FrameHeader::SIZE..FrameHeader::SIZE + payload_size).ok_or(
            ProtocolError::FrameTruncated {
                expected: payload_size,
                actual: bytes.len().saturating_sub(FrameHeader::SIZE),
            },
        )?;

        Ok(Self { header: *header, payload: Bytes::copy_from_slice(body) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Opcode;

    #[test]
    fn new_sets_payload_size() {
        let frame = Frame::new(FrameHeader::new(Opcode::Typing), vec![1, 2, 3]);
        assert_eq!(frame.header.payload_size(), 3);
    }

    #[test]
    fn truncated_payload_rejected() {
        let frame = Frame::new(FrameHeader::new(Opcode::NewMessage), vec![7u8; 32]);
        let bytes = frame.to_vec().expect("encode");

        let result = Frame::decode(&bytes[..bytes.len() - 1]);
        assert_eq!(result, Err(ProtocolError::FrameTruncated { expected: 32, actual: 31 }));
    }

    #[test]
    fn trailing_bytes_ignored() {
        let frame = Frame::new(FrameHeader::new(Opcode::StopTyping), vec![9u8; 4]);
        let mut bytes = frame.to_vec().expect("encode");
        bytes.extend_from_slice(b"next frame");

        assert_eq!(Frame::decode(&bytes), Ok(frame));
    }

    #[test]
    fn oversized_payload_not_encoded() {
        let size = FrameHeader::MAX_PAYLOAD_SIZE as usize + 1;
        let frame = Frame::new(FrameHeader::new(Opcode::NewMessage), vec![0u8; size]);

        assert!(matches!(frame.to_vec(), Err(ProtocolError::PayloadTooLarge { .. })));
    }
}
