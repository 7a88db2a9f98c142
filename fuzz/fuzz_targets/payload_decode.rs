//! Fuzz target for Payload::from_frame
//!
//! The same body is tried under every opcode, covering malformed CBOR and
//! bodies that decode as the wrong event.

#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use palaver_proto::{Frame, FrameHeader, Opcode, Payload};

fuzz_target!(|data: &[u8]| {
    for opcode in Opcode::ALL {
        let frame = Frame::new(FrameHeader::new(opcode), Bytes::copy_from_slice(data));
        let _ = Payload::from_frame(&frame);
    }
});
