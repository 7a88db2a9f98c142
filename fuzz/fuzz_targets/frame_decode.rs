//! Fuzz target for Frame::decode
//!
//! Arbitrary bytes go through the header and length checks. Looks for:
//! - Panics on short or truncated input
//! - Length fields that disagree with the buffer
//! - Headers that pass validation with a bad version
//!
//! Invalid input must come back as an error, never a panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use palaver_proto::Frame;

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = Frame::decode(data) else {
        return;
    };

    // Anything accepted must re-encode to the bytes it came from
    let mut buf = Vec::new();
    if frame.encode(&mut buf).is_ok() {
        assert_eq!(&buf[..], &data[..buf.len()]);
    }
});
