//! ZMTP v2 frame encoder.
//!
//! The counterpart of the decoder: writes one frame per message, with
//! the MORE and COMMAND bits mirrored from the message flags and the
//! LARGE bit chosen by payload length. All multi-byte integers are
//! big-endian.
//!
//! # Example
//!
//! ```
//! use zmtp_engine::protocol::encode_frame;
//! use zmtp_engine::Msg;
//!
//! let frame = encode_frame(&Msg::from_vec(b"Hello".to_vec()));
//! assert_eq!(frame, [0x00, 0x05, b'H', b'e', b'l', b'l', b'o']);
//! ```

use bytes::{BufMut, BytesMut};

use super::wire_format::{flags, LONG_SIZE_BYTES, MAX_SHORT_SIZE};
use crate::msg::Msg;

/// Number of bytes [`encode_frame`] produces for `msg`.
#[inline]
pub fn encoded_frame_len(msg: &Msg) -> usize {
    let size_bytes = if msg.size() > MAX_SHORT_SIZE {
        LONG_SIZE_BYTES
    } else {
        1
    };
    1 + size_bytes + msg.size()
}

/// Append one frame for `msg` to `out`.
pub fn encode_frame_into(msg: &Msg, out: &mut BytesMut) {
    let size = msg.size();

    let mut wire_flags = 0u8;
    if msg.has_more() {
        wire_flags |= flags::MORE;
    }
    if msg.is_command() {
        wire_flags |= flags::COMMAND;
    }

    out.reserve(encoded_frame_len(msg));
    if size > MAX_SHORT_SIZE {
        out.put_u8(wire_flags | flags::LARGE);
        out.put_u64(size as u64);
    } else {
        out.put_u8(wire_flags);
        out.put_u8(size as u8);
    }
    out.put_slice(msg.data());
}

/// Encode one frame for `msg` as a contiguous byte vector.
pub fn encode_frame(msg: &Msg) -> Vec<u8> {
    let mut out = BytesMut::with_capacity(encoded_frame_len(msg));
    encode_frame_into(msg, &mut out);
    out.to_vec()
}
