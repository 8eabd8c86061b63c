//! Protocol module - wire format, framing decoder and encoder.
//!
//! This module implements ZMTP v2 framing:
//! - Wire flag bits and size header constants
//! - Streaming decoder with a refcounted receive arena
//! - Frame encoder

mod decoder;
mod encoder;
mod wire_format;

pub use decoder::{DecodeStatus, V2Decoder};
pub use encoder::{encode_frame, encode_frame_into, encoded_frame_len};
pub use wire_format::{flags, DEFAULT_BUFFER_SIZE, LONG_SIZE_BYTES, MAX_SHORT_SIZE};
