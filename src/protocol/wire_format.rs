//! Wire format constants for ZMTP v2 framing.
//!
//! Each frame on the wire is:
//! ```text
//! ┌───────┬──────────────────┬───────────┐
//! │ Flags │ Size             │ Payload   │
//! │ 1 byte│ 1 byte, or 8 if  │ size bytes│
//! │       │ LARGE (u64 BE)   │           │
//! └───────┴──────────────────┴───────────┘
//! ```
//!
//! The size header is one byte unless the LARGE flag is set, in which
//! case it is an eight-byte big-endian unsigned integer. Flag bits other
//! than the three named ones are ignored on input.

/// Largest payload that fits the one-byte size header.
pub const MAX_SHORT_SIZE: usize = 255;

/// Length of the long (LARGE) size header in bytes.
pub const LONG_SIZE_BYTES: usize = 8;

/// Default receive buffer size for the decoder arena.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Flag constants for the frame flags byte.
///
/// The MORE and COMMAND bits double as message flags: a decoded
/// [`Msg`](crate::Msg) carries them with the same values, while LARGE
/// only ever describes the size header and is never stored on a message.
pub mod flags {
    /// More frames of the same logical message follow.
    pub const MORE: u8 = 0b0000_0001;
    /// The size header is eight bytes.
    pub const LARGE: u8 = 0b0000_0010;
    /// The frame is a protocol command, not application data.
    pub const COMMAND: u8 = 0b0000_0100;

    /// Check if a specific flag is set.
    #[inline]
    pub fn has_flag(flags: u8, flag: u8) -> bool {
        flags & flag != 0
    }
}
