//! Message type produced and consumed by the engine.
//!
//! A [`Msg`] is the in-memory form of one frame: its payload plus the
//! MORE and COMMAND flag bits. The payload is either *owned* (an
//! exclusive allocation) or *shared* (a `bytes::Bytes` view into the
//! decoder's receive arena, holding one reference on it). Dropping or
//! resetting a shared message releases its arena reference.
//!
//! # Example
//!
//! ```
//! use zmtp_engine::{protocol::flags, Msg};
//!
//! let mut msg = Msg::from_vec(b"hello".to_vec());
//! msg.set_flags(flags::MORE);
//!
//! assert_eq!(msg.data(), b"hello");
//! assert!(msg.has_more());
//! assert!(!msg.is_command());
//! ```

use bytes::Bytes;

use crate::protocol::flags;

/// Payload storage for a message.
#[derive(Debug, Clone)]
enum Payload {
    /// No payload bytes.
    Empty,
    /// Exclusive allocation of exactly `len` bytes.
    Owned(Vec<u8>),
    /// View into a shared receive arena.
    Shared(Bytes),
}

/// One decoded or to-be-encoded frame.
#[derive(Debug, Clone)]
pub struct Msg {
    flags: u8,
    payload: Payload,
}

impl Msg {
    /// Create an empty message with no flags.
    pub fn new() -> Self {
        Self {
            flags: 0,
            payload: Payload::Empty,
        }
    }

    /// Create a message owning the given payload.
    pub fn from_vec(data: Vec<u8>) -> Self {
        if data.is_empty() {
            return Self::new();
        }
        Self {
            flags: 0,
            payload: Payload::Owned(data),
        }
    }

    /// Create a message sharing an already-counted buffer view.
    ///
    /// The message holds one reference on the underlying allocation
    /// until it is dropped or [`reset`](Self::reset).
    pub fn from_shared(data: Bytes) -> Self {
        if data.is_empty() {
            return Self::new();
        }
        Self {
            flags: 0,
            payload: Payload::Shared(data),
        }
    }

    /// Payload bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        match &self.payload {
            Payload::Empty => &[],
            Payload::Owned(v) => v,
            Payload::Shared(b) => b,
        }
    }

    /// Payload length in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.data().len()
    }

    /// Current flag bits (MORE and COMMAND).
    #[inline]
    pub fn flags(&self) -> u8 {
        self.flags
    }

    /// Set the given flag bits, keeping any already set.
    #[inline]
    pub fn set_flags(&mut self, flags: u8) {
        self.flags |= flags;
    }

    /// Whether further frames of the same logical message follow.
    #[inline]
    pub fn has_more(&self) -> bool {
        flags::has_flag(self.flags, flags::MORE)
    }

    /// Whether this frame is a protocol command.
    #[inline]
    pub fn is_command(&self) -> bool {
        flags::has_flag(self.flags, flags::COMMAND)
    }

    /// Whether the payload borrows the receive arena instead of owning
    /// its bytes.
    #[inline]
    pub fn is_zero_copy(&self) -> bool {
        matches!(self.payload, Payload::Shared(_))
    }

    /// Return the message to the empty state, releasing any shared
    /// arena reference.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for Msg {
    fn default() -> Self {
        Self::new()
    }
}
