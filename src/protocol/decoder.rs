//! Streaming decoder for ZMTP v2 frames.
//!
//! The decoder owns the receive arena: the transport reads into the
//! region returned by [`V2Decoder::writable`], marks the read with
//! [`V2Decoder::commit`], then drains complete messages one at a time
//! with [`V2Decoder::decode_next`]. Partial frames are carried across
//! reads, so any chunking of the byte stream yields the same messages.
//!
//! The arena is a `BytesMut` allocation shared by reference counting.
//! In zero-copy mode, a payload that lies entirely inside the committed
//! window is handed out as a `Bytes` view of that allocation; the arena
//! is recycled once the decoder is again its only referent, and a fresh
//! allocation is made while shared payloads are still alive. A payload
//! that straddles reads is copied into an exclusive allocation instead,
//! so no view ever crosses an arena boundary.
//!
//! # Example
//!
//! ```
//! use zmtp_engine::protocol::{DecodeStatus, V2Decoder};
//!
//! let mut decoder = V2Decoder::new(8192, None, true);
//! decoder.feed(&[0x00, 0x05, b'H', b'e', b'l', b'l', b'o']);
//!
//! match decoder.decode_next().unwrap() {
//!     DecodeStatus::MessageReady(msg) => assert_eq!(msg.data(), b"Hello"),
//!     DecodeStatus::NeedMore => unreachable!(),
//! }
//! ```

use bytes::{Buf, BytesMut};

use super::wire_format::{flags, LONG_SIZE_BYTES};
use crate::error::{Result, ZmtpError};
use crate::msg::Msg;

/// Outcome of one [`V2Decoder::decode_next`] call.
#[derive(Debug)]
pub enum DecodeStatus {
    /// All committed bytes were consumed without completing a message.
    NeedMore,
    /// A message was completed; call again for the next one.
    MessageReady(Msg),
}

/// Decoding stage. Each stage fixes how many bytes must be available
/// before the next transition.
#[derive(Debug)]
enum Stage {
    /// Awaiting the one-byte flags field.
    AwaitFlags,
    /// Awaiting the one-byte size header.
    AwaitShortSize,
    /// Awaiting the eight-byte big-endian size header.
    AwaitLongSize,
    /// Copying payload bytes into an owned allocation.
    AwaitPayload {
        data: Vec<u8>,
        flags: u8,
        remaining: usize,
    },
}

/// Streaming ZMTP v2 frame decoder with a refcounted receive arena.
pub struct V2Decoder {
    /// Receive arena; committed-but-unconsumed bytes live at the front.
    buf: BytesMut,
    stage: Stage,
    /// Flag bits decoded from the flags byte, applied on completion.
    pending_flags: u8,
    /// Upper bound on payload size, or `None` for unlimited.
    max_msg_size: Option<u64>,
    /// Whether payloads may borrow the arena instead of being copied.
    zero_copy: bool,
    /// Bytes requested from the arena per read.
    bufsize: usize,
    /// Arena length before the last `writable()` extension.
    pending_write: Option<usize>,
}

impl V2Decoder {
    /// Create a decoder.
    ///
    /// `bufsize` is the arena region handed to the transport per read,
    /// `max_msg_size` rejects oversized frames with
    /// [`ZmtpError::MessageTooLarge`] (`None` means unlimited), and
    /// `zero_copy` enables shared payloads borrowing the arena.
    pub fn new(bufsize: usize, max_msg_size: Option<u64>, zero_copy: bool) -> Self {
        Self {
            buf: BytesMut::with_capacity(bufsize),
            stage: Stage::AwaitFlags,
            pending_flags: 0,
            max_msg_size,
            zero_copy,
            bufsize,
            pending_write: None,
        }
    }

    /// Writable arena region for the transport to read into.
    ///
    /// Must be paired with [`commit`](Self::commit) before decoding.
    /// While previously produced shared payloads are still alive, this
    /// allocates a fresh arena rather than disturbing their bytes.
    pub fn writable(&mut self) -> &mut [u8] {
        if let Some(filled) = self.pending_write.take() {
            // writable() called again without commit(); undo the
            // previous extension first.
            self.buf.truncate(filled);
        }
        let filled = self.buf.len();
        self.buf.resize(filled + self.bufsize, 0);
        self.pending_write = Some(filled);
        &mut self.buf[filled..]
    }

    /// Mark `n` bytes of the region returned by
    /// [`writable`](Self::writable) as filled by the transport.
    pub fn commit(&mut self, n: usize) {
        let filled = match self.pending_write.take() {
            Some(filled) => filled,
            None => return,
        };
        assert!(n <= self.bufsize, "commit beyond the writable region");
        self.buf.truncate(filled + n);
    }

    /// Copy `data` into the arena, as if the transport had read it.
    pub fn feed(&mut self, data: &[u8]) {
        debug_assert!(
            self.pending_write.is_none(),
            "feed() between writable() and commit()"
        );
        self.buf.extend_from_slice(data);
    }

    /// Try to complete the next message from committed bytes.
    ///
    /// Returns [`DecodeStatus::NeedMore`] once everything committed has
    /// been consumed, or [`DecodeStatus::MessageReady`] with exactly one
    /// message; call again to continue. Errors are terminal for the
    /// current frame and never leave a partially built message behind;
    /// the caller decides whether to [`clear`](Self::clear) and resync
    /// or tear the session down.
    pub fn decode_next(&mut self) -> Result<DecodeStatus> {
        debug_assert!(
            self.pending_write.is_none(),
            "decode_next() between writable() and commit()"
        );
        loop {
            match self.stage {
                Stage::AwaitFlags => {
                    if self.buf.is_empty() {
                        return Ok(DecodeStatus::NeedMore);
                    }
                    let wire_flags = self.buf[0];
                    self.buf.advance(1);

                    self.pending_flags = 0;
                    if flags::has_flag(wire_flags, flags::MORE) {
                        self.pending_flags |= flags::MORE;
                    }
                    if flags::has_flag(wire_flags, flags::COMMAND) {
                        self.pending_flags |= flags::COMMAND;
                    }

                    self.stage = if flags::has_flag(wire_flags, flags::LARGE) {
                        Stage::AwaitLongSize
                    } else {
                        Stage::AwaitShortSize
                    };
                }

                Stage::AwaitShortSize => {
                    if self.buf.is_empty() {
                        return Ok(DecodeStatus::NeedMore);
                    }
                    let size = u64::from(self.buf[0]);
                    self.buf.advance(1);
                    if let Some(msg) = self.on_size(size)? {
                        return Ok(DecodeStatus::MessageReady(msg));
                    }
                }

                Stage::AwaitLongSize => {
                    if self.buf.len() < LONG_SIZE_BYTES {
                        return Ok(DecodeStatus::NeedMore);
                    }
                    let mut raw = [0u8; LONG_SIZE_BYTES];
                    raw.copy_from_slice(&self.buf[..LONG_SIZE_BYTES]);
                    self.buf.advance(LONG_SIZE_BYTES);
                    let size = u64::from_be_bytes(raw);
                    if let Some(msg) = self.on_size(size)? {
                        return Ok(DecodeStatus::MessageReady(msg));
                    }
                }

                Stage::AwaitPayload {
                    ref mut data,
                    flags,
                    ref mut remaining,
                } => {
                    let take = (*remaining).min(self.buf.len());
                    data.extend_from_slice(&self.buf[..take]);
                    self.buf.advance(take);
                    *remaining -= take;
                    if *remaining > 0 {
                        return Ok(DecodeStatus::NeedMore);
                    }

                    let data = std::mem::take(data);
                    self.stage = Stage::AwaitFlags;
                    let mut msg = Msg::from_vec(data);
                    msg.set_flags(flags);
                    return Ok(DecodeStatus::MessageReady(msg));
                }
            }
        }
    }

    /// Size header is complete; pick the payload strategy.
    ///
    /// Returns `Some(msg)` when the message completes immediately (empty
    /// payload, or a zero-copy view of bytes already in the arena).
    fn on_size(&mut self, msg_size: u64) -> Result<Option<Msg>> {
        if let Some(limit) = self.max_msg_size {
            if msg_size > limit {
                self.stage = Stage::AwaitFlags;
                return Err(ZmtpError::MessageTooLarge {
                    size: msg_size,
                    limit,
                });
            }
        }
        let size = usize::try_from(msg_size).map_err(|_| {
            self.stage = Stage::AwaitFlags;
            ZmtpError::MessageTooLarge {
                size: msg_size,
                limit: usize::MAX as u64,
            }
        })?;

        if size == 0 {
            self.stage = Stage::AwaitFlags;
            let mut msg = Msg::new();
            msg.set_flags(self.pending_flags);
            return Ok(Some(msg));
        }

        if self.zero_copy && self.buf.len() >= size {
            // The whole payload is already inside the arena window;
            // hand out a counted view and advance past it.
            let payload = self.buf.split_to(size).freeze();
            self.stage = Stage::AwaitFlags;
            let mut msg = Msg::from_shared(payload);
            msg.set_flags(self.pending_flags);
            return Ok(Some(msg));
        }

        // The payload straddles the arena window (or zero-copy is off):
        // copy it into an exclusive allocation as bytes arrive.
        let mut data = Vec::new();
        if data.try_reserve_exact(size).is_err() {
            self.stage = Stage::AwaitFlags;
            return Err(ZmtpError::OutOfMemory(size));
        }
        self.stage = Stage::AwaitPayload {
            data,
            flags: self.pending_flags,
            remaining: size,
        };
        Ok(None)
    }

    /// Drop buffered bytes and any frame in progress, returning to the
    /// initial stage.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.stage = Stage::AwaitFlags;
        self.pending_flags = 0;
        self.pending_write = None;
    }
}
