//! Error types for zmtp-engine.

use thiserror::Error;

/// Main error type for all engine operations.
#[derive(Debug, Error)]
pub enum ZmtpError {
    /// I/O error on the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame size exceeds the configured or addressable maximum.
    #[error("message of {size} bytes exceeds the maximum of {limit} bytes")]
    MessageTooLarge { size: u64, limit: u64 },

    /// Payload allocation failed.
    #[error("failed to allocate {0} bytes for a message payload")]
    OutOfMemory(usize),

    /// A handshake command arrived in a state that does not accept it,
    /// or its name is unknown.
    #[error("handshake command received in an unexpected state")]
    UnexpectedCommand,

    /// WELCOME command with a body of the wrong length.
    #[error("WELCOME command must be exactly 8 bytes")]
    MalformedWelcome,

    /// ERROR command too short for its declared reason.
    #[error("ERROR command carries a truncated reason")]
    MalformedError,

    /// READY command metadata failed to parse.
    #[error("invalid metadata in READY command")]
    InvalidMetadata,

    /// The mechanism has nothing to transmit right now; retry after the
    /// peer's next command has been processed.
    #[error("no handshake command to produce in the current state")]
    WouldBlock,

    /// Username or password longer than the wire format can carry.
    #[error("credential exceeds 255 bytes")]
    CredentialTooLong,

    /// The peer answered the handshake with an ERROR command.
    #[error("handshake refused by peer: {0}")]
    HandshakeRefused(String),

    /// Connection closed by the peer.
    #[error("connection closed")]
    ConnectionClosed,

    /// Endpoint string could not be resolved.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Protocol violation outside the handshake command set.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Result type alias using ZmtpError.
pub type Result<T> = std::result::Result<T, ZmtpError>;
