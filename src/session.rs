//! Session driver: pumps bytes between a stream and the engine.
//!
//! A [`Session`] owns the stream, a framing decoder and a PLAIN
//! mechanism. [`Session::handshake`] alternates between producing
//! mechanism commands and processing the peer's until the mechanism is
//! ready or has failed; after that, [`Session::send`] and
//! [`Session::recv`] carry application messages.
//!
//! The decoder and mechanism never block and never log; all waiting
//! happens here, on stream readiness, and failures are logged here
//! before being returned.
//!
//! # Example
//!
//! ```ignore
//! use zmtp_engine::{PlainConfig, Session};
//!
//! let config = PlainConfig::new("admin", "secret")?;
//! let mut session = Session::connect_tcp("127.0.0.1:5555", config).await?;
//! session.handshake().await?;
//! session.send(&zmtp_engine::Msg::from_vec(b"hi".to_vec())).await?;
//! ```

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{Result, ZmtpError};
use crate::mechanism::{HandshakeEventSink, HandshakeFailure, MechanismStatus, PlainClient, PlainConfig};
use crate::msg::Msg;
use crate::protocol::{encode_frame_into, encoded_frame_len, DecodeStatus, V2Decoder, DEFAULT_BUFFER_SIZE};

/// Records handshake failures and forwards them to the log.
#[derive(Debug, Default)]
struct FailureLog {
    failures: Vec<(String, HandshakeFailure)>,
}

impl HandshakeEventSink for FailureLog {
    fn report_handshake_failure(&mut self, endpoint: &str, failure: HandshakeFailure) {
        tracing::warn!(endpoint, ?failure, "handshake command rejected");
        self.failures.push((endpoint.to_string(), failure));
    }
}

/// One authenticated connection in the making.
pub struct Session<S> {
    stream: S,
    decoder: V2Decoder,
    mechanism: PlainClient,
    events: FailureLog,
    out: BytesMut,
}

impl Session<TcpStream> {
    /// Connect over TCP and set up a session for `addr`.
    pub async fn connect_tcp(addr: &str, config: PlainConfig) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        tracing::debug!(addr, "connected");
        Ok(Self::new(stream, config, format!("tcp://{addr}")))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Session<S> {
    /// Wrap an established stream. `endpoint` names the peer in
    /// failure events and logs.
    pub fn new(stream: S, config: PlainConfig, endpoint: impl Into<String>) -> Self {
        let decoder = V2Decoder::new(DEFAULT_BUFFER_SIZE, None, true);
        Self::with_decoder(stream, config, endpoint, decoder)
    }

    /// Wrap an established stream with a custom-configured decoder
    /// (buffer size, message size limit, zero-copy policy).
    pub fn with_decoder(
        stream: S,
        config: PlainConfig,
        endpoint: impl Into<String>,
        decoder: V2Decoder,
    ) -> Self {
        let endpoint = endpoint.into();
        Self {
            stream,
            decoder,
            mechanism: PlainClient::new(config, endpoint),
            events: FailureLog::default(),
            out: BytesMut::new(),
        }
    }

    /// Run the PLAIN handshake to completion.
    ///
    /// Returns once the mechanism is ready, or with
    /// [`ZmtpError::HandshakeRefused`] when the peer answers with an
    /// ERROR command, or with the specific protocol error when a
    /// command is rejected.
    pub async fn handshake(&mut self) -> Result<()> {
        loop {
            match self.mechanism.status() {
                MechanismStatus::Ready => {
                    tracing::debug!("handshake complete");
                    return Ok(());
                }
                MechanismStatus::Error => {
                    let reason = self.mechanism.error_reason().unwrap_or("").to_string();
                    return Err(ZmtpError::HandshakeRefused(reason));
                }
                MechanismStatus::Handshaking => {}
            }

            match self.mechanism.next_handshake_command() {
                Ok(msg) => self.write_msg(&msg).await?,
                Err(ZmtpError::WouldBlock) => {
                    let mut msg = self.read_msg().await?;
                    if !msg.is_command() {
                        return Err(ZmtpError::Protocol(
                            "data frame received during handshake".to_string(),
                        ));
                    }
                    self.mechanism
                        .process_handshake_command(&mut msg, &mut self.events)?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Mechanism standing; `Ready` once [`handshake`](Self::handshake)
    /// has succeeded.
    pub fn status(&self) -> MechanismStatus {
        self.mechanism.status()
    }

    /// Properties the peer announced in its READY command.
    pub fn peer_properties(&self) -> &[(String, Vec<u8>)] {
        self.mechanism.peer_properties()
    }

    /// Handshake failures reported so far.
    pub fn handshake_failures(&self) -> &[(String, HandshakeFailure)] {
        &self.events.failures
    }

    /// Send one application message.
    pub async fn send(&mut self, msg: &Msg) -> Result<()> {
        self.write_msg(msg).await
    }

    /// Receive the next message, in wire order.
    pub async fn recv(&mut self) -> Result<Msg> {
        self.read_msg().await
    }

    async fn write_msg(&mut self, msg: &Msg) -> Result<()> {
        self.out.clear();
        self.out.reserve(encoded_frame_len(msg));
        encode_frame_into(msg, &mut self.out);
        self.stream.write_all(&self.out).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn read_msg(&mut self) -> Result<Msg> {
        loop {
            match self.decoder.decode_next()? {
                DecodeStatus::MessageReady(msg) => return Ok(msg),
                DecodeStatus::NeedMore => {
                    let region = self.decoder.writable();
                    let n = self.stream.read(region).await?;
                    self.decoder.commit(n);
                    if n == 0 {
                        return Err(ZmtpError::ConnectionClosed);
                    }
                }
            }
        }
    }
}
