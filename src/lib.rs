//! # zmtp-engine
//!
//! ZMTP v2 framing engine with a PLAIN security mechanism client.
//!
//! The crate turns a byte stream into discrete messages and back, and
//! authenticates the connection before application traffic flows.
//!
//! ## Architecture
//!
//! - **Framing** ([`protocol`]): a streaming decoder driven by a small
//!   state machine over a refcounted receive arena, so payloads can be
//!   shared with the arena instead of copied, plus the matching
//!   encoder.
//! - **Security** ([`mechanism`]): the PLAIN client state machine that
//!   exchanges HELLO/WELCOME/INITIATE/READY commands.
//! - **Session** ([`Session`]): the async driver that owns the stream
//!   and pumps both of the above.
//!
//! The framing and mechanism layers are sans-io and single-threaded;
//! waiting is modeled by `NeedMore` and `WouldBlock` results that hand
//! control back to the driver.
//!
//! ## Example
//!
//! ```ignore
//! use zmtp_engine::{Msg, PlainConfig, Session};
//!
//! #[tokio::main]
//! async fn main() -> zmtp_engine::Result<()> {
//!     let config = PlainConfig::new("admin", "secret")?;
//!     let mut session = Session::connect_tcp("127.0.0.1:5555", config).await?;
//!     session.handshake().await?;
//!
//!     session.send(&Msg::from_vec(b"hello".to_vec())).await?;
//!     let reply = session.recv().await?;
//!     println!("{} bytes", reply.size());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod mechanism;
pub mod protocol;
pub mod transport;

mod msg;
mod session;

pub use error::{Result, ZmtpError};
pub use mechanism::{HandshakeEventSink, HandshakeFailure, MechanismStatus, PlainClient, PlainConfig};
pub use msg::Msg;
pub use protocol::{DecodeStatus, V2Decoder};
pub use session::Session;
pub use transport::UdpAddress;
