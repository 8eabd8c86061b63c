//! PLAIN security mechanism, client side.
//!
//! Drives the four-step exchange that authenticates a session with a
//! cleartext username and password:
//!
//! ```text
//! SendingHello --produce HELLO-->       AwaitingWelcome
//! AwaitingWelcome --WELCOME-->          SendingInitiate
//! SendingInitiate --produce INITIATE--> AwaitingReady
//! AwaitingReady --READY-->              Ready
//! AwaitingWelcome / AwaitingReady --ERROR--> ErrorReceived
//! ```
//!
//! `Ready` and `ErrorReceived` are absorbing. Every command begins with
//! a length-prefixed ASCII name (`\x05HELLO`, `\x07WELCOME`, ...).

use super::metadata;
use super::{HandshakeEventSink, HandshakeFailure, MechanismStatus};
use crate::error::{Result, ZmtpError};
use crate::msg::Msg;
use crate::protocol::flags;

const HELLO_PREFIX: &[u8] = b"\x05HELLO";
const WELCOME_PREFIX: &[u8] = b"\x07WELCOME";
const INITIATE_PREFIX: &[u8] = b"\x08INITIATE";
const READY_PREFIX: &[u8] = b"\x05READY";
const ERROR_PREFIX: &[u8] = b"\x05ERROR";

/// Credentials and metadata for a PLAIN client.
#[derive(Debug, Clone)]
pub struct PlainConfig {
    username: String,
    password: String,
    socket_type: String,
}

impl PlainConfig {
    /// Create a configuration, rejecting credentials the wire format
    /// cannot carry (either longer than 255 bytes).
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let username = username.into();
        let password = password.into();
        if username.len() > 255 || password.len() > 255 {
            return Err(ZmtpError::CredentialTooLong);
        }
        Ok(Self {
            username,
            password,
            socket_type: "DEALER".to_string(),
        })
    }

    /// Set the Socket-Type property announced in INITIATE.
    pub fn with_socket_type(mut self, socket_type: impl Into<String>) -> Self {
        self.socket_type = socket_type.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    SendingHello,
    AwaitingWelcome,
    SendingInitiate,
    AwaitingReady,
    Ready,
    ErrorReceived,
}

/// Client side of the PLAIN handshake.
pub struct PlainClient {
    config: PlainConfig,
    endpoint: String,
    state: State,
    peer_properties: Vec<(String, Vec<u8>)>,
    error_reason: Option<String>,
}

impl PlainClient {
    /// Create a client for one session; `endpoint` is only used when
    /// reporting failures.
    pub fn new(config: PlainConfig, endpoint: impl Into<String>) -> Self {
        Self {
            config,
            endpoint: endpoint.into(),
            state: State::SendingHello,
            peer_properties: Vec::new(),
            error_reason: None,
        }
    }

    /// Produce the next outbound command, advancing the state machine.
    ///
    /// Returns [`ZmtpError::WouldBlock`] when the mechanism is waiting
    /// on the peer instead; retry after the next inbound command has
    /// been processed.
    pub fn next_handshake_command(&mut self) -> Result<Msg> {
        match self.state {
            State::SendingHello => {
                let msg = self.produce_hello();
                self.state = State::AwaitingWelcome;
                Ok(msg)
            }
            State::SendingInitiate => {
                let msg = self.produce_initiate();
                self.state = State::AwaitingReady;
                Ok(msg)
            }
            _ => Err(ZmtpError::WouldBlock),
        }
    }

    /// Process one inbound command.
    ///
    /// On success the message is reset to empty so the session can
    /// reuse it. On failure the error is also reported to `events`,
    /// once.
    pub fn process_handshake_command(
        &mut self,
        msg: &mut Msg,
        events: &mut dyn HandshakeEventSink,
    ) -> Result<()> {
        let data = msg.data();
        let result = if data.len() >= 8 && &data[..8] == WELCOME_PREFIX {
            self.process_welcome(data, events)
        } else if data.len() >= 6 && &data[..6] == READY_PREFIX {
            self.process_ready(data, events)
        } else if data.len() >= 6 && &data[..6] == ERROR_PREFIX {
            self.process_error(data, events)
        } else {
            self.fail(events, HandshakeFailure::UnexpectedCommand)
        };

        if result.is_ok() {
            msg.reset();
        }
        result
    }

    /// Current standing of the handshake.
    pub fn status(&self) -> MechanismStatus {
        match self.state {
            State::Ready => MechanismStatus::Ready,
            State::ErrorReceived => MechanismStatus::Error,
            _ => MechanismStatus::Handshaking,
        }
    }

    /// Properties the peer announced in READY.
    pub fn peer_properties(&self) -> &[(String, Vec<u8>)] {
        &self.peer_properties
    }

    /// Reason carried by the peer's ERROR command, if one arrived.
    pub fn error_reason(&self) -> Option<&str> {
        self.error_reason.as_deref()
    }

    fn produce_hello(&self) -> Msg {
        let username = self.config.username.as_bytes();
        let password = self.config.password.as_bytes();
        debug_assert!(username.len() < 256 && password.len() < 256);

        let mut body =
            Vec::with_capacity(HELLO_PREFIX.len() + 1 + username.len() + 1 + password.len());
        body.extend_from_slice(HELLO_PREFIX);
        body.push(username.len() as u8);
        body.extend_from_slice(username);
        body.push(password.len() as u8);
        body.extend_from_slice(password);

        let mut msg = Msg::from_vec(body);
        msg.set_flags(flags::COMMAND);
        msg
    }

    fn produce_initiate(&self) -> Msg {
        let body = metadata::encode_command(
            INITIATE_PREFIX,
            &[("Socket-Type", self.config.socket_type.as_bytes())],
        );
        let mut msg = Msg::from_vec(body);
        msg.set_flags(flags::COMMAND);
        msg
    }

    fn process_welcome(
        &mut self,
        data: &[u8],
        events: &mut dyn HandshakeEventSink,
    ) -> Result<()> {
        if self.state != State::AwaitingWelcome {
            return self.fail(events, HandshakeFailure::UnexpectedCommand);
        }
        if data.len() != 8 {
            return self.fail(events, HandshakeFailure::MalformedWelcome);
        }
        self.state = State::SendingInitiate;
        Ok(())
    }

    fn process_ready(&mut self, data: &[u8], events: &mut dyn HandshakeEventSink) -> Result<()> {
        if self.state != State::AwaitingReady {
            return self.fail(events, HandshakeFailure::UnexpectedCommand);
        }
        match metadata::parse_properties(&data[READY_PREFIX.len()..]) {
            Ok(properties) => {
                self.peer_properties = properties;
                self.state = State::Ready;
                Ok(())
            }
            Err(_) => self.fail(events, HandshakeFailure::InvalidMetadata),
        }
    }

    fn process_error(&mut self, data: &[u8], events: &mut dyn HandshakeEventSink) -> Result<()> {
        if self.state != State::AwaitingWelcome && self.state != State::AwaitingReady {
            return self.fail(events, HandshakeFailure::UnexpectedCommand);
        }
        // Body is `u8 reason_len, reason[reason_len]` after the name.
        if data.len() < 7 {
            return self.fail(events, HandshakeFailure::MalformedError);
        }
        let reason_len = data[6] as usize;
        if reason_len > data.len() - 7 {
            return self.fail(events, HandshakeFailure::MalformedError);
        }
        let reason = String::from_utf8_lossy(&data[7..7 + reason_len]).into_owned();
        self.error_reason = Some(reason);
        self.state = State::ErrorReceived;
        Ok(())
    }

    fn fail(&self, events: &mut dyn HandshakeEventSink, failure: HandshakeFailure) -> Result<()> {
        events.report_handshake_failure(&self.endpoint, failure);
        Err(match failure {
            HandshakeFailure::UnexpectedCommand => ZmtpError::UnexpectedCommand,
            HandshakeFailure::MalformedWelcome => ZmtpError::MalformedWelcome,
            HandshakeFailure::MalformedError => ZmtpError::MalformedError,
            HandshakeFailure::InvalidMetadata => ZmtpError::InvalidMetadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        failures: Vec<(String, HandshakeFailure)>,
    }

    impl HandshakeEventSink for RecordingSink {
        fn report_handshake_failure(&mut self, endpoint: &str, failure: HandshakeFailure) {
            self.failures.push((endpoint.to_string(), failure));
        }
    }

    fn client(username: &str, password: &str) -> PlainClient {
        let config = PlainConfig::new(username, password).unwrap();
        PlainClient::new(config, "tcp://127.0.0.1:5555")
    }

    fn command(body: &[u8]) -> Msg {
        let mut msg = Msg::from_vec(body.to_vec());
        msg.set_flags(flags::COMMAND);
        msg
    }

    #[test]
    fn test_hello_wire_format() {
        let mut client = client("u", "p");
        let msg = client.next_handshake_command().unwrap();

        assert!(msg.is_command());
        assert_eq!(
            msg.data(),
            &[0x05, 0x48, 0x45, 0x4c, 0x4c, 0x4f, 0x01, 0x75, 0x01, 0x70]
        );
        assert_eq!(client.status(), MechanismStatus::Handshaking);
    }

    #[test]
    fn test_full_handshake_reaches_ready() {
        let mut client = client("admin", "secret");
        let mut sink = RecordingSink::default();

        let hello = client.next_handshake_command().unwrap();
        assert!(hello.data().starts_with(b"\x05HELLO"));

        // Waiting on WELCOME: nothing to transmit.
        assert!(matches!(
            client.next_handshake_command(),
            Err(ZmtpError::WouldBlock)
        ));

        let mut welcome = command(b"\x07WELCOME");
        client
            .process_handshake_command(&mut welcome, &mut sink)
            .unwrap();
        assert_eq!(welcome.size(), 0);

        let initiate = client.next_handshake_command().unwrap();
        assert!(initiate.data().starts_with(b"\x08INITIATE"));
        let props = metadata::parse_properties(&initiate.data()[9..]).unwrap();
        assert_eq!(props[0].0, "Socket-Type");
        assert_eq!(props[0].1, b"DEALER");

        let mut ready_body = READY_PREFIX.to_vec();
        metadata::append_property(&mut ready_body, "Socket-Type", b"ROUTER");
        let mut ready = command(&ready_body);
        client
            .process_handshake_command(&mut ready, &mut sink)
            .unwrap();

        assert_eq!(client.status(), MechanismStatus::Ready);
        assert_eq!(
            client.peer_properties(),
            &[("Socket-Type".to_string(), b"ROUTER".to_vec())]
        );
        assert!(sink.failures.is_empty());
    }

    #[test]
    fn test_welcome_must_be_exactly_eight_bytes() {
        let mut client = client("u", "p");
        let mut sink = RecordingSink::default();
        client.next_handshake_command().unwrap();

        let mut bloated = command(b"\x07WELCOME!");
        let err = client
            .process_handshake_command(&mut bloated, &mut sink)
            .unwrap_err();

        assert!(matches!(err, ZmtpError::MalformedWelcome));
        assert_eq!(
            sink.failures,
            vec![(
                "tcp://127.0.0.1:5555".to_string(),
                HandshakeFailure::MalformedWelcome
            )]
        );
        // The rejected command is left for the caller to inspect.
        assert_eq!(bloated.size(), 9);
    }

    #[test]
    fn test_error_command_records_reason() {
        let mut client = client("u", "p");
        let mut sink = RecordingSink::default();
        client.next_handshake_command().unwrap();

        let mut refusal = command(&[0x05, 0x45, 0x52, 0x52, 0x4f, 0x52, 0x03, 0x62, 0x61, 0x64]);
        client
            .process_handshake_command(&mut refusal, &mut sink)
            .unwrap();

        assert_eq!(client.status(), MechanismStatus::Error);
        assert_eq!(client.error_reason(), Some("bad"));
        // Absorbing: no further command will be produced.
        assert!(matches!(
            client.next_handshake_command(),
            Err(ZmtpError::WouldBlock)
        ));
    }

    #[test]
    fn test_error_after_initiate_also_absorbs() {
        let mut client = client("u", "p");
        let mut sink = RecordingSink::default();
        client.next_handshake_command().unwrap();
        let mut welcome = command(b"\x07WELCOME");
        client
            .process_handshake_command(&mut welcome, &mut sink)
            .unwrap();
        client.next_handshake_command().unwrap();

        let mut refusal = command(b"\x05ERROR\x06denied");
        client
            .process_handshake_command(&mut refusal, &mut sink)
            .unwrap();
        assert_eq!(client.status(), MechanismStatus::Error);
        assert_eq!(client.error_reason(), Some("denied"));
    }

    #[test]
    fn test_truncated_error_reason_rejected() {
        let mut client = client("u", "p");
        let mut sink = RecordingSink::default();
        client.next_handshake_command().unwrap();

        // Declares a 10-byte reason but carries 3.
        let mut refusal = command(b"\x05ERROR\x0abad");
        let err = client
            .process_handshake_command(&mut refusal, &mut sink)
            .unwrap_err();
        assert!(matches!(err, ZmtpError::MalformedError));

        // Missing the reason length byte entirely.
        let mut headless = command(b"\x05ERROR");
        let err = client
            .process_handshake_command(&mut headless, &mut sink)
            .unwrap_err();
        assert!(matches!(err, ZmtpError::MalformedError));
    }

    #[test]
    fn test_ready_before_initiate_is_unexpected() {
        let mut client = client("u", "p");
        let mut sink = RecordingSink::default();
        client.next_handshake_command().unwrap();

        let mut ready = command(b"\x05READY");
        let err = client
            .process_handshake_command(&mut ready, &mut sink)
            .unwrap_err();

        assert!(matches!(err, ZmtpError::UnexpectedCommand));
        assert_eq!(
            sink.failures,
            vec![(
                "tcp://127.0.0.1:5555".to_string(),
                HandshakeFailure::UnexpectedCommand
            )]
        );
    }

    #[test]
    fn test_unknown_command_name_is_unexpected() {
        let mut client = client("u", "p");
        let mut sink = RecordingSink::default();
        client.next_handshake_command().unwrap();

        let mut bogus = command(b"\x07GOODBYE");
        let err = client
            .process_handshake_command(&mut bogus, &mut sink)
            .unwrap_err();
        assert!(matches!(err, ZmtpError::UnexpectedCommand));
    }

    #[test]
    fn test_ready_with_garbage_metadata() {
        let mut client = client("u", "p");
        let mut sink = RecordingSink::default();
        client.next_handshake_command().unwrap();
        let mut welcome = command(b"\x07WELCOME");
        client
            .process_handshake_command(&mut welcome, &mut sink)
            .unwrap();
        client.next_handshake_command().unwrap();

        let mut ready = command(b"\x05READY\xffjunk");
        let err = client
            .process_handshake_command(&mut ready, &mut sink)
            .unwrap_err();

        assert!(matches!(err, ZmtpError::InvalidMetadata));
        assert_eq!(sink.failures.len(), 1);
        assert_eq!(sink.failures[0].1, HandshakeFailure::InvalidMetadata);
    }

    #[test]
    fn test_credential_length_limits() {
        let long = "x".repeat(255);
        assert!(PlainConfig::new(long.clone(), long.clone()).is_ok());

        let too_long = "x".repeat(256);
        assert!(matches!(
            PlainConfig::new(too_long.clone(), "p"),
            Err(ZmtpError::CredentialTooLong)
        ));
        assert!(matches!(
            PlainConfig::new("u", too_long),
            Err(ZmtpError::CredentialTooLong)
        ));
    }

    #[test]
    fn test_255_byte_credentials_fit_the_wire() {
        let user = "u".repeat(255);
        let pass = "p".repeat(255);
        let mut client = client(&user, &pass);

        let hello = client.next_handshake_command().unwrap();
        let data = hello.data();
        assert_eq!(data.len(), 6 + 1 + 255 + 1 + 255);
        assert_eq!(data[6], 255);
        assert_eq!(data[6 + 1 + 255], 255);
    }

    #[test]
    fn test_socket_type_override() {
        let config = PlainConfig::new("u", "p")
            .unwrap()
            .with_socket_type("SUB");
        let mut client = PlainClient::new(config, "inproc://test");
        client.next_handshake_command().unwrap();
        let mut welcome = command(b"\x07WELCOME");
        let mut sink = RecordingSink::default();
        client
            .process_handshake_command(&mut welcome, &mut sink)
            .unwrap();

        let initiate = client.next_handshake_command().unwrap();
        let props = metadata::parse_properties(&initiate.data()[9..]).unwrap();
        assert_eq!(props, vec![("Socket-Type".to_string(), b"SUB".to_vec())]);
    }
}
