//! Command channel: one request, one reply, one at a time
//!
//! A round trip encodes the command, writes it completely, then reads exactly
//! one reply of the shape the command expects. The whole exchange runs under
//! the channel's per-command timeout.
//!
//! The channel keeps an in-flight marker that is set before the first byte is
//! written and cleared once the reply has been read in full. If the exchange
//! is abandoned half way (timeout, cancelled future, framing error inside a
//! list) the marker stays set and [`CommandChannel::is_healthy`] reports
//! `false`: the peer may be in the middle of a reply we will never read, so
//! the socket has to be replaced before the next command.

use crate::codec::{LINE_END, decode_line, encode};
use crate::command::{Command, Expect};
use crate::error::{NutError, NutResult};
use crate::list::ListDecoder;
use crate::response::Response;
use bytes::{Bytes, BytesMut};
use nut_core::mapper::{ErrorReply, map_error_reply};
use nut_transport::TransportLayer;
use std::time::Duration;

/// Longest reply line accepted before the stream is considered corrupt
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

const READ_CHUNK: usize = 4096;

/// Serialized request/response channel over one transport
#[derive(Debug)]
pub struct CommandChannel<T: TransportLayer> {
    transport: T,
    buffer: BytesMut,
    timeout: Duration,
    max_line_length: usize,
    in_flight: bool,
}

impl<T: TransportLayer> CommandChannel<T> {
    /// Create a channel over a (not yet opened) transport
    ///
    /// # Arguments
    /// * `transport` - The byte stream to talk over
    /// * `timeout` - Bound on writing a command and reading its whole reply
    pub fn new(transport: T, timeout: Duration) -> Self {
        Self {
            transport,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            timeout,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            in_flight: false,
        }
    }

    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Whether the next command can be written on the current socket
    pub fn is_healthy(&self) -> bool {
        !self.in_flight && !self.transport.is_closed()
    }

    /// Open the transport, discarding any state of a previous socket
    pub async fn open(&mut self) -> NutResult<()> {
        self.reset();
        self.transport.open().await
    }

    /// Close the transport
    pub async fn close(&mut self) -> NutResult<()> {
        self.reset();
        self.transport.close().await
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.in_flight = false;
    }

    /// Send one command and read its reply
    ///
    /// # Errors
    /// - `NutError::Timeout` if the exchange does not finish within the timeout
    /// - `NutError::Connection` on socket failure or premature end of stream
    /// - the mapped error kind if upsd answers with `ERR`
    /// - `NutError::Protocol` on malformed framing
    pub async fn round_trip(&mut self, command: &Command) -> NutResult<Response> {
        if self.in_flight {
            return Err(NutError::Connection(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "previous command did not complete",
            )));
        }

        let timeout = self.timeout;
        match tokio::time::timeout(timeout, self.exchange(command)).await {
            Ok(result) => result,
            Err(_) => {
                log::debug!("`{}` timed out after {:?}", command, timeout);
                Err(NutError::Timeout(timeout))
            }
        }
    }

    async fn exchange(&mut self, command: &Command) -> NutResult<Response> {
        let request = encode(command)?;
        self.in_flight = true;
        log::debug!("-> {}", command);
        self.transport.write_all(&request).await?;
        self.transport.flush().await?;

        match command.expect() {
            Expect::Line => {
                let line = self.read_line().await?;
                self.in_flight = false;
                let raw = String::from_utf8_lossy(&line).into_owned();
                log::debug!("<- {}", raw.trim_end());
                let fields = decode_line(&line)?;
                if let Some(reply) = ErrorReply::from_fields(&fields) {
                    return Err(map_error_reply(&reply, &command.to_string()));
                }
                Ok(Response::Line { fields, raw })
            }
            Expect::List => {
                let mut decoder = ListDecoder::new(command.to_string());
                loop {
                    let line = self.read_line().await?;
                    match decoder.push_line(&line) {
                        Ok(Some(reply)) => {
                            self.in_flight = false;
                            log::debug!("<- list {} ({} rows)", reply.subject.join(" "), reply.rows.len());
                            return Ok(Response::List(reply));
                        }
                        Ok(None) => {}
                        Err(e) => {
                            // A rejected first line is the whole reply; later lines leave the rest unread
                            if !decoder.started() {
                                self.in_flight = false;
                            }
                            return Err(e);
                        }
                    }
                }
            }
        }
    }

    async fn read_line(&mut self) -> NutResult<Bytes> {
        loop {
            let complete = self.buffer.iter().position(|b| *b == LINE_END);
            let length = complete.map_or(self.buffer.len(), |pos| pos + 1);
            if length > self.max_line_length {
                return Err(NutError::Protocol(format!(
                    "reply line exceeds {} bytes",
                    self.max_line_length
                )));
            }
            if let Some(pos) = complete {
                return Ok(self.buffer.split_to(pos + 1).freeze());
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = self.transport.read(&mut chunk).await?;
            if n == 0 {
                return Err(NutError::Connection(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed by peer",
                )));
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use tokio_test::io::{Builder, Mock};

    fn channel(mock: Mock) -> CommandChannel<ScriptedTransport> {
        let mut transport = ScriptedTransport::new(vec![mock]);
        transport.open_now();
        CommandChannel::new(transport, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_single_line_round_trip() {
        let mock = Builder::new()
            .write(b"GET VAR ups1 battery.charge\n")
            .read(b"VAR ups1 battery.charge \"100\"\n")
            .build();
        let mut channel = channel(mock);

        let response = channel
            .round_trip(&Command::get_var("ups1", "battery.charge"))
            .await
            .unwrap();
        assert_eq!(
            response.into_fields().unwrap(),
            ["VAR", "ups1", "battery.charge", "100"]
        );
        assert!(channel.is_healthy());
    }

    #[tokio::test]
    async fn test_list_split_across_reads() {
        let mock = Builder::new()
            .write(b"LIST UPS\n")
            .read(b"BEGIN LIST UPS\nUPS ups1 \"Main\"\nUP")
            .read(b"S ups2 \"Backup\"\nEND LIST UPS\n")
            .build();
        let mut channel = channel(mock);

        let list = channel
            .round_trip(&Command::list_ups())
            .await
            .unwrap()
            .into_list()
            .unwrap();
        assert_eq!(list.rows, [["UPS", "ups1", "Main"], ["UPS", "ups2", "Backup"]]);
        assert!(channel.is_healthy());
    }

    #[tokio::test]
    async fn test_error_reply_keeps_channel_healthy() {
        let mock = Builder::new()
            .write(b"LIST VAR ups9\n")
            .read(b"ERR UNKNOWN-UPS\n")
            .write(b"GET VAR ups9 ups.status\n")
            .read(b"ERR UNKNOWN-UPS\n")
            .build();
        let mut channel = channel(mock);

        let err = channel.round_trip(&Command::list_var("ups9")).await.unwrap_err();
        assert!(matches!(err, NutError::NotFound(_)));
        assert!(channel.is_healthy());

        let err = channel
            .round_trip(&Command::get_var("ups9", "ups.status"))
            .await
            .unwrap_err();
        assert!(matches!(err, NutError::NotFound(_)));
        assert!(channel.is_healthy());
    }

    #[tokio::test]
    async fn test_reset_is_transport_failure() {
        let mock = Builder::new()
            .write(b"LIST UPS\n")
            .read(b"BEGIN LIST UPS\n")
            .read_error(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            ))
            .build();
        let mut channel = channel(mock);

        let err = channel.round_trip(&Command::list_ups()).await.unwrap_err();
        assert!(err.is_transport());
        assert!(!channel.is_healthy());

        let err = channel.round_trip(&Command::list_ups()).await.unwrap_err();
        assert!(matches!(err, NutError::Connection(_)));
    }

    #[tokio::test]
    async fn test_end_of_stream_is_transport_failure() {
        let mock = Builder::new().write(b"VER\n").build();
        let mut channel = channel(mock);

        let err = channel.round_trip(&Command::ver()).await.unwrap_err();
        match err {
            NutError::Connection(e) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!channel.is_healthy());
    }

    #[tokio::test]
    async fn test_mismatched_list_poisons_channel() {
        let first = Builder::new()
            .write(b"LIST CMD ups1\n")
            .read(b"BEGIN LIST CMD ups1\nEND LIST CMD ups2\n")
            .build();
        let second = Builder::new().build();
        let mut transport = ScriptedTransport::new(vec![first, second]);
        transport.open_now();
        let mut channel = CommandChannel::new(transport, Duration::from_secs(5));

        let err = channel.round_trip(&Command::list_cmd("ups1")).await.unwrap_err();
        assert!(matches!(err, NutError::Protocol(_)));
        assert!(!channel.is_healthy());

        channel.close().await.unwrap();
        channel.open().await.unwrap();
        assert!(channel.is_healthy());
    }

    #[tokio::test]
    async fn test_overlong_complete_line_is_rejected() {
        let mock = Builder::new()
            .write(b"VER\n")
            .read(b"0123456789abcdef0123456789\n")
            .build();
        let mut channel = channel(mock).with_max_line_length(16);

        let err = channel.round_trip(&Command::ver()).await.unwrap_err();
        assert!(matches!(err, NutError::Protocol(_)));
        assert!(!channel.is_healthy());
    }

    #[tokio::test]
    async fn test_line_at_limit_is_accepted() {
        let mock = Builder::new().write(b"VER\n").read(b"1.3\n").build();
        let mut channel = channel(mock).with_max_line_length(4);

        let fields = channel.round_trip(&Command::ver()).await.unwrap().into_fields().unwrap();
        assert_eq!(fields, ["1.3"]);
    }

    #[tokio::test]
    async fn test_unencodable_command_writes_nothing() {
        let mock = Builder::new()
            .write(b"GET VAR ups1 ups.status\n")
            .read(b"VAR ups1 ups.status \"OL\"\n")
            .build();
        let mut channel = channel(mock);

        let err = channel
            .round_trip(&Command::instcmd("ups1", "beeper.toggle", Some("x\nVER")))
            .await
            .unwrap_err();
        assert!(matches!(err, NutError::Protocol(_)));
        assert!(channel.is_healthy());

        let response = channel
            .round_trip(&Command::get_var("ups1", "ups.status"))
            .await
            .unwrap();
        assert_eq!(response.into_fields().unwrap()[3], "OL");
    }

    #[tokio::test]
    async fn test_overlong_line_is_rejected() {
        let mock = Builder::new()
            .write(b"VER\n")
            .read(b"0123456789abcdef0123456789")
            .build();
        let mut channel = channel(mock).with_max_line_length(16);

        let err = channel.round_trip(&Command::ver()).await.unwrap_err();
        assert!(matches!(err, NutError::Protocol(_)));
        assert!(!channel.is_healthy());
    }
}
