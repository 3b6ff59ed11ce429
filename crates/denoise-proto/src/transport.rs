//! Framed transports for the two sides of the relay.
//!
//! [`Transport`] speaks parsed [`Message`]s and is used toward the server.
//! [`LineTransport`] hands out raw byte lines and is used toward the
//! client, whose input is relayed without being decoded or re-serialized.
//!
//! Both read methods only await the underlying `Framed` stream, so they are
//! cancel-safe inside `tokio::select!`. A frame already sitting in the read
//! buffer is returned without touching the socket.

use bytes::{Bytes, BytesMut};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::warn;

use crate::error::ProtocolError;
use crate::irc::IrcCodec;
use crate::line::RawLineCodec;
use crate::message::Message;

/// Maximum accepted line length (tags included), per IRCv3 message-tags.
pub const MAX_IRC_LINE_LEN: usize = 8191;

/// Message-oriented transport.
pub struct Transport<S> {
    framed: Framed<S, IrcCodec>,
}

impl Transport<TcpStream> {
    /// Wrap a connected TCP stream, enabling keepalive where possible.
    pub fn tcp(stream: TcpStream) -> Self {
        if let Err(e) = enable_keepalive(&stream) {
            warn!("failed to enable TCP keepalive: {}", e);
        }
        Self::new(stream)
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Transport<S> {
    /// Wrap any byte stream.
    pub fn new(stream: S) -> Self {
        Self {
            framed: Framed::new(stream, IrcCodec::with_max_len(MAX_IRC_LINE_LEN)),
        }
    }

    /// Read the next IRC message.
    ///
    /// Returns `Ok(None)` when the connection is closed.
    pub async fn read_message(&mut self) -> Result<Option<Message>, ProtocolError> {
        self.framed.next().await.transpose()
    }

    /// Whether a complete non-blank line is already buffered, so the next
    /// read will not wait on the socket.
    pub fn has_buffered_message(&self) -> bool {
        let buf = self.framed.read_buffer();
        let Some(end) = buf.iter().rposition(|b| *b == b'\n') else {
            return false;
        };
        buf[..end]
            .split(|b| *b == b'\n')
            .any(|line| line.iter().any(|b| !b.is_ascii_whitespace()))
    }

    /// Write one message.
    pub async fn write_message(&mut self, msg: &Message) -> Result<(), ProtocolError> {
        self.framed.send(msg.clone()).await
    }

    /// Write one line of raw bytes exactly as given. A CRLF terminator is
    /// added.
    pub async fn write_raw(&mut self, line: &[u8]) -> Result<(), ProtocolError> {
        self.framed.send(Bytes::copy_from_slice(line)).await
    }
}

/// Line-oriented transport over raw bytes.
pub struct LineTransport<S> {
    framed: Framed<S, RawLineCodec>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> LineTransport<S> {
    /// Wrap a byte stream with a per-line length limit.
    pub fn new(stream: S, max_len: usize) -> Self {
        Self {
            framed: Framed::new(stream, RawLineCodec::with_max_len(max_len)),
        }
    }

    /// Read the next line with CR/LF terminators removed. The bytes are
    /// otherwise untouched.
    ///
    /// Returns `Ok(None)` when the connection is closed.
    pub async fn read_line(&mut self) -> Result<Option<BytesMut>, ProtocolError> {
        match self.framed.next().await {
            Some(Ok(mut line)) => {
                let trimmed = line
                    .iter()
                    .rposition(|b| !matches!(b, b'\r' | b'\n'))
                    .map_or(0, |last| last + 1);
                line.truncate(trimmed);
                Ok(Some(line))
            }
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    /// Write one message.
    pub async fn write_message(&mut self, msg: &Message) -> Result<(), ProtocolError> {
        let line = IrcCodec::sanitize(msg.to_string());
        self.framed.send(Bytes::from(line)).await
    }
}

fn enable_keepalive(stream: &TcpStream) -> std::io::Result<()> {
    use socket2::{SockRef, TcpKeepalive};
    use std::time::Duration;

    let sock = SockRef::from(stream);
    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(120))
        .with_interval(Duration::from_secs(30));

    sock.set_tcp_keepalive(&keepalive)
}
