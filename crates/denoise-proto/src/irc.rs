//! IRC message codec for tokio.
//!
//! Wraps [`LineCodec`] and tokenizes each line into a [`Message`]. Blank
//! lines are skipped. Typed messages, text lines and raw bytes can all be
//! encoded; each is cut at the first line break and terminated with CRLF.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error;
use crate::line::LineCodec;
use crate::message::Message;

/// Tokio codec for encoding/decoding IRC messages.
pub struct IrcCodec {
    inner: LineCodec,
}

impl IrcCodec {
    /// Create a codec with the IRC standard line limit.
    pub fn new() -> Self {
        Self {
            inner: LineCodec::new(),
        }
    }

    /// Create a codec with a custom max line length.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            inner: LineCodec::with_max_len(max_len),
        }
    }

    /// Cut outgoing data at its first line ending and terminate it with CRLF.
    pub fn sanitize(mut data: String) -> String {
        if let Some(pos) = data.find(['\r', '\n']) {
            data.truncate(pos);
        }
        data.push_str("\r\n");
        data
    }
}

impl Default for IrcCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for IrcCodec {
    type Item = Message;
    type Error = error::ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<Message>> {
        while let Some(line) = self.inner.decode(src)? {
            if line.trim_end_matches(['\r', '\n']).trim().is_empty() {
                continue;
            }
            return line.parse::<Message>().map(Some);
        }
        Ok(None)
    }
}

impl Encoder<Message> for IrcCodec {
    type Error = error::ProtocolError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> error::Result<()> {
        self.inner.encode(Self::sanitize(msg.to_string()), dst)
    }
}

impl Encoder<String> for IrcCodec {
    type Error = error::ProtocolError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> error::Result<()> {
        self.inner.encode(Self::sanitize(line), dst)
    }
}

impl Encoder<Bytes> for IrcCodec {
    type Error = error::ProtocolError;

    /// Raw bytes are written as-is, never re-encoded.
    fn encode(&mut self, data: Bytes, dst: &mut BytesMut) -> error::Result<()> {
        let end = data
            .iter()
            .position(|b| matches!(b, b'\r' | b'\n'))
            .unwrap_or(data.len());
        dst.reserve(end + 2);
        dst.extend_from_slice(&data[..end]);
        dst.extend_from_slice(b"\r\n");
        Ok(())
    }
}
