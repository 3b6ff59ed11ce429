//! Line-based codecs for tokio.
//!
//! Both codecs split on `\n`, keep the terminator so callers can decide how
//! to trim, and enforce a maximum line length. [`LineCodec`] yields text,
//! replacing bytes that are not valid UTF-8 rather than rejecting the line.
//! [`RawLineCodec`] yields the bytes exactly as received.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::error;

/// Scan state shared by both codecs.
#[derive(Debug)]
struct Splitter {
    /// Index of next byte to check for newline
    next_index: usize,
    /// Maximum line length, terminator included
    max_len: usize,
}

impl Splitter {
    fn new(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }

    fn split(&mut self, src: &mut BytesMut) -> error::Result<Option<BytesMut>> {
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(error::ProtocolError::MessageTooLong {
                    actual: line.len(),
                    limit: self.max_len,
                });
            }
            Ok(Some(line))
        } else {
            self.next_index = src.len();

            if src.len() > self.max_len {
                return Err(error::ProtocolError::MessageTooLong {
                    actual: src.len(),
                    limit: self.max_len,
                });
            }

            Ok(None)
        }
    }
}

/// Line-based codec that handles newline-terminated messages.
pub struct LineCodec {
    splitter: Splitter,
}

impl LineCodec {
    /// Create a codec with the IRC standard 512 byte limit.
    pub fn new() -> Self {
        Self::with_max_len(512)
    }

    /// Create a codec with a custom max line length.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            splitter: Splitter::new(max_len),
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = error::ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        let Some(line) = self.splitter.split(src)? else {
            return Ok(None);
        };

        let data = match String::from_utf8(line.to_vec()) {
            Ok(s) => s,
            Err(e) => {
                debug!(
                    valid_up_to = e.utf8_error().valid_up_to(),
                    "Replacing invalid UTF-8 in line"
                );
                String::from_utf8_lossy(&line).into_owned()
            }
        };

        Ok(Some(data))
    }
}

impl Encoder<String> for LineCodec {
    type Error = error::ProtocolError;

    fn encode(&mut self, msg: String, dst: &mut BytesMut) -> error::Result<()> {
        dst.extend_from_slice(msg.as_bytes());
        Ok(())
    }
}

/// Line codec that never decodes text.
///
/// Used where lines are relayed rather than interpreted, so the output is
/// byte-for-byte what came in whatever the encoding.
pub struct RawLineCodec {
    splitter: Splitter,
}

impl RawLineCodec {
    /// Create a codec with a custom max line length.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            splitter: Splitter::new(max_len),
        }
    }
}

impl Decoder for RawLineCodec {
    type Item = BytesMut;
    type Error = error::ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<BytesMut>> {
        self.splitter.split(src)
    }
}

impl Encoder<Bytes> for RawLineCodec {
    type Error = error::ProtocolError;

    fn encode(&mut self, data: Bytes, dst: &mut BytesMut) -> error::Result<()> {
        dst.extend_from_slice(&data);
        Ok(())
    }
}
