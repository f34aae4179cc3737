//! Newline framing.
//!
//! A message on the wire is its bytes followed by a single `\n`. There is no
//! escaping and no length prefix, so a message containing `\n` arrives as
//! several messages. `\r` is ordinary payload.

use std::io;

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// The frame delimiter.
pub const DELIMITER: u8 = b'\n';

/// Codec splitting a byte stream into `\n`-terminated strings.
///
/// Unlike `tokio_util::codec::LinesCodec` this keeps `\r`, never errors on
/// length, and converts invalid UTF-8 lossily instead of failing the stream.
#[derive(Debug, Default, Clone)]
pub struct LineCodec {
    /// Bytes of the buffer already scanned without finding a delimiter.
    next_index: usize,
}

impl LineCodec {
    /// Create a codec with no partial state.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, io::Error> {
        let start = self.next_index.min(buf.len());
        match buf[start..].iter().position(|b| *b == DELIMITER) {
            Some(offset) => {
                let end = start + offset;
                self.next_index = 0;
                let mut frame = buf.split_to(end + 1);
                frame.truncate(end);
                Ok(Some(String::from_utf8_lossy(&frame).into_owned()))
            }
            None => {
                self.next_index = buf.len();
                Ok(None)
            }
        }
    }
}

impl Encoder<&str> for LineCodec {
    type Error = io::Error;

    fn encode(&mut self, line: &str, buf: &mut BytesMut) -> Result<(), io::Error> {
        buf.reserve(line.len() + 1);
        buf.put_slice(line.as_bytes());
        buf.put_u8(DELIMITER);
        Ok(())
    }
}

impl Encoder<String> for LineCodec {
    type Error = io::Error;

    fn encode(&mut self, line: String, buf: &mut BytesMut) -> Result<(), io::Error> {
        Encoder::<&str>::encode(self, line.as_str(), buf)
    }
}
