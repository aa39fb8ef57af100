//! Newline-framed codec for tokio.
//!
//! Reads `\n`-terminated lines (a preceding `\r` is stripped), decodes them
//! with the configured character encoding, and writes lines back with
//! `\r\n` appended. Outbound lines with an embedded `\r`, `\n` or NUL are
//! refused.

use bytes::BytesMut;
use encoding::Encoding;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{Result, WireError};

/// Longest accepted line: 8191 bytes of tags plus a 512 byte body.
pub const MAX_LINE_LEN: usize = 8191 + 512;

/// Line codec with a character encoding and a length limit.
#[derive(Debug)]
pub struct LineCodec {
    encoding: &'static Encoding,
    /// Index of the next byte to scan for `\n`.
    next_index: usize,
    max_len: usize,
}

impl LineCodec {
    /// Create a codec for an encoding label such as `utf-8` or
    /// `iso-8859-1`.
    pub fn new(label: &str) -> Result<Self> {
        let encoding = Encoding::for_label(label.as_bytes())
            .ok_or_else(|| WireError::UnknownEncoding(label.to_owned()))?;
        Ok(Self {
            encoding,
            next_index: 0,
            max_len: MAX_LINE_LEN,
        })
    }

    /// Create a codec with a custom length limit.
    pub fn with_max_len(label: &str, max_len: usize) -> Result<Self> {
        let mut codec = Self::new(label)?;
        codec.max_len = max_len;
        Ok(codec)
    }

    /// Name of the active encoding.
    pub fn encoding_name(&self) -> &'static str {
        self.encoding.name()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
            self.next_index = src.len();
            if src.len() > self.max_len {
                return Err(WireError::LineTooLong {
                    actual: src.len(),
                    limit: self.max_len,
                });
            }
            return Ok(None);
        };

        let line = src.split_to(self.next_index + offset + 1);
        self.next_index = 0;

        if line.len() > self.max_len {
            return Err(WireError::LineTooLong {
                actual: line.len(),
                limit: self.max_len,
            });
        }

        let (text, _, _) = self.encoding.decode(&line);
        Ok(Some(text.trim_end_matches(['\r', '\n']).to_owned()))
    }
}

impl Encoder<String> for LineCodec {
    type Error = WireError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<()> {
        let line = line.trim_end_matches(['\r', '\n']);
        if let Some(ch) = line.chars().find(|c| is_line_breaking(*c)) {
            return Err(WireError::IllegalControlChar(ch));
        }
        let (bytes, _, _) = self.encoding.encode(line);
        dst.reserve(bytes.len() + 2);
        dst.extend_from_slice(&bytes);
        dst.extend_from_slice(b"\r\n");
        Ok(())
    }
}

/// Characters that cannot appear inside a single protocol line.
pub fn is_line_breaking(ch: char) -> bool {
    matches!(ch, '\r' | '\n' | '\0')
}
