//! Newline-delimited framing
//!
//! Each frame is the bytes up to a `\n`. A `\r` right before the newline is
//! dropped on decode. Encoding appends a single `\n`.

use bytes::{BufMut, Bytes, BytesMut};

use super::error::ProtocolError;
use super::packet::{Packet, Protocol};
use super::DEFAULT_MAX_FRAME_SIZE;

/// One line, without its terminator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinePacket {
    line: Bytes,
}

impl LinePacket {
    /// Create a packet from line content (no trailing newline)
    pub fn new(line: impl Into<Bytes>) -> Self {
        Self { line: line.into() }
    }

    /// Line content as UTF-8, if valid
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.line).ok()
    }

    /// Line content
    pub fn bytes(&self) -> &Bytes {
        &self.line
    }
}

impl From<&'static str> for LinePacket {
    fn from(s: &'static str) -> Self {
        Self::new(Bytes::from_static(s.as_bytes()))
    }
}

impl From<String> for LinePacket {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl Packet for LinePacket {
    fn payload(&self) -> &[u8] {
        &self.line
    }
}

/// Newline-delimited framing
#[derive(Debug, Clone)]
pub struct LineProtocol {
    max_line_length: usize,
}

impl LineProtocol {
    /// Create with the default maximum line length (1 MiB)
    pub fn new() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Set the maximum line length, excluding the terminator
    pub fn max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }
}

impl Default for LineProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl Protocol for LineProtocol {
    type Packet = LinePacket;
    /// Bytes of the pending line already scanned for a newline
    type DecodeState = usize;

    fn decode(
        &self,
        next_index: &mut usize,
        src: &mut BytesMut,
    ) -> Result<Option<LinePacket>, ProtocolError> {
        let start = (*next_index).min(src.len());
        let Some(offset) = src[start..].iter().position(|&b| b == b'\n') else {
            if src.len() > self.max_line_length {
                *next_index = 0;
                return Err(ProtocolError::FrameTooLarge {
                    size: src.len(),
                    max: self.max_line_length,
                });
            }
            *next_index = src.len();
            return Ok(None);
        };
        let pos = start + offset;
        *next_index = 0;

        let mut frame = src.split_to(pos + 1);
        frame.truncate(pos);
        if frame.last() == Some(&b'\r') {
            frame.truncate(pos - 1);
        }

        if frame.len() > self.max_line_length {
            return Err(ProtocolError::FrameTooLarge {
                size: frame.len(),
                max: self.max_line_length,
            });
        }

        Ok(Some(LinePacket::new(frame.freeze())))
    }

    fn encode(&self, packet: LinePacket, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        if packet.line.len() > self.max_line_length {
            return Err(ProtocolError::FrameTooLarge {
                size: packet.line.len(),
                max: self.max_line_length,
            });
        }

        dst.reserve(packet.line.len() + 1);
        dst.put_slice(&packet.line);
        dst.put_u8(b'\n');
        Ok(())
    }
}
