//! Type-tagged, length-prefixed framing
//!
//! ```text
//! +--------+-----------------+----------------+
//! | type:1 | length:4 (BE)   | body:length    |
//! +--------+-----------------+----------------+
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::error::ProtocolError;
use super::packet::{Packet, Protocol};
use super::DEFAULT_MAX_FRAME_SIZE;

/// Size of the frame header (type tag + body length)
pub const HEADER_SIZE: usize = 5;

/// Largest body length the 4-byte length field can express
const MAX_BODY_LEN: usize = u32::MAX as usize;

/// Packet type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    /// Command packet
    Command = 0,
    /// Message packet
    Message = 1,
    /// Error packet
    Error = 2,
}

impl TryFrom<u8> for PacketType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, ProtocolError> {
        match value {
            0 => Ok(PacketType::Command),
            1 => Ok(PacketType::Message),
            2 => Ok(PacketType::Error),
            other => Err(ProtocolError::UnknownPacketType(other)),
        }
    }
}

/// Packet carried by [`DefaultProtocol`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultPacket {
    /// Type tag
    pub packet_type: PacketType,
    /// Raw body
    pub body: Bytes,
}

impl DefaultPacket {
    /// Create a packet
    pub fn new(packet_type: PacketType, body: impl Into<Bytes>) -> Self {
        Self {
            packet_type,
            body: body.into(),
        }
    }

    /// Create a message packet
    pub fn message(body: impl Into<Bytes>) -> Self {
        Self::new(PacketType::Message, body)
    }

    /// Create a command packet
    pub fn command(body: impl Into<Bytes>) -> Self {
        Self::new(PacketType::Command, body)
    }

    /// Create an error packet
    pub fn error(body: impl Into<Bytes>) -> Self {
        Self::new(PacketType::Error, body)
    }

    /// Encoded size including the header
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.body.len()
    }
}

impl Packet for DefaultPacket {
    fn payload(&self) -> &[u8] {
        &self.body
    }
}

/// Type-tagged, length-prefixed framing
#[derive(Debug, Clone)]
pub struct DefaultProtocol {
    max_frame_size: usize,
}

impl DefaultProtocol {
    /// Create with the default maximum body size (1 MiB)
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Set the maximum body size
    ///
    /// Capped at `u32::MAX`, the largest length the header can carry.
    pub fn max_frame_size(mut self, max: usize) -> Self {
        self.max_frame_size = max.min(MAX_BODY_LEN);
        self
    }
}

impl Default for DefaultProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl Protocol for DefaultProtocol {
    type Packet = DefaultPacket;
    type DecodeState = ();

    fn decode(
        &self,
        _state: &mut (),
        src: &mut BytesMut,
    ) -> Result<Option<DefaultPacket>, ProtocolError> {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        // Validate the header before waiting on the body
        let packet_type = PacketType::try_from(src[0])?;
        let len = u32::from_be_bytes([src[1], src[2], src[3], src[4]]) as usize;
        if len > self.max_frame_size {
            return Err(ProtocolError::FrameTooLarge {
                size: len,
                max: self.max_frame_size,
            });
        }

        if src.len() < HEADER_SIZE + len {
            src.reserve(HEADER_SIZE + len - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        let body = src.split_to(len).freeze();
        Ok(Some(DefaultPacket { packet_type, body }))
    }

    fn encode(&self, packet: DefaultPacket, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        let len = packet.body.len();
        if len > self.max_frame_size {
            return Err(ProtocolError::FrameTooLarge {
                size: len,
                max: self.max_frame_size,
            });
        }

        dst.reserve(packet.encoded_len());
        dst.put_u8(packet.packet_type as u8);
        dst.put_u32(len as u32);
        dst.put_slice(&packet.body);
        Ok(())
    }
}
