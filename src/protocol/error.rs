//! Framing error types

use std::io;

/// Error type for decoding and encoding frames
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Underlying socket failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Frame exceeds the configured maximum size
    #[error("frame of {size} bytes exceeds maximum of {max} bytes")]
    FrameTooLarge { size: usize, max: usize },

    /// Type tag is not a known [`PacketType`](super::PacketType)
    #[error("unknown packet type: {0:#04x}")]
    UnknownPacketType(u8),

    /// The stream ended in the middle of a frame
    #[error("stream ended with {remaining} bytes of an incomplete frame")]
    Incomplete { remaining: usize },
}
