//! Packet and framing abstraction
//!
//! A [`Protocol`] turns a byte stream into [`Packet`]s and back. Connections
//! share one protocol value and drive it through [`FrameCodec`], which adapts
//! it to `tokio_util::codec` so the read and write loops can use
//! `FramedRead`/`FramedWrite`.
//!
//! Two framings are built in:
//! - [`DefaultProtocol`]: `[type: u8][length: u32 BE][body]`
//! - [`LineProtocol`]: newline-delimited frames with no header

pub mod codec;
pub mod default;
pub mod error;
pub mod line;
pub mod packet;

pub use codec::FrameCodec;
pub use default::{DefaultPacket, DefaultProtocol, PacketType};
pub use error::ProtocolError;
pub use line::{LinePacket, LineProtocol};
pub use packet::{Packet, Protocol};

/// Default maximum frame body size (1 MiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 << 10;
