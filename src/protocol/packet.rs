//! Packet and protocol traits

use std::fmt;

use bytes::BytesMut;

use super::error::ProtocolError;

/// An opaque message unit produced by decoding and consumed by encoding
pub trait Packet: fmt::Debug + Send + Sync + 'static {
    /// The application payload carried by this packet
    fn payload(&self) -> &[u8];
}

/// A framing strategy
///
/// One value is shared by every connection. Anything a decoder needs to
/// remember between reads lives in [`DecodeState`](Self::DecodeState), of
/// which each connection owns its own. A connection only calls `decode` from
/// its read loop and `encode` from its write loop.
pub trait Protocol: Send + Sync + 'static {
    /// Packet type this protocol produces and consumes
    type Packet: Packet;

    /// Per-connection decoder state, reset to `Default` for each connection
    type DecodeState: Default + Send + 'static;

    /// Decode one frame from the front of `src`
    ///
    /// Returns `Ok(None)` when `src` does not yet hold a complete frame.
    /// Consumed bytes must be removed from `src`.
    fn decode(
        &self,
        state: &mut Self::DecodeState,
        src: &mut BytesMut,
    ) -> Result<Option<Self::Packet>, ProtocolError>;

    /// Encode one packet onto the end of `dst`
    fn encode(&self, packet: Self::Packet, dst: &mut BytesMut) -> Result<(), ProtocolError>;
}
