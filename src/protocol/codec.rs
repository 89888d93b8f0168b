//! Adapter from [`Protocol`] to `tokio_util::codec`

use std::sync::Arc;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use super::error::ProtocolError;
use super::packet::Protocol;

/// Codec driving a shared [`Protocol`]
///
/// The read and write halves of a connection each get their own codec, both
/// pointing at the same protocol. The codec owns the connection's decode
/// state.
pub struct FrameCodec<P: Protocol> {
    protocol: Arc<P>,
    state: P::DecodeState,
}

impl<P: Protocol> FrameCodec<P> {
    /// Create a codec for the given protocol
    pub fn new(protocol: Arc<P>) -> Self {
        Self {
            protocol,
            state: P::DecodeState::default(),
        }
    }
}

impl<P: Protocol> Decoder for FrameCodec<P> {
    type Item = P::Packet;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.protocol.decode(&mut self.state, src)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.protocol.decode(&mut self.state, buf)? {
            Some(packet) => Ok(Some(packet)),
            None if buf.is_empty() => Ok(None),
            None => Err(ProtocolError::Incomplete {
                remaining: buf.len(),
            }),
        }
    }
}

impl<P: Protocol> Encoder<P::Packet> for FrameCodec<P> {
    type Error = ProtocolError;

    fn encode(&mut self, item: P::Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.protocol.encode(item, dst)
    }
}
