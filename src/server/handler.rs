//! Application callbacks
//!
//! Implement [`Handler`] to receive connection events. One handler value is
//! shared by every connection of a server.

use std::future::Future;
use std::sync::Arc;

use crate::error::Error;
use crate::protocol::Protocol;
use crate::server::connection::Connection;

/// Connection event callbacks
///
/// `on_connected`, `on_disconnected` and `on_error` run synchronously on the
/// task that triggered them and must not block. `on_message` runs on the
/// connection's dispatch task; while it is pending, no further packets from
/// that connection are dispatched and, once the inbound queue fills, no
/// further frames are read.
pub trait Handler<P: Protocol>: Sized + Send + Sync + 'static {
    /// Called once when the connection starts being served, before any
    /// packet is read
    fn on_connected(&self, _conn: &Arc<Connection<P, Self>>) {}

    /// Called for every decoded packet, in decode order
    fn on_message(
        &self,
        conn: &Arc<Connection<P, Self>>,
        packet: P::Packet,
    ) -> impl Future<Output = ()> + Send;

    /// Called exactly once when the connection closes
    fn on_disconnected(&self, _conn: &Connection<P, Self>) {}

    /// Called when a connection task fails, right before the connection
    /// closes
    fn on_error(&self, conn: &Connection<P, Self>, err: &Error) {
        tracing::debug!(conn = %conn.id(), error = %err, "Connection error");
    }
}
