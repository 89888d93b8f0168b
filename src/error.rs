//! Error types
//!
//! Crate-level error returned by connection, server and broker operations.

use std::io;
use std::time::Duration;

use crate::broker::BrokerError;
use crate::protocol::ProtocolError;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for connection and server operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A connection was served without a protocol or a handler
    #[error("connection requires both a protocol and a handler")]
    Configuration,

    /// `serve()` was called on a connection that is already running
    #[error("connection is already being served")]
    AlreadyServing,

    /// The connection has been closed
    #[error("use of closed connection")]
    ConnectionClosed,

    /// The outbound queue is full; the packet was dropped
    #[error("the async send buffer is full")]
    BufferFull,

    /// No outbound queue space became available in time
    #[error("async send timed out")]
    WriteTimeout,

    /// No frame was decoded before the read deadline
    #[error("read deadline of {0:?} elapsed")]
    ReadDeadline(Duration),

    /// A frame could not be written before the write deadline
    #[error("write deadline of {0:?} elapsed")]
    WriteDeadline(Duration),

    /// Failed to resolve or bind the listening address
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The server is already running
    #[error("server is already running")]
    AlreadyRunning,

    /// Framing failure
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Broker failure
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A connection task panicked
    #[error("connection task panicked: {0}")]
    Panic(String),
}
