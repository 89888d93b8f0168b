//! # asynctcp
//!
//! An asynchronous TCP server framework with pluggable framing, plus a small
//! in-process publish/subscribe broker.
//!
//! # Architecture
//!
//! ```text
//!                    Server (accept loop + reaper)
//!                              │
//!             accept ──► Connection::serve ──► Registry::put
//!                              │
//!        ┌─────────────────────┼──────────────────────┐
//!        ▼                     ▼                      ▼
//!   read loop ──inbound──► dispatch loop        write loop
//!   Protocol::decode       Handler::on_message  Protocol::encode
//!                              │                      ▲
//!                              ▼                      │
//!                     Broker (actor) ──ids──► Registry::get ──► async_send
//! ```
//!
//! Each connection runs three tasks joined by two bounded queues. A slow
//! handler stalls the read loop (backpressure); a slow peer fills the
//! outbound queue and makes [`Connection::async_send`] fail fast with
//! [`Error::BufferFull`].
//!
//! The [`Broker`] serializes every subscribe/publish/unsubscribe through a
//! single task. Publishing only returns the subscriber ids; delivery is up to
//! the caller, so the broker never waits on network I/O.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use asynctcp::chat::ChatHandler;
//! use asynctcp::protocol::LineProtocol;
//! use asynctcp::{Broker, Registry, Server, ServerConfig};
//!
//! # async fn example() -> asynctcp::Result<()> {
//! let registry = Arc::new(Registry::new());
//! let handler = ChatHandler::new(Broker::new(), Arc::clone(&registry));
//! let server = Arc::new(Server::with_registry(
//!     ServerConfig::default(),
//!     LineProtocol::new(),
//!     handler,
//!     registry,
//! ));
//!
//! let addr = server.run("127.0.0.1:9001").await?;
//! println!("listening on {}", addr);
//!
//! tokio::signal::ctrl_c().await?;
//! server.close().await;
//! # Ok(())
//! # }
//! ```

pub mod broker;
pub mod chat;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod stats;

pub use broker::{Broker, BrokerError, SubscriberId};
pub use error::{Error, Result};
pub use protocol::{Packet, Protocol, ProtocolError};
pub use registry::Registry;
pub use server::{Connection, ConnectionConfig, Extensions, Handler, Server, ServerConfig};
