//! TCP server, connections and callbacks

pub mod config;
pub mod connection;
pub mod extensions;
pub mod handler;
pub mod listener;

pub use config::{ConnectionConfig, ServerConfig};
pub use connection::{Connection, ConnectionBuilder, ConnectionState};
pub use extensions::Extensions;
pub use handler::Handler;
pub use listener::Server;
