//! Topic chat over newline-delimited text
//!
//! A [`Handler`](crate::Handler) for
//! [`LineProtocol`](crate::protocol::LineProtocol) that drives the
//! [`Broker`](crate::Broker):
//!
//! | Line                  | Effect                                   |
//! |-----------------------|------------------------------------------|
//! | `S <topic>`           | subscribe, reply `Subscribed to topic: <topic>` |
//! | `UNS <topic>`         | unsubscribe, reply `Unsubscribed from topic: <topic>` |
//! | `P <topic> <message>` | every subscriber of `<topic>` receives `<message>` |
//!
//! Subscribers are identified by their connection id, and publishing looks
//! each returned id up in the [`Registry`](crate::Registry).

pub mod command;
pub mod handler;

pub use command::{Command, CommandError};
pub use handler::{ChatConnection, ChatHandler, ChatRegistry, ChatServer, Subscriptions};
