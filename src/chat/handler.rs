//! Chat connection handler

use std::collections::BTreeSet;
use std::sync::Arc;

use bytes::Bytes;

use super::command::Command;
use crate::broker::{Broker, BrokerError};
use crate::protocol::{LinePacket, LineProtocol};
use crate::registry::Registry;
use crate::server::{Connection, Handler, Server};

/// A connection speaking the chat protocol
pub type ChatConnection = Connection<LineProtocol, ChatHandler>;

/// Registry of chat connections
pub type ChatRegistry = Registry<LineProtocol, ChatHandler>;

/// Server running the chat protocol
pub type ChatServer = Server<LineProtocol, ChatHandler>;

/// Topics a connection is subscribed to, kept in its extensions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subscriptions(pub BTreeSet<String>);

/// Handler implementing the chat commands
pub struct ChatHandler {
    broker: Broker,
    registry: Arc<ChatRegistry>,
}

impl ChatHandler {
    /// Create a handler publishing to connections found in `registry`
    ///
    /// Pass the same registry to [`Server::with_registry`].
    pub fn new(broker: Broker, registry: Arc<ChatRegistry>) -> Self {
        Self { broker, registry }
    }

    /// The broker commands are forwarded to
    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    async fn subscribe(&self, conn: &ChatConnection, topic: &str) {
        tracing::debug!(conn = %conn.id(), topic = %topic, "Subscribe");

        // Lines queued before a hangup are still dispatched after close
        if conn.is_closed() {
            tracing::debug!(conn = %conn.id(), topic = %topic, "Subscribe after disconnect ignored");
            return;
        }

        if let Err(e) = self.broker.subscribe(conn.id(), topic).await {
            tracing::warn!(conn = %conn.id(), error = %e, "Subscribe failed");
            return;
        }

        // Closed while the broker was busy; cleanup may already have run
        if conn.is_closed() {
            if let Err(e) = self.broker.unsubscribe(conn.id(), topic).await {
                tracing::debug!(conn = %conn.id(), error = %e, "Late subscription already gone");
            }
            return;
        }
        conn.extensions()
            .update(|subs: &mut Subscriptions| subs.0.insert(topic.to_string()));

        reply(conn, format!("Subscribed to topic: {}", topic));
    }

    async fn unsubscribe(&self, conn: &ChatConnection, topic: &str) {
        tracing::debug!(conn = %conn.id(), topic = %topic, "Unsubscribe");

        match self.broker.unsubscribe(conn.id(), topic).await {
            Ok(()) => {}
            // Acknowledged all the same
            Err(e @ BrokerError::NotSubscribed { .. }) => {
                tracing::debug!(conn = %conn.id(), error = %e, "Unsubscribe ignored");
            }
            Err(e) => {
                tracing::warn!(conn = %conn.id(), error = %e, "Unsubscribe failed");
                return;
            }
        }
        conn.extensions()
            .update(|subs: &mut Subscriptions| subs.0.remove(topic));

        reply(conn, format!("Unsubscribed from topic: {}", topic));
    }

    async fn publish(&self, conn: &ChatConnection, topic: &str, message: &str) {
        tracing::debug!(conn = %conn.id(), topic = %topic, "Publish");

        let subscribers = match self.broker.publish(topic, message.as_bytes()).await {
            Ok(subscribers) => subscribers,
            Err(e) => {
                tracing::debug!(conn = %conn.id(), error = %e, "Nothing published");
                return;
            }
        };

        let body = Bytes::copy_from_slice(message.as_bytes());
        for id in subscribers {
            let Some(subscriber) = self.registry.get(&id).await else {
                tracing::debug!(subscriber = %id, "No connection for subscriber");
                continue;
            };
            if let Err(e) = subscriber.async_send(LinePacket::new(body.clone())) {
                tracing::warn!(subscriber = %id, error = %e, "Failed to deliver message");
            }
        }
    }
}

impl Handler<LineProtocol> for ChatHandler {
    fn on_connected(&self, conn: &Arc<ChatConnection>) {
        tracing::info!(conn = %conn.id(), "Client connected");
    }

    async fn on_message(&self, conn: &Arc<ChatConnection>, packet: LinePacket) {
        let line = String::from_utf8_lossy(packet.bytes());

        match Command::parse(&line) {
            Ok(Command::Subscribe { topic }) => self.subscribe(conn, topic).await,
            Ok(Command::Unsubscribe { topic }) => self.unsubscribe(conn, topic).await,
            Ok(Command::Publish { topic, message }) => self.publish(conn, topic, message).await,
            Err(e) if e.is_reported() => reply(conn, e.to_string()),
            Err(e) => tracing::debug!(conn = %conn.id(), error = %e, "Ignoring line"),
        }
    }

    fn on_disconnected(&self, conn: &ChatConnection) {
        tracing::info!(conn = %conn.id(), "Client disconnected");

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(conn = %conn.id(), "No runtime to clean up subscriptions");
            return;
        };
        let broker = self.broker.clone();
        let id = conn.id().to_string();
        runtime.spawn(async move {
            if let Err(e) = broker.unsubscribe_all(id.as_str()).await {
                tracing::debug!(conn = %id, error = %e, "Subscription cleanup failed");
            }
        });
    }
}

fn reply(conn: &ChatConnection, text: String) {
    if let Err(e) = conn.async_send(LinePacket::from(text)) {
        tracing::warn!(conn = %conn.id(), error = %e, "Failed to send reply");
    }
}
