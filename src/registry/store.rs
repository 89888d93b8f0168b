//! Registry implementation

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::protocol::Protocol;
use crate::server::{Connection, Handler};

/// Registry of live connections keyed by identity
///
/// Holds at most one connection per identity: inserting under an identity
/// that is already taken closes the previous connection.
pub struct Registry<P: Protocol, H> {
    connections: RwLock<HashMap<String, Arc<Connection<P, H>>>>,
}

impl<P: Protocol, H: Handler<P>> Registry<P, H> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a connection, closing any other connection under the same id
    pub async fn put(&self, id: impl Into<String>, conn: Arc<Connection<P, H>>) {
        let id = id.into();
        let mut connections = self.connections.write().await;

        if let Some(old) = connections.get(&id) {
            if !Arc::ptr_eq(old, &conn) {
                tracing::debug!(conn = %id, "Replacing existing connection");
                old.close();
            }
        }

        connections.insert(id, conn);
    }

    /// Look up a connection
    pub async fn get(&self, id: &str) -> Option<Arc<Connection<P, H>>> {
        self.connections.read().await.get(id).cloned()
    }

    /// Remove a connection without closing it
    pub async fn delete(&self, id: &str) -> Option<Arc<Connection<P, H>>> {
        self.connections.write().await.remove(id)
    }

    /// Copy of all entries at this point in time
    pub async fn snapshot(&self) -> HashMap<String, Arc<Connection<P, H>>> {
        self.connections.read().await.clone()
    }

    /// Number of registered connections, closed ones included until reaped
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Whether the registry is empty
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }

    /// Evict closed connections
    ///
    /// Returns the number of entries removed.
    pub async fn reap(&self) -> usize {
        let mut connections = self.connections.write().await;
        let before = connections.len();
        connections.retain(|_, conn| !conn.is_closed());

        let reaped = before - connections.len();
        if reaped > 0 {
            tracing::trace!(reaped, remaining = connections.len(), "Reaped closed connections");
        }
        reaped
    }

    /// Spawn background reaper task
    ///
    /// Runs [`reap`](Self::reap) every `interval` until `shutdown` is
    /// cancelled.
    pub fn spawn_reaper(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        registry.reap().await;
                    }
                }
            }
            tracing::debug!("Registry reaper stopped");
        })
    }
}

impl<P: Protocol, H: Handler<P>> Default for Registry<P, H> {
    fn default() -> Self {
        Self::new()
    }
}
