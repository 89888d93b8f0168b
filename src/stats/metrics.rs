//! Statistics for connections and the server
//!
//! Counters are updated with relaxed atomics from the connection loops and
//! read back as plain snapshots.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Live per-connection counters
#[derive(Debug)]
pub struct ConnectionStats {
    connected_at: Instant,
    packets_received: AtomicU64,
    packets_sent: AtomicU64,
    sends_rejected: AtomicU64,
}

impl ConnectionStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self {
            connected_at: Instant::now(),
            packets_received: AtomicU64::new(0),
            packets_sent: AtomicU64::new(0),
            sends_rejected: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_received(&self) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sent(&self) {
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.sends_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of the counters
    pub fn snapshot(&self) -> ConnectionStatsSnapshot {
        ConnectionStatsSnapshot {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            sends_rejected: self.sends_rejected.load(Ordering::Relaxed),
            duration: self.connected_at.elapsed(),
        }
    }
}

impl Default for ConnectionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time connection statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionStatsSnapshot {
    /// Packets decoded from the socket
    pub packets_received: u64,
    /// Packets encoded onto the socket
    pub packets_sent: u64,
    /// Sends refused because the queue was full or the wait timed out
    pub sends_rejected: u64,
    /// Time since the connection was created
    pub duration: Duration,
}

/// Live server-wide counters
#[derive(Debug)]
pub struct ServerCounters {
    started_at: Instant,
    total_connections: AtomicU64,
    rejected_connections: AtomicU64,
}

impl ServerCounters {
    /// Create zeroed counters, starting the uptime clock now
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total_connections: AtomicU64::new(0),
            rejected_connections: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_accepted(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Combine the counters with the current number of live connections
    pub fn snapshot(&self, active_connections: usize) -> ServerStats {
        ServerStats {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            rejected_connections: self.rejected_connections.load(Ordering::Relaxed),
            active_connections: active_connections as u64,
            uptime: self.started_at.elapsed(),
        }
    }
}

impl Default for ServerCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Server-wide statistics
#[derive(Debug, Clone, Default)]
pub struct ServerStats {
    /// Total connections accepted
    pub total_connections: u64,
    /// Connections refused by the connection limit
    pub rejected_connections: u64,
    /// Connections currently in the registry
    pub active_connections: u64,
    /// Time since the server was created
    pub uptime: Duration,
}
