//! Server configuration

use std::time::Duration;

/// Default capacity of each per-connection queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Per-frame read deadline (zero = disabled)
    pub read_timeout: Duration,

    /// Per-frame write deadline (zero = disabled)
    pub write_timeout: Duration,

    /// Capacity of the decoded-packet queue between read and dispatch loops
    pub read_queue_capacity: usize,

    /// Capacity of the outbound queue feeding the write loop
    pub write_queue_capacity: usize,

    /// How often closed connections are evicted from the registry
    pub reap_interval: Duration,

    /// Pause before retrying after a transient accept error
    pub accept_backoff: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_connections: 0, // Unlimited
            tcp_nodelay: true,
            read_timeout: Duration::ZERO,
            write_timeout: Duration::ZERO,
            read_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            write_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            reap_interval: Duration::from_millis(10),
            accept_backoff: Duration::from_millis(50),
        }
    }
}

impl ServerConfig {
    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Enable or disable TCP_NODELAY
    pub fn tcp_nodelay(mut self, nodelay: bool) -> Self {
        self.tcp_nodelay = nodelay;
        self
    }

    /// Set read deadline
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set write deadline
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set inbound queue capacity (minimum 1)
    pub fn read_queue_capacity(mut self, capacity: usize) -> Self {
        self.read_queue_capacity = capacity.max(1);
        self
    }

    /// Set outbound queue capacity (minimum 1)
    pub fn write_queue_capacity(mut self, capacity: usize) -> Self {
        self.write_queue_capacity = capacity.max(1);
        self
    }

    /// Set reaper interval
    pub fn reap_interval(mut self, interval: Duration) -> Self {
        self.reap_interval = interval;
        self
    }

    /// Set accept retry backoff
    pub fn accept_backoff(mut self, backoff: Duration) -> Self {
        self.accept_backoff = backoff;
        self
    }

    /// Per-connection settings derived from this configuration
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            read_timeout: self.read_timeout,
            write_timeout: self.write_timeout,
            read_queue_capacity: self.read_queue_capacity,
            write_queue_capacity: self.write_queue_capacity,
        }
    }
}

/// Settings applied to a single connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Per-frame read deadline (zero = disabled)
    pub read_timeout: Duration,
    /// Per-frame write deadline (zero = disabled)
    pub write_timeout: Duration,
    /// Inbound queue capacity
    pub read_queue_capacity: usize,
    /// Outbound queue capacity
    pub write_queue_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ServerConfig::default().connection_config()
    }
}

impl ConnectionConfig {
    pub(crate) fn read_deadline(&self) -> Option<Duration> {
        (!self.read_timeout.is_zero()).then_some(self.read_timeout)
    }

    pub(crate) fn write_deadline(&self) -> Option<Duration> {
        (!self.write_timeout.is_zero()).then_some(self.write_timeout)
    }
}
