//! Server listener
//!
//! Handles the TCP accept loop, wires accepted sockets into connections and
//! performs graceful shutdown.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::{Error, Result};
use crate::protocol::Protocol;
use crate::registry::Registry;
use crate::server::config::{ConnectionConfig, ServerConfig};
use crate::server::connection::Connection;
use crate::server::handler::Handler;
use crate::stats::{ServerCounters, ServerStats};

/// TCP server
///
/// Shared through an `Arc`: [`run`](Self::run) spawns background tasks that
/// hold their own reference.
pub struct Server<P: Protocol, H: Handler<P>> {
    config: ServerConfig,
    connection_config: RwLock<ConnectionConfig>,
    protocol: Arc<P>,
    handler: Arc<H>,
    registry: Arc<Registry<P, H>>,
    connection_semaphore: Option<Arc<Semaphore>>,
    running: AtomicBool,
    local_addr: OnceLock<SocketAddr>,
    shutdown: CancellationToken,
    setup: TaskTracker,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    counters: ServerCounters,
}

impl<P: Protocol, H: Handler<P>> Server<P, H> {
    /// Create a new server with the given configuration, framing and handler
    pub fn new(config: ServerConfig, protocol: P, handler: H) -> Self {
        Self::with_registry(config, protocol, handler, Arc::new(Registry::new()))
    }

    /// Create a new server around an existing registry
    ///
    /// Use this when the handler needs the registry to reach other
    /// connections.
    pub fn with_registry(
        config: ServerConfig,
        protocol: P,
        handler: H,
        registry: Arc<Registry<P, H>>,
    ) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            connection_config: RwLock::new(config.connection_config()),
            config,
            protocol: Arc::new(protocol),
            handler: Arc::new(handler),
            registry,
            connection_semaphore,
            running: AtomicBool::new(false),
            local_addr: OnceLock::new(),
            shutdown: CancellationToken::new(),
            setup: TaskTracker::new(),
            tasks: Mutex::new(Vec::new()),
            counters: ServerCounters::new(),
        }
    }

    /// Get a reference to the connection registry
    pub fn registry(&self) -> &Arc<Registry<P, H>> {
        &self.registry
    }

    /// Get the handler
    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    /// Address the server is listening on, once running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// Bind `addr` and start accepting connections
    ///
    /// Returns the bound address as soon as the listener is ready; accepting
    /// happens on a background task until [`close`](Self::close).
    pub async fn run(self: &Arc<Self>, addr: &str) -> Result<SocketAddr> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(Error::AlreadyRunning);
        }

        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(source) => {
                self.running.store(false, Ordering::Release);
                return Err(Error::Bind {
                    addr: addr.to_string(),
                    source,
                });
            }
        };
        let local_addr = listener.local_addr()?;
        let _ = self.local_addr.set(local_addr);
        tracing::info!(addr = %local_addr, "Server listening");

        let reaper = self
            .registry
            .spawn_reaper(self.config.reap_interval, self.shutdown.clone());
        let accept = tokio::spawn(Arc::clone(self).accept_loop(listener));

        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend([accept, reaper]);

        Ok(local_addr)
    }

    /// Gracefully shut down
    ///
    /// Stops accepting, waits for connections still being set up, then
    /// closes every registered connection. Packets still queued for
    /// sending are discarded.
    pub async fn close(&self) {
        tracing::info!("Server shutting down");

        // Phase 1: stop accepting and wait for in-flight setup
        self.shutdown.cancel();
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Server task ended abnormally");
            }
        }
        self.setup.close();
        self.setup.wait().await;

        // Phase 2: close whatever is still open
        let mut closed = 0usize;
        for conn in self.registry.snapshot().await.into_values() {
            if !conn.is_closed() {
                conn.close();
                closed += 1;
            }
        }
        self.registry.reap().await;

        tracing::info!(closed, "Server shutdown complete");
    }

    /// Set the read deadline for connections accepted from now on
    pub fn set_read_timeout(&self, timeout: Duration) {
        self.connection_config
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .read_timeout = timeout;
    }

    /// Set the write deadline for connections accepted from now on
    pub fn set_write_timeout(&self, timeout: Duration) {
        self.connection_config
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .write_timeout = timeout;
    }

    /// Settings applied to the next accepted connection
    pub fn connection_config(&self) -> ConnectionConfig {
        self.connection_config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Server-wide statistics
    pub async fn stats(&self) -> ServerStats {
        self.counters.snapshot(self.registry.len().await)
    }

    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        loop {
            let accepted = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((socket, peer_addr)) => {
                    let server = Arc::clone(&self);
                    self.setup.spawn(async move {
                        server.handle_connection(socket, peer_addr).await;
                    });
                }
                Err(e) if is_transient(&e) => {
                    tracing::warn!(error = %e, "Temporary accept error, retrying");
                    tokio::select! {
                        _ = self.shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.config.accept_backoff) => {}
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection, no longer accepting");
                    break;
                }
            }
        }

        tracing::debug!("Accept loop stopped");
    }

    async fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = match &self.connection_semaphore {
            Some(sem) => match Arc::clone(sem).try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    self.counters.record_rejected();
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            },
            None => None,
        };

        self.counters.record_accepted();
        tracing::debug!(peer = %peer_addr, "New connection");

        // Configure socket
        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::error!(peer = %peer_addr, error = %e, "Failed to configure socket");
                return;
            }
        }

        let mut builder = Connection::builder(socket)
            .protocol(Arc::clone(&self.protocol))
            .handler(Arc::clone(&self.handler))
            .config(self.connection_config());
        if let Some(permit) = permit {
            builder = builder.permit(permit);
        }

        let conn = match builder.build() {
            Ok(conn) => conn,
            Err(e) => {
                tracing::debug!(peer = %peer_addr, error = %e, "Connection dropped during setup");
                return;
            }
        };

        if let Err(e) = conn.serve() {
            tracing::warn!(conn = %conn.id(), error = %e, "Failed to serve connection");
            return;
        }

        let id = conn.id().to_string();
        self.registry.put(id, conn).await;
    }
}

/// Accept errors worth retrying
fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::Interrupted
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}
