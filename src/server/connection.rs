//! A single served TCP connection
//!
//! A connection runs three tasks:
//!
//! ```text
//!   socket ──► read loop ──[inbound queue]──► dispatch loop ──► Handler::on_message
//!   socket ◄── write loop ◄──[outbound queue]◄── async_send()
//! ```
//!
//! Both queues are bounded. A full inbound queue blocks the read loop, which
//! stops reading from the socket and lets TCP flow control push back on the
//! peer. A full outbound queue makes `async_send` fail immediately.
//!
//! Every task runs under a supervisor that turns an error or a panic into a
//! call to [`Connection::close`], so one broken connection never takes the
//! server down.

use std::fmt;
use std::future::Future;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::{FutureExt, SinkExt, StreamExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::OwnedSemaphorePermit;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::protocol::{FrameCodec, Packet, Protocol};
use crate::server::config::ConnectionConfig;
use crate::server::extensions::Extensions;
use crate::server::handler::Handler;
use crate::stats::{ConnectionStats, ConnectionStatsSnapshot};

const PENDING: u8 = 0;
const OPEN: u8 = 1;
const CLOSED: u8 = 2;

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Created, not yet served
    Pending,
    /// Loops are running
    Open,
    /// Closed; terminal
    Closed,
}

/// Socket and queue end held until `serve()` hands them to the loops
struct Unserved<P: Protocol> {
    stream: TcpStream,
    outbound_rx: mpsc::Receiver<P::Packet>,
}

/// A live TCP connection
///
/// Identified by the remote address. Always handled through an `Arc`; the
/// loops hold their own references and the registry holds another.
pub struct Connection<P: Protocol, H> {
    id: String,
    local_addr: SocketAddr,
    remote_addr: SocketAddr,
    protocol: Option<Arc<P>>,
    handler: Option<Arc<H>>,
    config: ConnectionConfig,
    state: AtomicU8,
    shutdown: CancellationToken,
    outbound: mpsc::Sender<P::Packet>,
    unserved: Mutex<Option<Unserved<P>>>,
    permit: Mutex<Option<OwnedSemaphorePermit>>,
    extensions: Extensions,
    stats: ConnectionStats,
}

/// Builder for [`Connection`]
pub struct ConnectionBuilder<P: Protocol, H> {
    stream: TcpStream,
    protocol: Option<Arc<P>>,
    handler: Option<Arc<H>>,
    config: ConnectionConfig,
    permit: Option<OwnedSemaphorePermit>,
}

impl<P: Protocol, H: Handler<P>> ConnectionBuilder<P, H> {
    /// Set the framing protocol
    pub fn protocol(mut self, protocol: Arc<P>) -> Self {
        self.protocol = Some(protocol);
        self
    }

    /// Set the event handler
    pub fn handler(mut self, handler: Arc<H>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Set deadlines and queue capacities
    pub fn config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach a connection-limit permit, released on close
    pub(crate) fn permit(mut self, permit: OwnedSemaphorePermit) -> Self {
        self.permit = Some(permit);
        self
    }

    /// Build the connection
    ///
    /// Fails only if the socket addresses cannot be read.
    pub fn build(self) -> io::Result<Arc<Connection<P, H>>> {
        let local_addr = self.stream.local_addr()?;
        let remote_addr = self.stream.peer_addr()?;
        let (outbound, outbound_rx) = mpsc::channel(self.config.write_queue_capacity.max(1));

        Ok(Arc::new(Connection {
            id: remote_addr.to_string(),
            local_addr,
            remote_addr,
            protocol: self.protocol,
            handler: self.handler,
            config: self.config,
            state: AtomicU8::new(PENDING),
            shutdown: CancellationToken::new(),
            outbound,
            unserved: Mutex::new(Some(Unserved {
                stream: self.stream,
                outbound_rx,
            })),
            permit: Mutex::new(self.permit),
            extensions: Extensions::new(),
            stats: ConnectionStats::new(),
        }))
    }
}

impl<P: Protocol, H: Handler<P>> Connection<P, H> {
    /// Start building a connection around an accepted socket
    pub fn builder(stream: TcpStream) -> ConnectionBuilder<P, H> {
        ConnectionBuilder {
            stream,
            protocol: None,
            handler: None,
            config: ConnectionConfig::default(),
            permit: None,
        }
    }

    /// Start the read, write and dispatch loops
    ///
    /// Calls [`Handler::on_connected`] before spawning the loops and returns
    /// without waiting for them. Without a protocol or a handler the
    /// connection is closed and [`Error::Configuration`] is returned.
    pub fn serve(self: &Arc<Self>) -> Result<()> {
        let (Some(protocol), Some(handler)) = (self.protocol.clone(), self.handler.clone())
        else {
            tracing::warn!(conn = %self.id, "Connection has no protocol or handler");
            self.close();
            return Err(Error::Configuration);
        };

        if let Err(state) =
            self.state
                .compare_exchange(PENDING, OPEN, Ordering::AcqRel, Ordering::Acquire)
        {
            return Err(if state == CLOSED {
                Error::ConnectionClosed
            } else {
                Error::AlreadyServing
            });
        }

        // Lost a race with close()
        let Some(Unserved {
            stream,
            outbound_rx,
        }) = self.take_unserved()
        else {
            return Err(Error::ConnectionClosed);
        };

        tracing::debug!(conn = %self.id, local = %self.local_addr, "Connection open");
        handler.on_connected(self);

        let (read_half, write_half) = stream.into_split();
        let reader = FramedRead::new(read_half, FrameCodec::new(Arc::clone(&protocol)));
        let writer = FramedWrite::new(write_half, FrameCodec::new(protocol));
        let (inbound, inbound_rx) = mpsc::channel(self.config.read_queue_capacity.max(1));

        self.spawn_supervised("read", Arc::clone(self).read_loop(reader, inbound));
        self.spawn_supervised("write", Arc::clone(self).write_loop(writer, outbound_rx));
        self.spawn_supervised("dispatch", Arc::clone(self).dispatch_loop(handler, inbound_rx));

        Ok(())
    }

    /// Queue a packet for sending without waiting
    ///
    /// Fails with [`Error::BufferFull`] if the outbound queue is full; the
    /// packet is dropped.
    pub fn async_send(&self, packet: P::Packet) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }

        match self.outbound.try_send(packet) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.stats.record_rejected();
                Err(Error::BufferFull)
            }
            Err(TrySendError::Closed(_)) => Err(Error::ConnectionClosed),
        }
    }

    /// Queue a packet, waiting up to `timeout` for queue space
    pub async fn async_send_timeout(&self, packet: P::Packet, timeout: Duration) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }

        tokio::select! {
            _ = self.shutdown.cancelled() => Err(Error::ConnectionClosed),
            sent = tokio::time::timeout(timeout, self.outbound.send(packet)) => match sent {
                Ok(Ok(())) => Ok(()),
                Ok(Err(_)) => Err(Error::ConnectionClosed),
                Err(_) => {
                    self.stats.record_rejected();
                    Err(Error::WriteTimeout)
                }
            },
        }
    }

    /// Close the connection
    ///
    /// Safe to call any number of times from any task; only the first call
    /// has an effect. Stops all loops, calls [`Handler::on_disconnected`]
    /// once and releases the socket. Packets still in the outbound queue are
    /// discarded.
    pub fn close(&self) {
        if self.state.swap(CLOSED, Ordering::AcqRel) == CLOSED {
            return;
        }

        self.shutdown.cancel();

        if let Some(handler) = &self.handler {
            handler.on_disconnected(self);
        }

        // A served socket is released by its loops as they exit
        drop(self.take_unserved());
        drop(
            self.permit
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );

        tracing::debug!(conn = %self.id, "Connection closed");
    }
}

impl<P: Protocol, H> Connection<P, H> {
    /// Registry identity (the remote address)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Local socket address
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Remote socket address
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Local IP without the port
    pub fn local_ip(&self) -> IpAddr {
        self.local_addr.ip()
    }

    /// Remote IP without the port
    pub fn remote_ip(&self) -> IpAddr {
        self.remote_addr.ip()
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        match self.state.load(Ordering::Acquire) {
            PENDING => ConnectionState::Pending,
            OPEN => ConnectionState::Open,
            _ => ConnectionState::Closed,
        }
    }

    /// Whether `close()` has run
    pub fn is_closed(&self) -> bool {
        self.state.load(Ordering::Acquire) == CLOSED
    }

    /// Application data attached to this connection
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Connection settings
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Packet counters
    pub fn stats(&self) -> ConnectionStatsSnapshot {
        self.stats.snapshot()
    }

    fn take_unserved(&self) -> Option<Unserved<P>> {
        self.unserved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl<P: Protocol, H: Handler<P>> Connection<P, H> {
    fn spawn_supervised<F>(self: &Arc<Self>, task: &'static str, fut: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let conn = Arc::clone(self);
        tokio::spawn(async move {
            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => conn.report_error(task, &err),
                Err(panic) => {
                    let err = Error::Panic(panic_message(panic.as_ref()));
                    tracing::error!(conn = %conn.id, task, error = %err, "Connection task panicked");
                    conn.report_error(task, &err);
                }
            }
            conn.close();
        });
    }

    fn report_error(&self, task: &'static str, err: &Error) {
        // Failures caused by our own shutdown are not reported
        if self.is_closed() {
            tracing::trace!(conn = %self.id, task, error = %err, "Error after close");
            return;
        }
        if let Some(handler) = &self.handler {
            handler.on_error(self, err);
        }
    }

    async fn read_loop(
        self: Arc<Self>,
        mut reader: FramedRead<OwnedReadHalf, FrameCodec<P>>,
        inbound: mpsc::Sender<P::Packet>,
    ) -> Result<()> {
        let deadline = self.config.read_deadline();

        loop {
            let next = tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(()),
                next = read_frame(&mut reader, deadline) => next?,
            };

            let Some(packet) = next else {
                tracing::debug!(conn = %self.id, "Peer closed connection");
                return Ok(());
            };

            self.stats.record_received();
            tracing::trace!(conn = %self.id, len = packet.payload().len(), "Packet received");

            // Blocks while the dispatcher is behind
            tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(()),
                sent = inbound.send(packet) => {
                    if sent.is_err() {
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn write_loop(
        self: Arc<Self>,
        mut writer: FramedWrite<OwnedWriteHalf, FrameCodec<P>>,
        mut outbound: mpsc::Receiver<P::Packet>,
    ) -> Result<()> {
        let deadline = self.config.write_deadline();

        loop {
            let packet = tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(()),
                packet = outbound.recv() => match packet {
                    Some(packet) => packet,
                    None => return Ok(()),
                },
            };

            tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(()),
                written = write_frame(&mut writer, packet, deadline) => written?,
            }

            self.stats.record_sent();
        }
    }

    async fn dispatch_loop(
        self: Arc<Self>,
        handler: Arc<H>,
        mut inbound: mpsc::Receiver<P::Packet>,
    ) -> Result<()> {
        // Ends once the read loop drops its sender and the queue is drained
        while let Some(packet) = inbound.recv().await {
            handler.on_message(&self, packet).await;
        }
        Ok(())
    }
}

async fn read_frame<P: Protocol>(
    reader: &mut FramedRead<OwnedReadHalf, FrameCodec<P>>,
    deadline: Option<Duration>,
) -> Result<Option<P::Packet>> {
    let next = match deadline {
        Some(d) => tokio::time::timeout(d, reader.next())
            .await
            .map_err(|_| Error::ReadDeadline(d))?,
        None => reader.next().await,
    };
    Ok(next.transpose()?)
}

async fn write_frame<P: Protocol>(
    writer: &mut FramedWrite<OwnedWriteHalf, FrameCodec<P>>,
    packet: P::Packet,
    deadline: Option<Duration>,
) -> Result<()> {
    match deadline {
        Some(d) => tokio::time::timeout(d, writer.send(packet))
            .await
            .map_err(|_| Error::WriteDeadline(d))??,
        None => writer.send(packet).await?,
    }
    Ok(())
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl<P: Protocol, H> fmt::Debug for Connection<P, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("local_addr", &self.local_addr)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;
    use tokio::sync::Notify;

    use super::*;
    use crate::protocol::{LinePacket, LineProtocol};

    #[derive(Default)]
    struct Recorder {
        connected: AtomicUsize,
        disconnected: AtomicUsize,
        errors: Mutex<Vec<String>>,
        // Released by the test to let a "block" line finish
        gate: Notify,
    }

    impl Recorder {
        fn errors(&self) -> Vec<String> {
            self.errors.lock().unwrap().clone()
        }
    }

    impl Handler<LineProtocol> for Recorder {
        fn on_connected(&self, _conn: &Arc<Connection<LineProtocol, Self>>) {
            self.connected.fetch_add(1, Ordering::SeqCst);
        }

        async fn on_message(&self, conn: &Arc<Connection<LineProtocol, Self>>, packet: LinePacket) {
            if packet.as_str() == Some("panic") {
                panic!("handler blew up");
            }
            if packet.as_str() == Some("block") {
                self.gate.notified().await;
            }
            let _ = conn.async_send(packet);
        }

        fn on_disconnected(&self, _conn: &Connection<LineProtocol, Self>) {
            self.disconnected.fetch_add(1, Ordering::SeqCst);
        }

        fn on_error(&self, _conn: &Connection<LineProtocol, Self>, err: &Error) {
            self.errors.lock().unwrap().push(err.to_string());
        }
    }

    type TestConn = Arc<Connection<LineProtocol, Recorder>>;

    async fn socket_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        (accepted.unwrap().0, client.unwrap())
    }

    async fn connection(
        protocol: LineProtocol,
        config: ConnectionConfig,
    ) -> (TestConn, Arc<Recorder>, TcpStream) {
        let (server, client) = socket_pair().await;
        let recorder = Arc::new(Recorder::default());
        let conn = Connection::builder(server)
            .protocol(Arc::new(protocol))
            .handler(Arc::clone(&recorder))
            .config(config)
            .build()
            .unwrap();
        (conn, recorder, client)
    }

    async fn wait_closed(conn: &TestConn) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !conn.is_closed() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("connection did not close");
    }

    #[tokio::test]
    async fn test_serve_without_handler() {
        let (server, _client) = socket_pair().await;
        let conn: TestConn = Connection::builder(server)
            .protocol(Arc::new(LineProtocol::new()))
            .build()
            .unwrap();

        assert!(matches!(conn.serve(), Err(Error::Configuration)));
        assert!(conn.is_closed());
    }

    #[tokio::test]
    async fn test_serve_twice() {
        let (conn, recorder, _client) =
            connection(LineProtocol::new(), ConnectionConfig::default()).await;

        tokio_test::assert_ok!(conn.serve());
        assert!(matches!(conn.serve(), Err(Error::AlreadyServing)));
        assert_eq!(recorder.connected.load(Ordering::SeqCst), 1);
        assert_eq!(conn.state(), ConnectionState::Open);
        conn.close();
    }

    #[tokio::test]
    async fn test_echo_round_trip() {
        let (conn, recorder, client) =
            connection(LineProtocol::new(), ConnectionConfig::default()).await;
        assert_eq!(conn.state(), ConnectionState::Pending);
        assert!(!conn.is_closed());

        conn.serve().unwrap();
        assert_eq!(recorder.connected.load(Ordering::SeqCst), 1);

        let (read_half, mut write_half) = client.into_split();
        let mut lines = BufReader::new(read_half).lines();
        write_half.write_all(b"hello\nworld\n").await.unwrap();

        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("hello"));
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("world"));

        let stats = conn.stats();
        assert_eq!(stats.packets_received, 2);
        conn.close();
    }

    #[tokio::test]
    async fn test_concurrent_close_invokes_hook_once() {
        let (conn, recorder, _client) =
            connection(LineProtocol::new(), ConnectionConfig::default()).await;
        conn.serve().unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let conn = Arc::clone(&conn);
                tokio::spawn(async move { conn.close() })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(conn.is_closed());
        assert_eq!(recorder.disconnected.load(Ordering::SeqCst), 1);
        assert!(recorder.errors().is_empty());
    }

    #[tokio::test]
    async fn test_async_send_buffer_full() {
        let config = ConnectionConfig {
            write_queue_capacity: 1,
            ..Default::default()
        };
        // Not served yet, so nothing drains the outbound queue
        let (conn, _recorder, client) = connection(LineProtocol::new(), config).await;

        tokio_test::assert_ok!(conn.async_send(LinePacket::from("first")));
        assert!(matches!(
            conn.async_send(LinePacket::from("second")),
            Err(Error::BufferFull)
        ));
        assert_eq!(conn.stats().sends_rejected, 1);

        // The rejected packet never reaches the wire
        conn.serve().unwrap();
        let mut lines = BufReader::new(client).lines();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("first"));
        conn.async_send(LinePacket::from("last")).unwrap();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("last"));

        conn.close();
        assert!(matches!(
            conn.async_send(LinePacket::from("third")),
            Err(Error::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_async_send_timeout() {
        let config = ConnectionConfig {
            write_queue_capacity: 1,
            ..Default::default()
        };
        let (conn, _recorder, _client) = connection(LineProtocol::new(), config).await;

        conn.async_send(LinePacket::from("first")).unwrap();
        let result = conn
            .async_send_timeout(LinePacket::from("second"), Duration::from_millis(20))
            .await;
        assert!(matches!(result, Err(Error::WriteTimeout)));
    }

    #[tokio::test]
    async fn test_slow_handler_stops_reading() {
        let config = ConnectionConfig {
            read_queue_capacity: 1,
            ..Default::default()
        };
        let (conn, recorder, client) = connection(LineProtocol::new(), config).await;
        conn.serve().unwrap();

        let (read_half, mut write_half) = client.into_split();
        write_half.write_all(b"block
a
b
c
d
e
").await.unwrap();

        // One packet in the handler, one queued, one waiting on the queue
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(conn.stats().packets_received, 3);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(conn.stats().packets_received, 3);

        recorder.gate.notify_one();

        let mut lines = BufReader::new(read_half).lines();
        for expected in ["block", "a", "b", "c", "d", "e"] {
            assert_eq!(lines.next_line().await.unwrap().as_deref(), Some(expected));
        }
        assert_eq!(conn.stats().packets_received, 6);
        conn.close();
    }

    #[tokio::test]
    async fn test_write_deadline_reports_and_closes() {
        let config = ConnectionConfig {
            write_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        // The peer never reads, so a large frame cannot be flushed
        let (conn, recorder, _client) =
            connection(LineProtocol::new().max_line_length(64 << 20), config).await;
        conn.serve().unwrap();

        conn.async_send(LinePacket::from("x".repeat(32 << 20))).unwrap();
        wait_closed(&conn).await;

        let errors = recorder.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("write deadline"));
        assert_eq!(recorder.disconnected.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_peer_eof_closes_silently() {
        let (conn, recorder, client) =
            connection(LineProtocol::new(), ConnectionConfig::default()).await;
        conn.serve().unwrap();

        drop(client);
        wait_closed(&conn).await;

        assert_eq!(recorder.disconnected.load(Ordering::SeqCst), 1);
        assert!(recorder.errors().is_empty());
    }

    #[tokio::test]
    async fn test_decode_error_reports_and_closes() {
        let (conn, recorder, mut client) = connection(
            LineProtocol::new().max_line_length(4),
            ConnectionConfig::default(),
        )
        .await;
        conn.serve().unwrap();

        client.write_all(b"far too long\n").await.unwrap();
        wait_closed(&conn).await;

        let errors = recorder.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("exceeds maximum"));

        // The peer sees the socket close
        let mut buf = [0u8; 16];
        let n = tokio::time::timeout(Duration::from_secs(2), client.read(&mut buf))
            .await
            .unwrap()
            .unwrap_or(0);
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_read_deadline() {
        let config = ConnectionConfig {
            read_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let (conn, recorder, _client) = connection(LineProtocol::new(), config).await;
        conn.serve().unwrap();

        wait_closed(&conn).await;

        let errors = recorder.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("read deadline"));
    }

    #[tokio::test]
    async fn test_handler_panic_closes_connection() {
        let (conn, recorder, mut client) =
            connection(LineProtocol::new(), ConnectionConfig::default()).await;
        conn.serve().unwrap();

        client.write_all(b"panic\n").await.unwrap();
        wait_closed(&conn).await;

        let errors = recorder.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("handler blew up"));
        assert_eq!(recorder.disconnected.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_accessors_and_extensions() {
        let (conn, _recorder, client) =
            connection(LineProtocol::new(), ConnectionConfig::default()).await;

        assert_eq!(conn.remote_addr(), client.local_addr().unwrap());
        assert_eq!(conn.local_addr(), client.peer_addr().unwrap());
        assert_eq!(conn.id(), client.local_addr().unwrap().to_string());
        assert_eq!(conn.remote_ip().to_string(), "127.0.0.1");
        assert_eq!(conn.local_ip().to_string(), "127.0.0.1");

        conn.extensions().insert(String::from("alice"));
        assert_eq!(conn.extensions().get::<String>().as_deref(), Some("alice"));
    }
}
