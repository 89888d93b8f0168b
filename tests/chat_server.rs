//! End-to-end chat scenarios over loopback TCP

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use asynctcp::chat::{ChatHandler, ChatRegistry, ChatServer};
use asynctcp::protocol::LineProtocol;
use asynctcp::{Broker, Error, ServerConfig};

struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let (read_half, writer) = TcpStream::connect(addr).await.unwrap().into_split();
        Self {
            lines: BufReader::new(read_half).lines(),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
    }

    async fn recv(&mut self) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(2), self.lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .unwrap_or(None)
    }
}

async fn start() -> (Arc<ChatServer>, SocketAddr) {
    start_with(ServerConfig::default()).await
}

async fn start_with(config: ServerConfig) -> (Arc<ChatServer>, SocketAddr) {
    let registry = Arc::new(ChatRegistry::new());
    let handler = ChatHandler::new(Broker::new(), Arc::clone(&registry));
    let server = Arc::new(ChatServer::with_registry(
        config,
        LineProtocol::new(),
        handler,
        registry,
    ));
    let addr = server.run("127.0.0.1:0").await.unwrap();
    (server, addr)
}

async fn wait_registered(server: &ChatServer, n: usize) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while server.registry().len().await < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("connections were not registered");
}

#[tokio::test]
async fn test_subscribe_is_acknowledged() {
    let (server, addr) = start().await;
    let mut client = Client::connect(addr).await;

    client.send("S topicA\n").await;

    assert_eq!(client.recv().await.as_deref(), Some("Subscribed to topic: topicA"));
    server.close().await;
}

#[tokio::test]
async fn test_publish_is_delivered_to_subscriber() {
    let (server, addr) = start().await;
    let mut a = Client::connect(addr).await;
    let mut b = Client::connect(addr).await;
    wait_registered(&server, 2).await;

    a.send("S topicA\n").await;
    assert_eq!(a.recv().await.as_deref(), Some("Subscribed to topic: topicA"));

    b.send("P topicA hello\n").await;

    assert_eq!(a.recv().await.as_deref(), Some("hello"));
    server.close().await;
}

#[tokio::test]
async fn test_malformed_line_keeps_connection() {
    let (server, addr) = start().await;
    let mut client = Client::connect(addr).await;

    client.send("HELLO\n").await;
    assert_eq!(
        client.recv().await.as_deref(),
        Some("Invalid message format. Expected: <command> <data>")
    );

    client.send("S still-here\n").await;
    assert_eq!(
        client.recv().await.as_deref(),
        Some("Subscribed to topic: still-here")
    );
    server.close().await;
}

#[tokio::test]
async fn test_unknown_command_and_crlf() {
    let (server, addr) = start().await;
    let mut client = Client::connect(addr).await;

    client.send("JOIN topicA\r\n").await;

    assert_eq!(client.recv().await.as_deref(), Some("Unknown command: JOIN"));
    server.close().await;
}

#[tokio::test]
async fn test_unsubscribed_client_stops_receiving() {
    let (server, addr) = start().await;
    let mut a = Client::connect(addr).await;
    let mut b = Client::connect(addr).await;
    wait_registered(&server, 2).await;

    a.send("S topicA\n").await;
    a.recv().await;
    b.send("S topicA\n").await;
    b.recv().await;

    a.send("UNS topicA\n").await;
    assert_eq!(a.recv().await.as_deref(), Some("Unsubscribed from topic: topicA"));

    // b hears its own publish, a does not
    b.send("P topicA one\n").await;
    assert_eq!(b.recv().await.as_deref(), Some("one"));

    a.send("S topicB\n").await;
    assert_eq!(a.recv().await.as_deref(), Some("Subscribed to topic: topicB"));
    server.close().await;
}

#[tokio::test]
async fn test_lines_split_across_writes() {
    let (server, addr) = start().await;
    let mut client = Client::connect(addr).await;

    client.send("S to").await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    client.send("picA\nS topicB\n").await;

    assert_eq!(client.recv().await.as_deref(), Some("Subscribed to topic: topicA"));
    assert_eq!(client.recv().await.as_deref(), Some("Subscribed to topic: topicB"));
    server.close().await;
}

#[tokio::test]
async fn test_close_disconnects_every_client() {
    let (server, addr) = start().await;
    let mut clients = Vec::new();
    for _ in 0..8 {
        clients.push(Client::connect(addr).await);
    }
    wait_registered(&server, 8).await;
    let registered = server.registry().snapshot().await;

    server.close().await;

    assert!(registered.values().all(|conn| conn.is_closed()));
    for client in &mut clients {
        assert_eq!(client.recv().await, None);
    }
}

#[tokio::test]
async fn test_idle_client_dropped_after_read_timeout() {
    let (server, addr) =
        start_with(ServerConfig::default().read_timeout(Duration::from_millis(100))).await;
    let mut client = Client::connect(addr).await;

    assert_eq!(client.recv().await, None);
    server.close().await;
}

#[tokio::test]
async fn test_bind_failure() {
    let (server, addr) = start().await;

    let registry = Arc::new(ChatRegistry::new());
    let handler = ChatHandler::new(Broker::new(), Arc::clone(&registry));
    let other = Arc::new(ChatServer::with_registry(
        ServerConfig::default(),
        LineProtocol::new(),
        handler,
        registry,
    ));

    let err = other.run(&addr.to_string()).await.unwrap_err();
    assert!(matches!(err, Error::Bind { .. }));
    server.close().await;
}
