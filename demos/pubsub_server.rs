//! Topic chat server
//!
//! Run with: cargo run --example pubsub_server [BIND_ADDR] [READ_TIMEOUT_SECS] [WRITE_TIMEOUT_SECS]
//!
//! Examples:
//!   cargo run --example pubsub_server                   # binds to localhost:9001
//!   cargo run --example pubsub_server 0.0.0.0:9002      # binds to 0.0.0.0:9002
//!   cargo run --example pubsub_server localhost:9001 30 # idle clients dropped after 30s
//!
//! ## Talking to it
//!
//! Open two terminals with `nc localhost 9001`, then:
//!
//!   S news              (first terminal)  -> Subscribed to topic: news
//!   P news hello        (second terminal) -> first terminal prints "hello"
//!   UNS news            (first terminal)  -> Unsubscribed from topic: news

use std::sync::Arc;
use std::time::Duration;

use asynctcp::chat::{ChatHandler, ChatRegistry, ChatServer};
use asynctcp::protocol::LineProtocol;
use asynctcp::{Broker, ServerConfig};

const DEFAULT_BIND_ADDR: &str = "localhost:9001";

fn parse_secs(arg: Option<&String>, name: &str) -> Result<Duration, String> {
    match arg {
        None => Ok(Duration::ZERO),
        Some(s) => s
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| format!("Invalid {}: '{}'. Expected whole seconds", name, s)),
    }
}

fn print_usage() {
    eprintln!("Usage: pubsub_server [BIND_ADDR] [READ_TIMEOUT_SECS] [WRITE_TIMEOUT_SECS]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR           Address to bind to (default: {})", DEFAULT_BIND_ADDR);
    eprintln!("  READ_TIMEOUT_SECS   Drop clients idle this long (default: 0, disabled)");
    eprintln!("  WRITE_TIMEOUT_SECS  Drop clients that stop reading (default: 0, disabled)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let bind_addr = args.get(1).map(String::as_str).unwrap_or(DEFAULT_BIND_ADDR);
    let timeouts = parse_secs(args.get(2), "read timeout")
        .and_then(|read| Ok((read, parse_secs(args.get(3), "write timeout")?)));
    let (read_timeout, write_timeout) = match timeouts {
        Ok(timeouts) => timeouts,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("asynctcp=info".parse()?)
                .add_directive("pubsub_server=debug".parse()?),
        )
        .init();

    let config = ServerConfig::default()
        .read_timeout(read_timeout)
        .write_timeout(write_timeout);

    let registry = Arc::new(ChatRegistry::new());
    let handler = ChatHandler::new(Broker::new(), Arc::clone(&registry));
    let server = Arc::new(ChatServer::with_registry(
        config,
        LineProtocol::new(),
        handler,
        registry,
    ));

    let addr = server.run(bind_addr).await?;
    tracing::info!(addr = %addr, "Chat server ready, press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    println!("\nShutting down...");
    server.close().await;

    let stats = server.stats().await;
    println!(
        "Served {} connections ({} rejected) in {:?}",
        stats.total_connections, stats.rejected_connections, stats.uptime
    );

    Ok(())
}
