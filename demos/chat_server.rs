//! In-memory chat server
//!
//! Run with: cargo run --example chat_server [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example chat_server                    # binds to 0.0.0.0:8080
//!   cargo run --example chat_server localhost          # binds to 127.0.0.1:8080
//!   cargo run --example chat_server 127.0.0.1:9000     # binds to 127.0.0.1:9000
//!
//! ## Talking to it
//!
//! With websocat:
//!   websocat ws://localhost:8080
//!
//! The first frame is the credential map. This demo trusts whatever `id`
//! (a UUID) and `name` it is given:
//!   {"id": "6f1c5a3e-8a35-4d0e-9a57-0b8c2f2f4e11", "name": "ana"}
//!
//! Then send requests:
//!   {"type": "createConversation", "data": {"name": "pair", "conversants": ["<other uuid>"]}}
//!   {"type": "sendMessage", "data": {"conversationId": "<uuid>", "message": "hi"}}
//!   {"type": "retrieveConversation", "data": {"conversationId": "<uuid>", "limit": 20, "offset": 0}}
//!
//! Messages to members who are not connected show up as "Offline
//! notification" log lines.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chatty_rs::chat::{ChatInteractor, Conversant, MemoryStore, NoopNotifier};
use chatty_rs::connection::Authenticator;
use chatty_rs::error::AuthError;
use chatty_rs::protocol::Credentials;
use chatty_rs::{ChatServer, ServerConfig};

/// Accepts any well-formed identity
fn trusting(creds: &Credentials) -> Result<Conversant, AuthError> {
    let id = creds
        .get("id")
        .ok_or_else(|| AuthError::Rejected("missing id".into()))?;
    let id = id
        .parse()
        .map_err(|_| AuthError::Rejected(format!("id is not a UUID: {}", id)))?;
    let name = creds.get("name").cloned().unwrap_or_default();

    Ok(Conversant::new(id, name))
}

/// Parse bind address from command line argument.
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:8080
/// - "localhost:9000" -> 127.0.0.1:9000
/// - "127.0.0.1" -> 127.0.0.1:8080
/// - "0.0.0.0:9000" -> 0.0.0.0:9000
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    const DEFAULT_PORT: u16 = 8080;

    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: chat_server [BIND_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:8080)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let config = match args.get(1) {
        Some(addr_str) => match parse_bind_addr(addr_str) {
            Ok(addr) => ServerConfig::with_addr(addr),
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        },
        None => ServerConfig::default(),
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chatty_rs=debug".parse()?)
                .add_directive("chat_server=debug".parse()?),
        )
        .init();

    let store = Arc::new(MemoryStore::new());
    let interactor = ChatInteractor::new(store.clone(), store.clone(), store);
    let authenticator: Arc<dyn Authenticator> = Arc::new(trusting);

    println!("Starting chat server on ws://{}", config.bind_addr);

    let server = Arc::new(ChatServer::new(
        config,
        interactor,
        Arc::new(NoopNotifier::new()),
        authenticator,
    ));

    // Periodic stats
    let manager = Arc::clone(server.manager());
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(30));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let stats = manager.stats();
            tracing::info!(
                connections = stats.connections_active,
                messages = stats.messages_sent,
                deliveries = stats.deliveries,
                notifications = stats.notifications,
                "Stats"
            );
        }
    });

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        println!("\nShutting down...");
    };

    if let Err(e) = server.run_until(shutdown).await {
        eprintln!("Server error: {}", e);
    }

    Ok(())
}
