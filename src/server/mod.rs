//! Chat server
//!
//! ```text
//!   TcpListener ──► ChatServer ──► WsConnection ──► ConnectionManager::join
//!                                                        │
//!                          ┌─────────────────────────────┤
//!                          ▼                             ▼
//!                   ConnectionRegistry            SessionHandler
//!                          ▲                             │ SendJob
//!                          │ lookup                      ▼
//!                        fan_out ◄──────────────── WorkerPool (N)
//!                          │
//!                          └──► Notifier (offline conversants)
//! ```

pub mod config;
pub mod fanout;
pub mod listener;
pub mod manager;
pub mod worker;

pub use config::{ConnectionConfig, ServerConfig, DEFAULT_WORKERS};
pub use fanout::{fan_out, FanoutReport};
pub use listener::ChatServer;
pub use manager::ConnectionManager;
pub use worker::{JobQueue, SendJob, WorkerPool};
