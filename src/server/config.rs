//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

/// Default number of message workers
pub const DEFAULT_WORKERS: usize = 40;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Credentials must arrive within this time
    pub handshake_timeout: Duration,

    /// Deadline for each outbound write
    pub write_timeout: Duration,

    /// How long a send may wait for room in the worker queue
    pub enqueue_timeout: Duration,

    /// Number of message workers
    pub workers: usize,

    /// Capacity of the shared worker queue
    pub queue_capacity: usize,

    /// Per-connection inbound request buffer
    pub request_buffer: usize,

    /// Per-connection outbound response buffer
    pub response_buffer: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 0, // Unlimited
            handshake_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(5),
            enqueue_timeout: Duration::from_secs(10),
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_WORKERS,
            request_buffer: 16,
            response_buffer: 64,
            tcp_nodelay: true,
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set handshake timeout
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set per-write deadline
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set worker queue enqueue timeout
    pub fn enqueue_timeout(mut self, timeout: Duration) -> Self {
        self.enqueue_timeout = timeout;
        self
    }

    /// Set worker count (at least one)
    ///
    /// The queue capacity follows unless set explicitly afterwards.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self.queue_capacity = self.workers;
        self
    }

    /// Set worker queue capacity (at least one)
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Settings handed to each connection
    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            handshake_timeout: self.handshake_timeout,
            write_timeout: self.write_timeout,
            request_buffer: self.request_buffer,
            response_buffer: self.response_buffer,
        }
    }
}

/// Per-connection transport settings
#[derive(Debug, Clone, Copy)]
pub struct ConnectionConfig {
    /// Credentials must arrive within this time
    pub handshake_timeout: Duration,
    /// Deadline for each outbound write
    pub write_timeout: Duration,
    /// Inbound request buffer
    pub request_buffer: usize,
    /// Outbound response buffer
    pub response_buffer: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ServerConfig::default().connection()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.max_connections, 0);
        assert_eq!(config.handshake_timeout, Duration::from_secs(10));
        assert_eq!(config.write_timeout, Duration::from_secs(5));
        assert_eq!(config.enqueue_timeout, Duration::from_secs(10));
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.queue_capacity, DEFAULT_WORKERS);
        assert!(config.tcp_nodelay);
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr.port(), 9000);
    }

    #[test]
    fn test_builder_workers_sets_queue() {
        let config = ServerConfig::default().workers(4);

        assert_eq!(config.workers, 4);
        assert_eq!(config.queue_capacity, 4);
    }

    #[test]
    fn test_builder_workers_floor() {
        let config = ServerConfig::default().workers(0).queue_capacity(0);

        assert_eq!(config.workers, 1);
        assert_eq!(config.queue_capacity, 1);
    }

    #[test]
    fn test_connection_config_follows_server() {
        let config = ServerConfig::default()
            .handshake_timeout(Duration::from_millis(250))
            .write_timeout(Duration::from_millis(100));
        let conn = config.connection();

        assert_eq!(conn.handshake_timeout, Duration::from_millis(250));
        assert_eq!(conn.write_timeout, Duration::from_millis(100));
        assert_eq!(conn.response_buffer, config.response_buffer);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:8081".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .max_connections(50)
            .workers(8)
            .queue_capacity(32)
            .enqueue_timeout(Duration::from_secs(1));

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.max_connections, 50);
        assert_eq!(config.workers, 8);
        assert_eq!(config.queue_capacity, 32);
        assert_eq!(config.enqueue_timeout, Duration::from_secs(1));
    }
}
