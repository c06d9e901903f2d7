//! Chat server listener
//!
//! Handles TCP accept loop, WebSocket upgrade and hands each connection to
//! the [`ConnectionManager`].

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::chat::{ChatInteractor, Notifier};
use crate::connection::{Authenticator, WsConnection};
use crate::error::Result;
use crate::registry::ConnectionRegistry;
use crate::server::config::ServerConfig;
use crate::server::manager::ConnectionManager;

/// WebSocket chat server
pub struct ChatServer {
    manager: Arc<ConnectionManager>,
    authenticator: Arc<dyn Authenticator>,
    next_connection_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl ChatServer {
    /// Create a new server
    ///
    /// Starts the worker pool, so it must be called from within a tokio
    /// runtime.
    pub fn new(
        config: ServerConfig,
        interactor: ChatInteractor,
        notifier: Arc<dyn Notifier>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            manager: Arc::new(ConnectionManager::new(config, interactor, notifier)),
            authenticator,
            next_connection_id: AtomicU64::new(1),
            connection_semaphore,
        }
    }

    /// Get a reference to the connection manager
    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// Get a reference to the connection registry
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        self.manager.registry()
    }

    /// Run the server
    ///
    /// This method blocks until the listener fails to bind.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.bind_addr()).await?;
        tracing::info!(addr = %self.bind_addr(), "Chat server listening");

        self.accept_loop(&listener).await
    }

    /// Run the server with graceful shutdown
    ///
    /// Once `shutdown` resolves, accepting stops and the worker queue is
    /// drained.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.bind_addr()).await?;
        tracing::info!(addr = %self.bind_addr(), "Chat server listening");

        self.serve_until(listener, shutdown).await
    }

    /// Serve an already bound listener until `shutdown` resolves
    pub async fn serve_until<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&listener) => result,
        };

        self.manager.shutdown().await;

        result
    }

    async fn accept_loop(&self, listener: &TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        let connection_id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            connection_id = connection_id,
            peer = %peer_addr,
            "New connection"
        );

        let config = self.manager.config();
        if config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::error!(error = %e, "Failed to configure socket");
                return;
            }
        }

        let manager = Arc::clone(&self.manager);
        let authenticator = Arc::clone(&self.authenticator);
        let config = config.connection();

        tokio::spawn(async move {
            let _permit = permit;

            let socket = match timeout(config.handshake_timeout, tokio_tungstenite::accept_async(socket)).await {
                Ok(Ok(socket)) => socket,
                Ok(Err(e)) => {
                    tracing::debug!(connection_id = connection_id, error = %e, "WebSocket upgrade failed");
                    return;
                }
                Err(_) => {
                    tracing::debug!(connection_id = connection_id, "WebSocket upgrade timed out");
                    return;
                }
            };

            let connection = WsConnection::new(connection_id, socket, authenticator, config);
            match manager.join(connection).await {
                Ok(session) => {
                    if let Err(e) = session.await {
                        tracing::error!(connection_id = connection_id, error = %e, "Session task failed");
                    }
                }
                Err(e) => {
                    tracing::debug!(connection_id = connection_id, error = %e, "Connection error");
                }
            }

            tracing::debug!(connection_id = connection_id, "Connection closed");
        });
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.manager.config().bind_addr
    }
}
