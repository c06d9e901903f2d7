//! Connection manager
//!
//! Owns the shared services and turns an accepted [`Connection`] into a
//! registered session.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::chat::{ChatInteractor, Notifier};
use crate::connection::Connection;
use crate::error::{AuthError, Result};
use crate::registry::ConnectionRegistry;
use crate::session::{SessionContext, SessionHandler, SessionState};
use crate::stats::{ChatStats, StatsSnapshot};

use super::config::ServerConfig;
use super::worker::{JobQueue, WorkerContext, WorkerPool};

/// Joins connections to the chat
pub struct ConnectionManager {
    config: ServerConfig,
    interactor: ChatInteractor,
    registry: Arc<ConnectionRegistry>,
    stats: Arc<ChatStats>,
    queue: JobQueue,
    pool: Mutex<Option<WorkerPool>>,
}

impl ConnectionManager {
    /// Create a manager and start its worker pool
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: ServerConfig, interactor: ChatInteractor, notifier: Arc<dyn Notifier>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let stats = Arc::new(ChatStats::new());

        let pool = WorkerPool::spawn(
            config.workers,
            config.queue_capacity,
            config.enqueue_timeout,
            WorkerContext {
                interactor: interactor.clone(),
                registry: Arc::clone(&registry),
                notifier,
                stats: Arc::clone(&stats),
            },
        );

        Self {
            config,
            interactor,
            registry,
            stats,
            queue: pool.queue(),
            pool: Mutex::new(Some(pool)),
        }
    }

    /// Authorize, persist and register a connection, then start its session
    ///
    /// On error the connection has been torn down and was never registered.
    /// The returned task resolves once the session has terminated.
    pub async fn join<C: Connection>(&self, mut conn: C) -> Result<JoinHandle<SessionState>> {
        let connection_id = conn.id();

        if let Err(e) = conn.authorize().await {
            self.stats.auth_failed();
            tracing::info!(connection_id = connection_id, error = %e, "Authorization failed");
            return Err(e);
        }

        let Some(conversant) = conn.conversant().cloned() else {
            conn.leave().fire();
            return Err(AuthError::Rejected("no identity after authorize".into()).into());
        };

        if let Err(e) = self.interactor.upsert_conversant(&conversant).await {
            tracing::warn!(
                connection_id = connection_id,
                conversant = %conversant.id,
                error = %e,
                "Conversant upsert failed, dropping connection"
            );
            conn.leave().fire();
            return Err(e);
        }

        let handler = SessionHandler::new(conn, self.session_context())?;
        self.registry
            .add(conversant.id, handler.handle().clone())
            .await;
        self.stats.connection_opened();

        tracing::debug!(
            connection_id = connection_id,
            conversant = %conversant.id,
            name = %conversant.display_name,
            "Connection joined"
        );

        Ok(tokio::spawn(handler.run()))
    }

    fn session_context(&self) -> SessionContext {
        SessionContext {
            interactor: self.interactor.clone(),
            queue: self.queue.clone(),
            registry: Arc::clone(&self.registry),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Get a reference to the connection registry
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Configuration the manager and its listener run with
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Current server counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Stop accepting sends and drain the worker queue
    ///
    /// Sessions keep running; sends they attempt afterwards are answered
    /// with an error.
    pub async fn shutdown(&self) {
        let pool = self.pool.lock().await.take();
        if let Some(pool) = pool {
            pool.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio_test::{assert_err, assert_ok};
    use uuid::Uuid;

    use super::*;
    use crate::chat::{Conversant, ConversantRepo, MemoryStore, NoopNotifier};
    use crate::connection::testing::{mock_connection, rejecting_connection};
    use crate::error::{Error, RepositoryError};
    use crate::protocol::{CreateConversationRequest, Request, Response, SendMessageRequest};
    use crate::session::SessionPhase;

    fn manager_with(store: Arc<MemoryStore>, conversants: Arc<dyn ConversantRepo>) -> ConnectionManager {
        let interactor = ChatInteractor::new(store.clone(), store, conversants);
        ConnectionManager::new(
            ServerConfig::default().workers(2),
            interactor,
            Arc::new(NoopNotifier::new()),
        )
    }

    fn manager() -> (ConnectionManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (manager_with(store.clone(), store.clone()), store)
    }

    struct BrokenConversants;

    #[async_trait]
    impl ConversantRepo for BrokenConversants {
        async fn upsert(&self, _c: &Conversant) -> std::result::Result<Conversant, RepositoryError> {
            Err(RepositoryError::Backend("read-only replica".into()))
        }
    }

    #[tokio::test]
    async fn test_join_registers_and_upserts() {
        let (manager, store) = manager();
        let ana = Conversant::new(Uuid::new_v4(), "ana");
        let (conn, _peer) = mock_connection(1, ana.clone());

        assert_ok!(manager.join(conn).await);
        assert!(manager.registry().is_connected(ana.id).await);
        assert_eq!(store.conversant(ana.id).await, Some(ana));
        assert_eq!(manager.stats().connections_active, 1);
    }

    #[tokio::test]
    async fn test_rejected_authorize_never_registers() {
        let (manager, _store) = manager();
        let ana = Conversant::new(Uuid::new_v4(), "ana");
        let (conn, peer) = rejecting_connection(1, ana.clone());

        let err = assert_err!(manager.join(conn).await);
        assert!(matches!(err, Error::Authorization(_)));
        assert!(peer.leave.is_fired());
        assert!(!manager.registry().is_connected(ana.id).await);
        assert_eq!(manager.stats().auth_failures, 1);
    }

    #[tokio::test]
    async fn test_upsert_failure_tears_down() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(store, Arc::new(BrokenConversants));
        let ana = Conversant::new(Uuid::new_v4(), "ana");
        let (conn, peer) = mock_connection(1, ana.clone());

        let err = assert_err!(manager.join(conn).await);
        assert!(matches!(err, Error::Persistence(_)));
        assert!(peer.leave.is_fired());
        assert!(!manager.registry().is_connected(ana.id).await);
    }

    #[tokio::test]
    async fn test_session_end_deregisters() {
        let (manager, _store) = manager();
        let ana = Conversant::new(Uuid::new_v4(), "ana");
        let (conn, peer) = mock_connection(1, ana.clone());

        let session = manager.join(conn).await.unwrap();
        peer.leave.fire();
        let state = tokio::time::timeout(Duration::from_secs(2), session)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(state.phase, SessionPhase::Terminated);
        assert!(!manager.registry().is_connected(ana.id).await);
        assert_eq!(manager.stats().connections_active, 0);
    }

    #[tokio::test]
    async fn test_send_after_shutdown_reports_error() {
        let (manager, _store) = manager();
        let ana = Conversant::new(Uuid::new_v4(), "ana");
        let (conn, mut peer) = mock_connection(1, ana);
        let _session = manager.join(conn).await.unwrap();

        peer.send(Request::CreateConversation(CreateConversationRequest {
            name: "pair".into(),
            conversants: vec![Uuid::new_v4().to_string()],
        }))
        .await;
        let Response::NewConversation(conversation) = peer.recv().await else {
            panic!("expected conversation");
        };

        manager.shutdown().await;
        peer.send(Request::SendMessage(SendMessageRequest {
            message: "anyone?".into(),
            conversation_id: conversation.id.to_string(),
        }))
        .await;
        assert_eq!(peer.recv().await, Response::error("internal server error"));
    }
}
