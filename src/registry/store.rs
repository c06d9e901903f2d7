//! Connection registry implementation
//!
//! Maps each conversant to the handles of its live connections. The map is
//! only reachable through these methods.

use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use super::entry::ConnectionHandle;

/// Registry of live connections by conversant
///
/// Thread-safe via `RwLock`. Fan-out lookups take the shared lock; joins and
/// leaves take the exclusive one.
pub struct ConnectionRegistry {
    /// Conversant ID to its (never empty) connection set
    connections: RwLock<HashMap<Uuid, Vec<ConnectionHandle>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a connection under its conversant
    pub async fn add(&self, conversant_id: Uuid, handle: ConnectionHandle) {
        let mut connections = self.connections.write().await;
        let entry = connections.entry(conversant_id).or_default();
        entry.push(handle);

        tracing::info!(
            conversant = %conversant_id,
            devices = entry.len(),
            "Connection registered"
        );
    }

    /// Remove exactly the connection behind `handle`
    ///
    /// Siblings are kept even if they report the same connection ID.
    /// Deletes the conversant's entry once its last connection is gone.
    /// Returns whether anything was removed.
    pub async fn remove(&self, conversant_id: Uuid, handle: &ConnectionHandle) -> bool {
        let mut connections = self.connections.write().await;

        let Some(entry) = connections.get_mut(&conversant_id) else {
            return false;
        };

        let Some(index) = entry.iter().position(|h| h.same_connection(handle)) else {
            return false;
        };
        entry.swap_remove(index);
        let remaining = entry.len();

        if remaining == 0 {
            connections.remove(&conversant_id);
        }

        tracing::info!(
            conversant = %conversant_id,
            connection_id = handle.id(),
            remaining = remaining,
            "Connection deregistered"
        );

        true
    }

    /// Snapshot of a conversant's live connections (possibly empty)
    pub async fn lookup(&self, conversant_id: Uuid) -> Vec<ConnectionHandle> {
        self.connections
            .read()
            .await
            .get(&conversant_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether a conversant has at least one live connection
    pub async fn is_connected(&self, conversant_id: Uuid) -> bool {
        self.connections.read().await.contains_key(&conversant_id)
    }

    /// Number of conversants with a live connection
    pub async fn conversant_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Total number of live connections
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.values().map(Vec::len).sum()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use super::*;
    use crate::connection::{ConnectionId, Leave};
    use crate::protocol::Response;

    fn handle(id: ConnectionId, conversant_id: Uuid) -> (ConnectionHandle, mpsc::Receiver<Response>) {
        let (tx, rx) = mpsc::channel(8);
        (ConnectionHandle::new(id, conversant_id, tx, Leave::new()), rx)
    }

    #[tokio::test]
    async fn test_add_then_remove_leaves_nothing() {
        let registry = ConnectionRegistry::new();
        let id = Uuid::new_v4();
        let (h, _rx) = handle(1, id);

        registry.add(id, h.clone()).await;
        assert!(registry.is_connected(id).await);

        assert!(registry.remove(id, &h).await);
        assert!(registry.lookup(id).await.is_empty());
        assert!(!registry.is_connected(id).await);
        assert_eq!(registry.conversant_count().await, 0);
    }

    #[tokio::test]
    async fn test_remove_one_of_two_devices() {
        let registry = ConnectionRegistry::new();
        let id = Uuid::new_v4();
        let (phone, _rx1) = handle(1, id);
        let (laptop, _rx2) = handle(2, id);

        registry.add(id, phone.clone()).await;
        registry.add(id, laptop).await;
        assert_eq!(registry.connection_count().await, 2);
        assert_eq!(registry.conversant_count().await, 1);

        registry.remove(id, &phone).await;
        let left = registry.lookup(id).await;
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id(), 2);
    }

    #[tokio::test]
    async fn test_remove_unknown_is_noop() {
        let registry = ConnectionRegistry::new();
        let id = Uuid::new_v4();
        let (h, _rx) = handle(1, id);
        let (stranger, _rx2) = handle(1, id);
        registry.add(id, h.clone()).await;

        assert!(!registry.remove(Uuid::new_v4(), &h).await);
        assert!(!registry.remove(id, &stranger).await);
        assert_eq!(registry.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_remove_keeps_sibling_with_same_id() {
        let registry = ConnectionRegistry::new();
        let id = Uuid::new_v4();
        let (phone, _rx1) = handle(7, id);
        let (laptop, _rx2) = handle(7, id);

        registry.add(id, phone.clone()).await;
        registry.add(id, laptop.clone()).await;

        assert!(registry.remove(id, &phone).await);
        let left = registry.lookup(id).await;
        assert_eq!(left.len(), 1);
        assert!(left[0].same_connection(&laptop));

        // already gone
        assert!(!registry.remove(id, &phone).await);
        assert_eq!(registry.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_lookup_missing_is_empty() {
        let registry = ConnectionRegistry::new();
        assert!(registry.lookup(Uuid::new_v4()).await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_add_remove() {
        let registry = Arc::new(ConnectionRegistry::new());
        let id = Uuid::new_v4();

        let tasks: Vec<_> = (0..32u64)
            .map(|n| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    let (h, _rx) = handle(n, id);
                    registry.add(id, h.clone()).await;
                    if n % 2 == 0 {
                        registry.remove(id, &h).await;
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let left = registry.lookup(id).await;
        assert_eq!(left.len(), 16);
        assert!(left.iter().all(|h| h.id() % 2 == 1));
    }
}
