use super::client::ClientConnection;
use crate::error::ServerError;
use dashmap::DashMap;
use plasocket_api::ConnectionId;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime};
use tokio::sync::mpsc::Sender;
use tracing::{debug, info};

/// Table of live connections.
///
/// Ids are allocated from a counter and never reused. No method hands out a
/// reference into the table, so callers can't hold a shard lock across an
/// await point.
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ClientConnection>,
    next_id: AtomicU64,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn register(
        &self,
        outbound: Sender<String>,
        remote_addr: Option<SocketAddr>,
    ) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.connections
            .insert(id, ClientConnection::new(outbound, remote_addr));
        debug!("Registered connection {}", id);
        id
    }

    /// Sets the declared username. A second call overwrites the first.
    pub fn set_username(&self, id: ConnectionId, username: &str) -> Result<(), ServerError> {
        let mut connection = self
            .connections
            .get_mut(&id)
            .ok_or(ServerError::ConnectionNotFound(id))?;

        if let Some(previous) = connection.username.replace(username.to_string()) {
            if previous != username {
                info!("Connection {} renamed from {} to {}", id, previous, username);
            }
        }
        Ok(())
    }

    /// Removes the connection. Fails if it was already removed.
    pub fn unregister(&self, id: ConnectionId) -> Result<ClientConnection, ServerError> {
        self.connections
            .remove(&id)
            .map(|(_, connection)| connection)
            .ok_or(ServerError::ConnectionNotFound(id))
    }

    pub fn username(&self, id: ConnectionId) -> Result<Option<String>, ServerError> {
        self.connections
            .get(&id)
            .map(|c| c.username.clone())
            .ok_or(ServerError::ConnectionNotFound(id))
    }

    /// The oldest live connection that declared `username`.
    pub fn find_by_username(&self, username: &str) -> Option<ConnectionId> {
        self.connections
            .iter()
            .filter(|entry| entry.username.as_deref() == Some(username))
            .map(|entry| *entry.key())
            .min()
    }

    /// Snapshot of the handles registered right now.
    pub fn handles(&self) -> Vec<ConnectionId> {
        self.connections.iter().map(|entry| *entry.key()).collect()
    }

    pub fn sender(&self, id: ConnectionId) -> Option<Sender<String>> {
        self.connections.get(&id).map(|c| c.outbound.clone())
    }

    pub fn touch(&self, id: ConnectionId) -> Result<(), ServerError> {
        let mut connection = self
            .connections
            .get_mut(&id)
            .ok_or(ServerError::ConnectionNotFound(id))?;
        connection.last_seen = Instant::now();
        Ok(())
    }

    pub fn last_seen(&self, id: ConnectionId) -> Result<Instant, ServerError> {
        self.connections
            .get(&id)
            .map(|c| c.last_seen)
            .ok_or(ServerError::ConnectionNotFound(id))
    }

    pub fn connected_at(&self, id: ConnectionId) -> Result<SystemTime, ServerError> {
        self.connections
            .get(&id)
            .map(|c| c.connected_at)
            .ok_or(ServerError::ConnectionNotFound(id))
    }

    pub fn remote_addr(&self, id: ConnectionId) -> Result<Option<SocketAddr>, ServerError> {
        self.connections
            .get(&id)
            .map(|c| c.remote_addr)
            .ok_or(ServerError::ConnectionNotFound(id))
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn register(registry: &ConnectionRegistry) -> ConnectionId {
        let (tx, _rx) = mpsc::channel(16);
        registry.register(tx, None)
    }

    #[test]
    fn test_ids_are_unique() {
        let registry = ConnectionRegistry::new();
        let a = register(&registry);
        let b = register(&registry);
        assert_ne!(a, b);
        registry.unregister(a).unwrap();
        let c = register(&registry);
        assert_ne!(a, c);
        assert_eq!(registry.connection_count(), 2);
    }

    #[test]
    fn test_username_lifecycle() {
        let registry = ConnectionRegistry::new();
        let id = register(&registry);
        assert_eq!(registry.username(id).unwrap(), None);

        registry.set_username(id, "alice").unwrap();
        assert_eq!(registry.username(id).unwrap().as_deref(), Some("alice"));

        registry.set_username(id, "bob").unwrap();
        assert_eq!(registry.username(id).unwrap().as_deref(), Some("bob"));
        assert_eq!(registry.find_by_username("bob"), Some(id));
        assert_eq!(registry.find_by_username("alice"), None);
    }

    #[test]
    fn test_lookups_fail_after_unregister() {
        let registry = ConnectionRegistry::new();
        let id = register(&registry);
        registry.unregister(id).unwrap();

        assert!(matches!(
            registry.unregister(id),
            Err(ServerError::ConnectionNotFound(_))
        ));
        assert!(registry.username(id).is_err());
        assert!(registry.set_username(id, "ghost").is_err());
        assert!(registry.touch(id).is_err());
        assert!(registry.sender(id).is_none());
        assert!(registry.handles().is_empty());
    }

    #[test]
    fn test_find_prefers_oldest() {
        let registry = ConnectionRegistry::new();
        let first = register(&registry);
        let second = register(&registry);
        registry.set_username(second, "dup").unwrap();
        registry.set_username(first, "dup").unwrap();
        assert_eq!(registry.find_by_username("dup"), Some(first));
    }

    #[test]
    fn test_touch_moves_last_seen() {
        let registry = ConnectionRegistry::new();
        let id = register(&registry);
        let before = registry.last_seen(id).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        registry.touch(id).unwrap();
        assert!(registry.last_seen(id).unwrap() > before);
    }
}
