use super::registry::ConnectionRegistry;
use plasocket_api::{BroadcastOverride, ConnectionId, DirectSender};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Unicast and broadcast delivery on top of the registry.
///
/// Sends are queued on each connection's outbound channel and never wait
/// on the socket. A dead or backed-up recipient is logged and skipped.
pub struct Messenger {
    registry: Arc<ConnectionRegistry>,
    broadcast_override: RwLock<Option<Arc<dyn BroadcastOverride>>>,
}

impl Messenger {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            broadcast_override: RwLock::new(None),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Best-effort delivery to one connection. Returns whether it was queued.
    pub fn send_to(&self, conn: ConnectionId, text: &str) -> bool {
        let Some(outbound) = self.registry.sender(conn) else {
            debug!("Dropping message for unknown connection {}", conn);
            return false;
        };

        match outbound.try_send(text.to_string()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Outbound queue for {} is full, message dropped", conn);
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Connection {} is closing, message dropped", conn);
                false
            }
        }
    }

    /// Delivers to every registered connection except `exclude`, going
    /// through the broadcast override when one is installed.
    pub async fn broadcast(&self, text: &str, exclude: Option<ConnectionId>) {
        // clone out so the override runs without the lock held
        let handler = self.broadcast_override.read().await.clone();
        match handler {
            Some(handler) => handler.broadcast(text, exclude, self).await,
            None => {
                self.raw_broadcast(text, exclude);
            }
        }
    }

    /// Default fan-out over a snapshot of the registry. Returns the number of
    /// connections the message was queued for.
    pub fn raw_broadcast(&self, text: &str, exclude: Option<ConnectionId>) -> usize {
        self.registry
            .handles()
            .into_iter()
            .filter(|conn| Some(*conn) != exclude)
            .filter(|conn| self.send_to(*conn, text))
            .count()
    }

    pub async fn set_broadcast_override(&self, handler: Arc<dyn BroadcastOverride>) {
        *self.broadcast_override.write().await = Some(handler);
    }

    pub async fn clear_broadcast_override(&self) {
        *self.broadcast_override.write().await = None;
    }

    pub async fn has_broadcast_override(&self) -> bool {
        self.broadcast_override.read().await.is_some()
    }
}

impl DirectSender for Messenger {
    fn connected_clients(&self) -> Vec<ConnectionId> {
        self.registry.handles()
    }

    fn send_direct(&self, conn: ConnectionId, message: &str) -> bool {
        self.send_to(conn, message)
    }
}
