use async_trait::async_trait;
use plasocket_api::{BlockId, BroadcastOverride, ConnectionId, LogLevel, ServerApi};
use std::sync::Arc;

/// Wraps the server's capability object so log lines carry the plugin name.
pub(crate) struct ScopedApi {
    plugin: String,
    inner: Arc<dyn ServerApi>,
}

impl ScopedApi {
    pub(crate) fn wrap(plugin: &str, inner: &Arc<dyn ServerApi>) -> Arc<dyn ServerApi> {
        Arc::new(Self {
            plugin: plugin.to_string(),
            inner: inner.clone(),
        })
    }
}

#[async_trait]
impl ServerApi for ScopedApi {
    fn send_to_client(&self, conn: ConnectionId, message: &str) -> bool {
        self.inner.send_to_client(conn, message)
    }

    async fn broadcast(&self, message: &str, exclude: Option<ConnectionId>) {
        self.inner.broadcast(message, exclude).await
    }

    fn connected_clients(&self) -> Vec<ConnectionId> {
        self.inner.connected_clients()
    }

    fn username_of(&self, conn: ConnectionId) -> Option<String> {
        self.inner.username_of(conn)
    }

    fn connection_of(&self, username: &str) -> Option<ConnectionId> {
        self.inner.connection_of(username)
    }

    fn is_pvp_enabled(&self) -> bool {
        self.inner.is_pvp_enabled()
    }

    fn log(&self, level: LogLevel, message: &str) {
        self.inner.log(level, &format!("[{}] {}", self.plugin, message))
    }

    fn plugin_names(&self) -> Vec<String> {
        self.inner.plugin_names()
    }

    async fn block_at(&self, x: i64, y: i64) -> Option<BlockId> {
        self.inner.block_at(x, y).await
    }

    async fn world_size(&self) -> (usize, usize) {
        self.inner.world_size().await
    }

    async fn set_broadcast_override(&self, handler: Arc<dyn BroadcastOverride>) {
        self.inner.set_broadcast_override(handler).await
    }

    async fn clear_broadcast_override(&self) {
        self.inner.clear_broadcast_override().await
    }
}
