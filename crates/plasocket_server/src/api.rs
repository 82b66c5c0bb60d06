//! The capability object plugins act through.

use crate::connection::{ConnectionRegistry, Messenger};
use async_trait::async_trait;
use plasocket_api::{BlockId, BroadcastOverride, ConnectionId, LogLevel, ServerApi};
use plasocket_world::SharedWorld;
use plugin_system::PluginManager;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Server side of [`ServerApi`].
///
/// Holds shared handles to the core components but only exposes delivery,
/// lookups and read access to the world.
pub struct ServerApiImpl {
    registry: Arc<ConnectionRegistry>,
    messenger: Arc<Messenger>,
    world: SharedWorld,
    pvp_enabled: bool,
    plugins: Arc<PluginManager>,
}

impl ServerApiImpl {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        messenger: Arc<Messenger>,
        world: SharedWorld,
        pvp_enabled: bool,
        plugins: Arc<PluginManager>,
    ) -> Self {
        Self {
            registry,
            messenger,
            world,
            pvp_enabled,
            plugins,
        }
    }
}

#[async_trait]
impl ServerApi for ServerApiImpl {
    fn send_to_client(&self, conn: ConnectionId, message: &str) -> bool {
        self.messenger.send_to(conn, message)
    }

    async fn broadcast(&self, message: &str, exclude: Option<ConnectionId>) {
        self.messenger.broadcast(message, exclude).await
    }

    fn connected_clients(&self) -> Vec<ConnectionId> {
        self.registry.handles()
    }

    fn username_of(&self, conn: ConnectionId) -> Option<String> {
        self.registry.username(conn).ok().flatten()
    }

    fn connection_of(&self, username: &str) -> Option<ConnectionId> {
        self.registry.find_by_username(username)
    }

    fn is_pvp_enabled(&self) -> bool {
        self.pvp_enabled
    }

    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Error => error!(target: "plasocket::plugin", "{}", message),
            LogLevel::Warn => warn!(target: "plasocket::plugin", "{}", message),
            LogLevel::Info => info!(target: "plasocket::plugin", "{}", message),
            LogLevel::Debug => debug!(target: "plasocket::plugin", "{}", message),
            LogLevel::Trace => trace!(target: "plasocket::plugin", "{}", message),
        }
    }

    /// Plugins that loaded cleanly. Empty before loading and after unloading.
    fn plugin_names(&self) -> Vec<String> {
        self.plugins.loaded_plugin_names()
    }

    async fn block_at(&self, x: i64, y: i64) -> Option<BlockId> {
        self.world.read().await.get(x, y).ok()
    }

    async fn world_size(&self) -> (usize, usize) {
        let grid = self.world.read().await;
        (grid.width(), grid.height())
    }

    async fn set_broadcast_override(&self, handler: Arc<dyn BroadcastOverride>) {
        self.messenger.set_broadcast_override(handler).await
    }

    async fn clear_broadcast_override(&self) {
        self.messenger.clear_broadcast_override().await
    }
}
