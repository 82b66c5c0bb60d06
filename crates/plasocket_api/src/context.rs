//! The capability object handed to plugins.

use crate::types::{ConnectionId, LogLevel};
use async_trait::async_trait;
use plasocket_world::BlockId;
use std::sync::Arc;

/// Everything a plugin is allowed to do to the server.
///
/// Plugins never see the world grid or the connection table directly. They
/// address clients by [`ConnectionId`] and read the world through
/// [`block_at`](ServerApi::block_at).
///
/// # Examples
///
/// ```rust,ignore
/// async fn on_connect(&self, conn: ConnectionId, api: Arc<dyn ServerApi>) -> Result<(), PluginError> {
///     api.send_to_client(conn, "SERVER_MESSAGE|Welcome!");
///     api.log(LogLevel::Info, "greeted a new client");
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait ServerApi: Send + Sync {
    /// Queues `message` for one client.
    ///
    /// Returns `false` if the connection is gone. Delivery is best-effort and
    /// never raises.
    fn send_to_client(&self, conn: ConnectionId, message: &str) -> bool;

    /// Sends `message` to every connected client except `exclude`.
    ///
    /// Goes through the installed [`BroadcastOverride`], if any.
    async fn broadcast(&self, message: &str, exclude: Option<ConnectionId>);

    /// Snapshot of the connections registered at call time.
    fn connected_clients(&self) -> Vec<ConnectionId>;

    /// The username declared by `conn`, if it has synced yet.
    fn username_of(&self, conn: ConnectionId) -> Option<String>;

    /// The connection currently registered under `username`.
    fn connection_of(&self, username: &str) -> Option<ConnectionId>;

    fn is_pvp_enabled(&self) -> bool;

    /// Logs through the server's logging system, tagged with the plugin name.
    fn log(&self, level: LogLevel, message: &str);

    /// Names of the plugins whose `on_load` succeeded, in load order.
    fn plugin_names(&self) -> Vec<String>;

    /// Reads one cell of the world. `None` when out of bounds.
    async fn block_at(&self, x: i64, y: i64) -> Option<BlockId>;

    /// `(width, height)` of the world.
    async fn world_size(&self) -> (usize, usize);

    /// Routes every subsequent broadcast through `handler`.
    ///
    /// Replaces any previously installed override.
    async fn set_broadcast_override(&self, handler: Arc<dyn BroadcastOverride>);

    async fn clear_broadcast_override(&self);
}

/// Replacement for the default broadcast fan-out.
///
/// Receives a [`DirectSender`] instead of the full [`ServerApi`] so it
/// cannot re-enter the broadcast path.
#[async_trait]
pub trait BroadcastOverride: Send + Sync {
    async fn broadcast(&self, message: &str, exclude: Option<ConnectionId>, direct: &dyn DirectSender);
}

/// Raw per-client delivery, bypassing any broadcast override.
pub trait DirectSender: Send + Sync {
    fn connected_clients(&self) -> Vec<ConnectionId>;

    fn send_direct(&self, conn: ConnectionId, message: &str) -> bool;
}
