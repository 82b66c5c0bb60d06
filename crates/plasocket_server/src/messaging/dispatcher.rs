//! Core handling of inbound frames.

use super::parser::{self, MessageKind};
use crate::api::ServerApiImpl;
use crate::config::ServerConfig;
use crate::connection::{ConnectionRegistry, Messenger};
use crate::error::ServerError;
use plasocket_api::{split_frame, BlockId, ConnectionId, ServerApi, ServerFrame};
use plasocket_world::{SharedWorld, WorldFile};
use plugin_system::PluginManager;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tracing::{debug, info, warn};

const UNKNOWN_FORMAT: &str = "Unknown message format";

/// Routes frames from connection tasks through the plugin pipeline and
/// then the built-in handlers.
///
/// Shared by every connection task. The world is the only mutable state it
/// touches directly, always through the shared lock. Block confirmations are
/// queued while that lock is held; nothing else waits on a client under it.
pub struct Dispatcher {
    config: Arc<ServerConfig>,
    world: SharedWorld,
    registry: Arc<ConnectionRegistry>,
    messenger: Arc<Messenger>,
    plugins: Arc<PluginManager>,
    api: Arc<dyn ServerApi>,
}

impl Dispatcher {
    pub fn new(
        config: Arc<ServerConfig>,
        world: SharedWorld,
        registry: Arc<ConnectionRegistry>,
        messenger: Arc<Messenger>,
        plugins: Arc<PluginManager>,
    ) -> Self {
        let api: Arc<dyn ServerApi> = Arc::new(ServerApiImpl::new(
            registry.clone(),
            messenger.clone(),
            world.clone(),
            config.pvp_enabled,
            plugins.clone(),
        ));

        Self {
            config,
            world,
            registry,
            messenger,
            plugins,
            api,
        }
    }

    pub fn api(&self) -> &Arc<dyn ServerApi> {
        &self.api
    }

    fn plugins_active(&self) -> bool {
        self.config.plugins_enabled && !self.plugins.is_empty()
    }

    /// Registers a new connection and runs the plugins' `on_connect`.
    pub async fn on_connect(
        &self,
        outbound: Sender<String>,
        remote_addr: Option<SocketAddr>,
    ) -> ConnectionId {
        let conn = self.registry.register(outbound, remote_addr);
        if self.plugins_active() {
            self.plugins.dispatch_connect(conn, &self.api).await;
        }
        conn
    }

    /// Unregisters the connection and runs the plugins' `on_disconnect`.
    ///
    /// Safe to call more than once; only the first call has any effect.
    pub async fn on_disconnect(&self, conn: ConnectionId) {
        match self.registry.unregister(conn) {
            Ok(connection) => {
                debug!(
                    "Connection {} ({}) unregistered",
                    conn,
                    connection.username.as_deref().unwrap_or("unsynced")
                );
                if self.plugins_active() {
                    self.plugins.dispatch_disconnect(conn, &self.api).await;
                }
            }
            Err(e) => debug!("Skipping disconnect cleanup: {}", e),
        }
    }

    /// Handles one inbound frame. Errors are answered with an `ERROR` frame
    /// to the sender and never propagate.
    pub async fn on_frame(&self, conn: ConnectionId, raw: &str) {
        if self.config.log_messages {
            info!("{} -> {}", conn, raw);
        } else {
            debug!("{} -> {}", conn, raw);
        }

        let parts = split_frame(raw);

        if self.plugins_active()
            && self
                .plugins
                .dispatch_message(conn, raw, &parts, &self.api)
                .await
                .is_some()
        {
            return;
        }

        let result = match parser::classify(raw, &parts) {
            Ok(kind) => self.handle(conn, raw, kind).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            warn!("Rejected frame from {}: {}", conn, e);
            let message = e.to_string();
            self.messenger
                .send_to(conn, &ServerFrame::server_error(&message).to_string());
        }
    }

    async fn handle(&self, conn: ConnectionId, raw: &str, kind: MessageKind) -> Result<(), ServerError> {
        match kind {
            MessageKind::SyncRequest {
                username,
                client_version,
            } => self.handle_sync(conn, &username, &client_version).await,
            MessageKind::Place { x, y, block_id, .. } => self.handle_block(x, y, block_id).await,
            MessageKind::Erase { x, y, .. } => {
                self.handle_block(x, y, i64::from(BlockId::Air.id())).await
            }
            MessageKind::Chat {
                username, content, ..
            } => {
                let frame = ServerFrame::PlayerMessage {
                    username: &username,
                    content: &content,
                };
                self.messenger.broadcast(&frame.to_string(), None).await;
                Ok(())
            }
            MessageKind::PlayerInfo { .. } => {
                self.messenger.broadcast(raw, Some(conn)).await;
                Ok(())
            }
            MessageKind::Heartbeat => self.registry.touch(conn),
            MessageKind::Unknown => {
                self.messenger
                    .send_to(conn, &ServerFrame::server_error(UNKNOWN_FORMAT).to_string());
                Ok(())
            }
        }
    }

    async fn handle_sync(&self, conn: ConnectionId, username: &str, client_version: &str) -> Result<(), ServerError> {
        self.registry.set_username(conn, username)?;
        info!("{} joined as {} (client {})", conn, username, client_version);

        self.messenger.send_to(conn, &ServerFrame::JoinAccept.to_string());

        let world = {
            let grid = self.world.read().await;
            WorldFile::from_grid(&grid)
        };
        let json = world.to_json()?;
        self.messenger
            .send_to(conn, &ServerFrame::WorldData(&json).to_string());

        if self.config.textures_enabled {
            self.send_textures(conn).await;
        }
        Ok(())
    }

    async fn send_textures(&self, conn: ConnectionId) {
        let urls = &self.config.texture_urls;
        let delays = self.config.texture_delays;

        pause(delays.tilemap).await;
        if !urls.tilemap.is_empty() {
            let frame = if self.config.force_tilemap_load {
                ServerFrame::ForceTexture(&urls.tilemap)
            } else {
                ServerFrame::Texture(&urls.tilemap)
            };
            self.messenger.send_to(conn, &frame.to_string());
        }

        pause(delays.title).await;
        if !urls.title.is_empty() {
            self.messenger
                .send_to(conn, &ServerFrame::TitleTexture(&urls.title).to_string());
        }
    }

    /// Applies a placement, or re-asserts the current cell when the world is
    /// read-only. Either way every client, the placer included, is told the
    /// resulting state.
    ///
    /// The confirmation is queued before the world lock is released, so
    /// concurrent changes to one cell reach every client in the order they
    /// were applied.
    async fn handle_block(&self, x: i64, y: i64, block_id: i64) -> Result<(), ServerError> {
        if self.config.block_modification_enabled {
            let mut grid = self.world.write().await;
            grid.set(x, y, block_id)?;
            let block = grid.get(x, y)?;
            self.messenger
                .broadcast(&ServerFrame::block_state(x, y, block).to_string(), None)
                .await;
        } else {
            let grid = self.world.read().await;
            let current = grid.get(x, y)?;
            debug!("World is read-only, reverting ({}, {}) to {}", x, y, current);
            self.messenger
                .broadcast(&ServerFrame::block_state(x, y, current).to_string(), None)
                .await;
        }
        Ok(())
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
