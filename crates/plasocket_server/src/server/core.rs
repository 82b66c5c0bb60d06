//! Core server implementation.
//!
//! `GameServer` wires the world, the connection registry, the messenger, the
//! plugin pipeline and the dispatcher together, runs the accept loop, and
//! owns the shutdown sequence.

use crate::{
    config::ServerConfig,
    connection::{ConnectionRegistry, Messenger},
    error::ServerError,
    messaging::Dispatcher,
    server::handlers::handle_connection,
};
use plasocket_api::{Plugin, ServerApi};
use plasocket_world::{shared, SharedWorld, WorldGrid, WorldStore};
use plugin_system::PluginManager;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// The server.
///
/// # Shutdown Sequence
///
/// 1. Stop accepting connections
/// 2. Let every connection task finish its current frame and clean up
/// 3. Run the plugins' `on_unload`
/// 4. Stop the periodic saver
/// 5. Save the world one last time
pub struct GameServer {
    config: Arc<ServerConfig>,

    /// The authoritative world, shared with connection tasks and the saver
    world: SharedWorld,

    store: WorldStore,

    registry: Arc<ConnectionRegistry>,

    messenger: Arc<Messenger>,

    plugin_manager: Arc<PluginManager>,

    dispatcher: Arc<Dispatcher>,

    /// Channel for coordinating server shutdown
    shutdown_sender: broadcast::Sender<()>,

    /// Subscribed at construction so a shutdown requested before `serve`
    /// runs is not lost
    shutdown_receiver: Mutex<Option<broadcast::Receiver<()>>>,
}

impl GameServer {
    /// Creates a server. `plugins` must already be in load order.
    ///
    /// The world starts as the default grid and is replaced by the stored
    /// one when the server starts.
    pub fn new(config: ServerConfig, plugins: Vec<Arc<dyn Plugin>>) -> Self {
        let config = Arc::new(config);
        let world = shared(WorldGrid::default());
        let store = WorldStore::new(config.world_path.clone());
        let registry = Arc::new(ConnectionRegistry::new());
        let messenger = Arc::new(Messenger::new(registry.clone()));

        let plugin_manager = if config.plugins_enabled {
            Arc::new(PluginManager::new(plugins))
        } else {
            if !plugins.is_empty() {
                info!("Plugins are disabled, ignoring {} plugin(s)", plugins.len());
            }
            Arc::new(PluginManager::empty())
        };

        let dispatcher = Arc::new(Dispatcher::new(
            config.clone(),
            world.clone(),
            registry.clone(),
            messenger.clone(),
            plugin_manager.clone(),
        ));

        let (shutdown_sender, shutdown_receiver) = broadcast::channel(1);

        Self {
            config,
            world,
            store,
            registry,
            messenger,
            plugin_manager,
            dispatcher,
            shutdown_sender,
            shutdown_receiver: Mutex::new(Some(shutdown_receiver)),
        }
    }

    /// Binds the configured address and serves until shutdown.
    pub async fn start(&self) -> Result<(), ServerError> {
        let listener = self.bind()?;
        self.serve(listener).await
    }

    /// Creates the listening socket with `SO_REUSEADDR` set.
    pub fn bind(&self) -> Result<TcpListener, ServerError> {
        let address = self.config.bind_address;
        let domain = if address.is_ipv6() {
            Domain::IPV6
        } else {
            Domain::IPV4
        };

        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| ServerError::Network(format!("Socket creation failed: {e}")))?;
        if let Err(e) = socket.set_reuse_address(true) {
            warn!("Failed to set SO_REUSEADDR: {}", e);
        }

        socket
            .bind(&address.into())
            .map_err(|e| ServerError::Network(format!("Bind to {address} failed: {e}")))?;
        socket
            .listen(1024)
            .map_err(|e| ServerError::Network(format!("Listen failed: {e}")))?;

        let std_listener: StdTcpListener = socket.into();
        std_listener
            .set_nonblocking(true)
            .map_err(|e| ServerError::Network(format!("Failed to set non-blocking: {e}")))?;

        TcpListener::from_std(std_listener)
            .map_err(|e| ServerError::Network(format!("Tokio listener creation failed: {e}")))
    }

    /// Loads the world and plugins, then accepts connections on `listener`
    /// until shutdown is requested.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let mut shutdown_receiver = match self.shutdown_receiver.lock().await.take() {
            Some(receiver) => receiver,
            None => self.shutdown_sender.subscribe(),
        };

        let grid = self.store.load_or_generate().await;
        *self.world.write().await = grid;

        let api = self.dispatcher.api().clone();
        let loaded = self.plugin_manager.load_all(&api).await;
        if loaded.is_empty() {
            info!("No plugins loaded");
        } else {
            info!("Loaded {} plugin(s): {:?}", loaded.len(), loaded);
        }

        let saver = self.store.spawn_periodic(
            self.world.clone(),
            self.config.world_save_interval,
            self.shutdown_sender.subscribe(),
        );

        match listener.local_addr() {
            Ok(addr) => info!("Listening on ws://{}", addr),
            Err(_) => info!("Listening on ws://{}", self.config.bind_address),
        }
        if !self.config.block_modification_enabled {
            info!("Block modification is disabled, the world is read-only");
        }

        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                _ = shutdown_receiver.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = finished {
                        error!("Connection task failed: {}", e);
                    }
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let dispatcher = self.dispatcher.clone();
                        let shutdown = self.shutdown_sender.subscribe();
                        connections.spawn(async move {
                            if let Err(e) = handle_connection(stream, addr, dispatcher, shutdown).await {
                                debug!("Connection from {} ended with error: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                }
            }
        }

        drop(listener);
        // tasks that subscribed after the first signal still need one
        let _ = self.shutdown_sender.send(());

        info!("Waiting for {} connection(s) to close", connections.len());
        while let Some(finished) = connections.join_next().await {
            if let Err(e) = finished {
                error!("Connection task failed: {}", e);
            }
        }

        self.plugin_manager.unload_all(&api).await;

        if let Err(e) = saver.await {
            error!("Periodic saver task failed: {}", e);
        }

        self.store.save_on_shutdown(&self.world).await?;
        info!("Server stopped");
        Ok(())
    }

    /// Requests a graceful shutdown.
    pub fn shutdown(&self) {
        info!("Shutting down server...");
        let _ = self.shutdown_sender.send(());
    }

    /// A sender that triggers shutdown, for signal handlers.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_sender.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn world(&self) -> SharedWorld {
        self.world.clone()
    }

    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        self.registry.clone()
    }

    pub fn messenger(&self) -> Arc<Messenger> {
        self.messenger.clone()
    }

    pub fn plugin_manager(&self) -> Arc<PluginManager> {
        self.plugin_manager.clone()
    }

    pub fn api(&self) -> Arc<dyn ServerApi> {
        self.dispatcher.api().clone()
    }

    pub fn bind_address(&self) -> SocketAddr {
        self.config.bind_address
    }
}
