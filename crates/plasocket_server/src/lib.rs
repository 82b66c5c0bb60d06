//! # Plasocket server core
//!
//! Real-time synchronization of a shared 2D tile world over WebSocket.
//!
//! Each connection runs in its own task. Inbound frames go through the
//! [`Dispatcher`], which offers them to the plugin pipeline first and applies
//! the built-in handling (sync, place, erase, chat, player info, heartbeat)
//! when no plugin claims them. The world grid sits behind a shared lock; the
//! periodic saver and the final save on shutdown read consistent snapshots.

pub mod api;
pub mod config;
pub mod connection;
pub mod error;
pub mod messaging;
pub mod server;

pub use api::ServerApiImpl;
pub use config::{ServerConfig, TextureDelays, TextureUrls};
pub use connection::{ConnectionRegistry, Messenger};
pub use error::ServerError;
pub use messaging::{Dispatcher, MessageKind, ParsedMessage};
pub use server::GameServer;
