//! Server configuration types and defaults.
//!
//! The server consumes this typed record only; reading it from a file is the
//! binary's job.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Texture URLs pushed to clients after they sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextureUrls {
    pub tilemap: String,
    pub title: String,
}

/// Pauses used while pushing textures.
///
/// `tilemap` is waited before the tilemap texture frame, `title` between the
/// tilemap frame and the title texture frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDelays {
    pub tilemap: Duration,
    pub title: Duration,
}

impl Default for TextureDelays {
    fn default() -> Self {
        Self {
            tilemap: Duration::from_millis(500),
            title: Duration::from_millis(500),
        }
    }
}

/// Configuration structure for the server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The socket address to bind the server to
    pub bind_address: SocketAddr,

    pub plugins_enabled: bool,

    pub pvp_enabled: bool,

    pub textures_enabled: bool,

    pub texture_urls: TextureUrls,

    /// Send `FORCE_TEXTURE` instead of `TEXTURE` for the tilemap
    pub force_tilemap_load: bool,

    pub texture_delays: TextureDelays,

    /// Log every inbound frame at info level instead of debug
    pub log_messages: bool,

    /// When false the world is read-only and placements are reverted
    pub block_modification_enabled: bool,

    pub world_save_interval: Duration,

    pub world_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            plugins_enabled: true,
            pvp_enabled: false,
            textures_enabled: false,
            texture_urls: TextureUrls::default(),
            force_tilemap_load: false,
            texture_delays: TextureDelays::default(),
            log_messages: false,
            block_modification_enabled: true,
            world_save_interval: Duration::from_secs(60),
            world_path: PathBuf::from("world.json"),
        }
    }
}
