//! Configuration management for the Plasocket server.
//!
//! This module handles loading, validation, and conversion of server configuration
//! from TOML files and command-line arguments.

use anyhow::{Context, Result};
use plasocket_server::{ServerConfig, TextureDelays, TextureUrls};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Application configuration loaded from TOML file.
///
/// Every section and key is optional; anything missing takes its default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub world: WorldSettings,
    pub gameplay: GameplaySettings,
    pub textures: TextureSettings,
    pub plugins: PluginSettings,
    pub logging: LoggingSettings,
}

/// Network binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Interface to listen on (e.g., "127.0.0.1" or "0.0.0.0")
    pub bind_host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// World persistence and mutability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    /// Path of the JSON world file
    pub path: String,
    /// Seconds between periodic saves
    pub save_interval_seconds: u64,
    /// When false, placements and erases are reverted instead of applied
    pub block_modification_enabled: bool,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            path: "world.json".to_string(),
            save_interval_seconds: 60,
            block_modification_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameplaySettings {
    pub pvp_enabled: bool,
}

/// Texture URLs pushed to clients after they sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureSettings {
    pub enabled: bool,
    pub tilemap_url: String,
    pub title_url: String,
    /// Send FORCE_TEXTURE instead of TEXTURE for the tilemap
    pub force_tilemap_load: bool,
    /// Pause before the tilemap frame
    pub tilemap_delay_ms: u64,
    /// Pause between the tilemap frame and the title frame
    pub title_delay_ms: u64,
}

impl Default for TextureSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            tilemap_url: String::new(),
            title_url: String::new(),
            force_tilemap_load: false,
            tilemap_delay_ms: 500,
            title_delay_ms: 500,
        }
    }
}

/// Plugin system configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSettings {
    pub enabled: bool,
    /// Built-in plugins that should not be loaded
    pub disabled: Vec<String>,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            disabled: Vec::new(),
        }
    }
}

/// Logging system configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    pub json_format: bool,
    /// Log every inbound frame at info level
    pub log_messages: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            log_messages: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the specified path
    /// and returns the default configuration.
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let config: AppConfig =
                toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// The socket address built from `bind_host` and `port`.
    pub fn bind_address(&self) -> Result<SocketAddr> {
        let host: IpAddr = self
            .server
            .bind_host
            .parse()
            .with_context(|| format!("invalid bind host: {}", self.server.bind_host))?;
        Ok(SocketAddr::new(host, self.server.port))
    }

    /// Overrides host and port from a `host:port` string.
    pub fn set_bind_address(&mut self, address: &str) -> Result<()> {
        let addr: SocketAddr = address
            .parse()
            .with_context(|| format!("invalid bind address: {}", address))?;
        self.server.bind_host = addr.ip().to_string();
        self.server.port = addr.port();
        Ok(())
    }

    /// Converts the application configuration to the server's settings record.
    pub fn to_server_config(&self) -> Result<ServerConfig> {
        Ok(ServerConfig {
            bind_address: self.bind_address()?,
            plugins_enabled: self.plugins.enabled,
            pvp_enabled: self.gameplay.pvp_enabled,
            textures_enabled: self.textures.enabled,
            texture_urls: TextureUrls {
                tilemap: self.textures.tilemap_url.clone(),
                title: self.textures.title_url.clone(),
            },
            force_tilemap_load: self.textures.force_tilemap_load,
            texture_delays: TextureDelays {
                tilemap: Duration::from_millis(self.textures.tilemap_delay_ms),
                title: Duration::from_millis(self.textures.title_delay_ms),
            },
            log_messages: self.logging.log_messages,
            block_modification_enabled: self.world.block_modification_enabled,
            world_save_interval: Duration::from_secs(self.world.save_interval_seconds),
            world_path: PathBuf::from(&self.world.path),
        })
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_host.parse::<IpAddr>().is_err() {
            return Err(format!("Invalid bind host: {}", &self.server.bind_host));
        }

        if self.world.path.trim().is_empty() {
            return Err("World path cannot be empty".to_string());
        }

        if self.world.save_interval_seconds == 0 {
            return Err("World save interval must be at least one second".to_string());
        }

        if let Some(name) = self.plugins.disabled.iter().find(|name| name.trim().is_empty()) {
            return Err(format!("Disabled plugin names cannot be blank: {name:?}"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}
