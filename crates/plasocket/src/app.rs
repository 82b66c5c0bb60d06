//! Application wiring: configuration, logging, plugin catalogue and the
//! server's run loop.

use crate::cli::CliArgs;
use crate::config::{AppConfig, LoggingSettings};
use crate::signals::wait_for_shutdown_signal;
use anyhow::{anyhow, Context, Result};
use plasocket_api::Plugin;
use plasocket_server::GameServer;
use plugin_ping_optimizer::PingOptimizerPlugin;
use plugin_rainbow::RainbowPlugin;
use plugin_system::order_plugins;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Every plugin compiled into the binary, in declaration order.
pub fn builtin_plugins() -> Vec<Arc<dyn Plugin>> {
    vec![
        Arc::new(RainbowPlugin::new()),
        Arc::new(PingOptimizerPlugin::new()),
    ]
}

/// Loads the configuration file and applies command-line overrides.
pub async fn resolve_config(args: &CliArgs) -> Result<AppConfig> {
    let mut config = AppConfig::load_from_file(&args.config_path).await?;

    if let Some(bind_address) = &args.bind_address {
        config.set_bind_address(bind_address)?;
    }

    if let Some(world_path) = &args.world_path {
        config.world.path = world_path.to_string_lossy().to_string();
    }

    if let Some(log_level) = &args.log_level {
        config.logging.level = log_level.clone();
    }

    if args.json_logs {
        config.logging.json_format = true;
    }

    if args.read_only {
        config.world.block_modification_enabled = false;
    }

    config
        .validate()
        .map_err(|e| anyhow!("Configuration validation failed: {}", e))?;

    Ok(config)
}

/// Initialize logging system.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn setup_logging(config: &LoggingSettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(filter);

    if config.json_format {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_file(false)
                    .with_line_number(false)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_file(false)
                    .with_line_number(false)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()?;
    }

    info!("Logging initialized with level: {}", config.level);
    Ok(())
}

pub struct Application {
    config: AppConfig,
    server: GameServer,
}

impl Application {
    pub async fn new(args: CliArgs) -> Result<Self> {
        // Configuration comes first so the logger can use its settings.
        let config = resolve_config(&args).await?;
        setup_logging(&config.logging)?;

        display_banner();

        let plugins = order_plugins(builtin_plugins(), &config.plugins.disabled);
        let server = GameServer::new(config.to_server_config()?, plugins);

        info!("Config: {}", args.config_path.display());
        Ok(Self { config, server })
    }

    /// Serves until a termination signal arrives, then shuts down gracefully.
    pub async fn run(self) -> Result<()> {
        info!("Configuration Summary:");
        info!("  Bind address: {}", self.server.bind_address());
        info!("  World file: {}", self.config.world.path);
        info!("  Save interval: {}s", self.config.world.save_interval_seconds);
        info!(
            "  Block modification: {}",
            if self.config.world.block_modification_enabled { "enabled" } else { "read-only" }
        );
        info!("  PvP: {}", self.config.gameplay.pvp_enabled);
        info!(
            "  Plugins: {}",
            if self.config.plugins.enabled {
                self.server.plugin_manager().plugin_names().join(", ")
            } else {
                "disabled".to_string()
            }
        );

        let shutdown = self.server.shutdown_handle();
        let mut server_handle = tokio::spawn(async move { self.server.start().await });

        tokio::select! {
            result = &mut server_handle => {
                // The server only returns on its own when it failed to start.
                return match result.context("server task panicked")? {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        error!("Server error: {}", e);
                        Err(e.into())
                    }
                };
            }
            signal = wait_for_shutdown_signal() => {
                signal?;
            }
        }

        info!("Shutdown signal received, initiating graceful shutdown...");
        let _ = shutdown.send(());

        server_handle.await.context("server task panicked")??;
        info!("Plasocket server shutdown complete");
        Ok(())
    }
}

fn display_banner() {
    let version = option_env!("CARGO_PKG_VERSION").unwrap_or("UNK");
    info!("╔══════════════════════════════════════════╗");
    info!("║             PLASOCKET SERVER             ║");
    info!("║                  v{:<8}               ║", version);
    info!("║                                          ║");
    info!("║  Shared 2D tile world over WebSocket     ║");
    info!("╚══════════════════════════════════════════╝");
}
