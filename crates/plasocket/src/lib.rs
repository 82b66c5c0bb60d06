//! Plasocket server application: configuration file, command line, logging
//! and the catalogue of built-in plugins around [`plasocket_server::GameServer`].

pub mod app;
pub mod cli;
pub mod config;
pub mod signals;

pub use app::{builtin_plugins, resolve_config, setup_logging, Application};
pub use cli::CliArgs;
pub use config::AppConfig;
