//! Plugin hook pipeline
//!
//! Plugins are compiled into the server and handed over as an ordered list.
//! The [`PluginManager`] invokes their hooks in that order, short-circuits
//! message handling on the first plugin that claims a frame, and isolates
//! the server from plugin errors and panics.

mod discovery;
mod manager;
mod scoped;

pub use discovery::{order_plugins, EXCLUSION_MARKER};
pub use manager::{PluginManager, PluginRegistration, PluginStats, PluginStatus, PluginSystemStats};
