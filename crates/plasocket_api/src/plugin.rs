//! The plugin trait.

use crate::context::ServerApi;
use crate::types::{ConnectionId, Hooks, PluginError};
use async_trait::async_trait;
use std::sync::Arc;

/// A server extension invoked at the hook points of the message lifecycle.
///
/// Every hook has a no-op default, so a plugin implements only what it needs
/// and reports that subset through [`hooks`](Plugin::hooks). Hooks take
/// `&self`; plugins keep mutable state behind their own locks.
///
/// # Plugin Lifecycle
///
/// 1. `on_load` once at startup, in load order
/// 2. `on_connect`, `on_message` and `on_disconnect` as clients come and go
/// 3. `on_unload` once at shutdown, after every connection has closed
///
/// Errors and panics from any hook are caught by the server, logged with the
/// plugin and hook names, and treated as if the hook had done nothing.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique, stable name used in logs and plugin listings.
    fn name(&self) -> &str;

    fn version(&self) -> &str {
        "0.1.0"
    }

    /// Core plugins are ordered ahead of all others.
    fn is_core(&self) -> bool {
        false
    }

    /// Hooks this plugin implements.
    fn hooks(&self) -> Hooks {
        Hooks::ALL
    }

    async fn on_load(&self, _api: Arc<dyn ServerApi>) -> Result<(), PluginError> {
        Ok(())
    }

    /// Runs after the connection is registered and before anything is sent
    /// to it.
    async fn on_connect(&self, _conn: ConnectionId, _api: Arc<dyn ServerApi>) -> Result<(), PluginError> {
        Ok(())
    }

    /// Offered every inbound frame before built-in handling.
    ///
    /// # Returns
    ///
    /// `Ok(true)` claims the frame: no later plugin and no built-in handler
    /// will see it.
    async fn on_message(
        &self,
        _conn: ConnectionId,
        _raw: &str,
        _parts: &[String],
        _api: Arc<dyn ServerApi>,
    ) -> Result<bool, PluginError> {
        Ok(false)
    }

    /// Runs after the connection has been removed from the registry.
    async fn on_disconnect(&self, _conn: ConnectionId, _api: Arc<dyn ServerApi>) -> Result<(), PluginError> {
        Ok(())
    }

    async fn on_unload(&self, _api: Arc<dyn ServerApi>) -> Result<(), PluginError> {
        Ok(())
    }
}
