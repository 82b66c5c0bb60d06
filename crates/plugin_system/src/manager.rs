use crate::scoped::ScopedApi;
use futures::FutureExt;
use plasocket_api::{ConnectionId, HookKind, Hooks, Plugin, PluginError, ServerApi};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock as StdRwLock};
use std::time::SystemTime;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Immutable description of a loaded plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginRegistration {
    pub name: String,
    pub version: String,
    pub hooks: Hooks,
    pub load_order: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginStatus {
    Pending,
    Active,
    /// `on_load` failed. The plugin's other hooks still run.
    Failed(String),
    Unloaded,
}

#[derive(Debug, Clone)]
pub struct PluginStats {
    pub name: String,
    pub version: String,
    pub load_order: usize,
    pub status: PluginStatus,
    pub hook_failures: u64,
    pub registered_at: SystemTime,
}

#[derive(Debug, Clone)]
pub struct PluginSystemStats {
    pub total_plugins: usize,
    pub active_plugins: usize,
    pub failed_plugins: usize,
    pub plugins: Vec<PluginStats>,
}

struct LoadedPlugin {
    plugin: Arc<dyn Plugin>,
    registration: PluginRegistration,
    status: RwLock<PluginStatus>,
    hook_failures: AtomicU64,
    registered_at: SystemTime,
}

impl LoadedPlugin {
    fn handles(&self, hook: HookKind) -> bool {
        self.registration.hooks.contains(hook)
    }

    fn name(&self) -> &str {
        &self.registration.name
    }
}

/// Runs plugin hooks in load order.
///
/// Every hook call is isolated: an error or a panic is logged with the
/// plugin and hook names, counted, and treated as a call that did nothing.
pub struct PluginManager {
    plugins: Vec<LoadedPlugin>,
    /// Names whose `on_load` succeeded, in load order.
    loaded: StdRwLock<Vec<String>>,
}

impl PluginManager {
    /// Takes plugins already in load order.
    pub fn new(plugins: Vec<Arc<dyn Plugin>>) -> Self {
        let plugins = plugins
            .into_iter()
            .enumerate()
            .map(|(load_order, plugin)| LoadedPlugin {
                registration: PluginRegistration {
                    name: plugin.name().to_string(),
                    version: plugin.version().to_string(),
                    hooks: plugin.hooks(),
                    load_order,
                },
                plugin,
                status: RwLock::new(PluginStatus::Pending),
                hook_failures: AtomicU64::new(0),
                registered_at: SystemTime::now(),
            })
            .collect();

        Self {
            plugins,
            loaded: StdRwLock::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Every registered plugin, loaded or not.
    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins.iter().map(|p| p.name().to_string()).collect()
    }

    /// Plugins whose `on_load` succeeded and that have not been unloaded.
    pub fn loaded_plugin_names(&self) -> Vec<String> {
        self.loaded
            .read()
            .map(|names| names.clone())
            .unwrap_or_default()
    }

    fn set_loaded(&self, names: Vec<String>) {
        match self.loaded.write() {
            Ok(mut loaded) => *loaded = names,
            Err(poisoned) => *poisoned.into_inner() = names,
        }
    }

    pub fn registrations(&self) -> Vec<PluginRegistration> {
        self.plugins.iter().map(|p| p.registration.clone()).collect()
    }

    async fn guarded<T, F>(&self, loaded: &LoadedPlugin, hook: HookKind, call: F) -> Result<T, PluginError>
    where
        F: Future<Output = Result<T, PluginError>>,
    {
        let outcome = match AssertUnwindSafe(call).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(PluginError::from_panic(panic)),
        };

        if let Err(e) = &outcome {
            loaded.hook_failures.fetch_add(1, Ordering::Relaxed);
            error!(plugin = %loaded.name(), hook = %hook, "Plugin hook failed: {}", e);
        }
        outcome
    }

    fn eligible(&self, hook: HookKind) -> impl Iterator<Item = &LoadedPlugin> {
        self.plugins.iter().filter(move |p| p.handles(hook))
    }

    /// Runs `on_load` for every plugin. Returns the names that loaded cleanly.
    pub async fn load_all(&self, api: &Arc<dyn ServerApi>) -> Vec<String> {
        info!("Loading {} plugins", self.plugins.len());
        let mut loaded_names = Vec::new();

        for loaded in &self.plugins {
            let status = if loaded.handles(HookKind::Load) {
                let scoped = ScopedApi::wrap(loaded.name(), api);
                match self
                    .guarded(loaded, HookKind::Load, loaded.plugin.on_load(scoped))
                    .await
                {
                    Ok(()) => PluginStatus::Active,
                    Err(e) => PluginStatus::Failed(e.to_string()),
                }
            } else {
                PluginStatus::Active
            };

            if status == PluginStatus::Active {
                info!(
                    "Plugin {} v{} loaded",
                    loaded.name(),
                    loaded.registration.version
                );
                loaded_names.push(loaded.name().to_string());
            } else {
                warn!("Plugin {} failed to load; its other hooks stay enabled", loaded.name());
            }
            *loaded.status.write().await = status;
        }

        info!(
            "Plugin loading complete: {}/{} loaded",
            loaded_names.len(),
            self.plugins.len()
        );
        self.set_loaded(loaded_names.clone());
        loaded_names
    }

    pub async fn dispatch_connect(&self, conn: ConnectionId, api: &Arc<dyn ServerApi>) {
        for loaded in self.eligible(HookKind::Connect) {
            let scoped = ScopedApi::wrap(loaded.name(), api);
            let _ = self
                .guarded(loaded, HookKind::Connect, loaded.plugin.on_connect(conn, scoped))
                .await;
        }
    }

    /// Offers a frame to each plugin in turn.
    ///
    /// Returns the name of the first plugin that claimed it. Later plugins
    /// are not called once a frame is claimed.
    pub async fn dispatch_message(
        &self,
        conn: ConnectionId,
        raw: &str,
        parts: &[String],
        api: &Arc<dyn ServerApi>,
    ) -> Option<String> {
        for loaded in self.eligible(HookKind::Message) {
            let scoped = ScopedApi::wrap(loaded.name(), api);
            let claimed = self
                .guarded(
                    loaded,
                    HookKind::Message,
                    loaded.plugin.on_message(conn, raw, parts, scoped),
                )
                .await
                .unwrap_or(false);

            if claimed {
                debug!("Frame from {} handled by plugin {}", conn, loaded.name());
                return Some(loaded.name().to_string());
            }
        }
        None
    }

    pub async fn dispatch_disconnect(&self, conn: ConnectionId, api: &Arc<dyn ServerApi>) {
        for loaded in self.eligible(HookKind::Disconnect) {
            let scoped = ScopedApi::wrap(loaded.name(), api);
            let _ = self
                .guarded(
                    loaded,
                    HookKind::Disconnect,
                    loaded.plugin.on_disconnect(conn, scoped),
                )
                .await;
        }
    }

    /// Runs `on_unload` for every plugin, in load order.
    pub async fn unload_all(&self, api: &Arc<dyn ServerApi>) {
        info!("Unloading {} plugins", self.plugins.len());
        self.set_loaded(Vec::new());

        for loaded in &self.plugins {
            if loaded.handles(HookKind::Unload) {
                let scoped = ScopedApi::wrap(loaded.name(), api);
                let _ = self
                    .guarded(loaded, HookKind::Unload, loaded.plugin.on_unload(scoped))
                    .await;
            }
            *loaded.status.write().await = PluginStatus::Unloaded;
        }

        info!("All plugins unloaded");
    }

    pub async fn stats(&self) -> PluginSystemStats {
        let mut plugins = Vec::with_capacity(self.plugins.len());
        for loaded in &self.plugins {
            plugins.push(PluginStats {
                name: loaded.registration.name.clone(),
                version: loaded.registration.version.clone(),
                load_order: loaded.registration.load_order,
                status: loaded.status.read().await.clone(),
                hook_failures: loaded.hook_failures.load(Ordering::Relaxed),
                registered_at: loaded.registered_at,
            });
        }

        PluginSystemStats {
            total_plugins: plugins.len(),
            active_plugins: plugins
                .iter()
                .filter(|p| p.status == PluginStatus::Active)
                .count(),
            failed_plugins: plugins
                .iter()
                .filter(|p| matches!(p.status, PluginStatus::Failed(_)))
                .count(),
            plugins,
        }
    }
}
