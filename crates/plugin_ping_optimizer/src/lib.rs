//! Ping optimizer plugin
//!
//! Installs a broadcast override that drops `PLAYER_INFO` frames a recipient
//! has already received verbatim. Clients relay their position many times a
//! second and most of those frames repeat the previous one; suppressing the
//! repeats per recipient cuts outbound traffic without changing what any
//! client ends up seeing.
//!
//! The plugin is core so it loads, and installs its override, before any
//! other plugin gets a chance to broadcast.

use async_trait::async_trait;
use plasocket_api::{
    BroadcastOverride, ConnectionId, DirectSender, HookKind, Hooks, LogLevel, Plugin, PluginError,
    ServerApi,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::trace;

/// Position of the `PLAYER_INFO` tag in a relayed player-info frame.
const PLAYER_INFO_TAG_INDEX: usize = 6;

/// Last `PLAYER_INFO` frame delivered to each recipient, keyed by the
/// player the frame describes.
type DeliveryCache = HashMap<ConnectionId, HashMap<String, String>>;

/// The player a `PLAYER_INFO` frame describes, or `None` for any other frame.
fn player_info_key(message: &str) -> Option<&str> {
    let mut parts = message.split('|');
    let player = parts.next()?;
    match parts.nth(PLAYER_INFO_TAG_INDEX - 1) {
        Some("PLAYER_INFO") => Some(player),
        _ => None,
    }
}

/// Broadcast fan-out that skips repeated `PLAYER_INFO` frames.
pub struct DedupBroadcast {
    cache: Arc<Mutex<DeliveryCache>>,
}

impl DedupBroadcast {
    fn new(cache: Arc<Mutex<DeliveryCache>>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl BroadcastOverride for DedupBroadcast {
    async fn broadcast(&self, message: &str, exclude: Option<ConnectionId>, direct: &dyn DirectSender) {
        let key = player_info_key(message);
        let mut cache = self.cache.lock().await;

        for conn in direct.connected_clients() {
            if Some(conn) == exclude {
                continue;
            }

            if let Some(player) = key {
                // Recipients without a cache entry connected before the
                // plugin loaded; they are never deduplicated.
                if let Some(seen) = cache.get_mut(&conn) {
                    if seen.get(player).map(String::as_str) == Some(message) {
                        trace!("Suppressed repeated PLAYER_INFO for {} to {}", player, conn);
                        continue;
                    }
                    seen.insert(player.to_string(), message.to_string());
                }
            }

            direct.send_direct(conn, message);
        }
    }
}

pub struct PingOptimizerPlugin {
    cache: Arc<Mutex<DeliveryCache>>,
}

impl PingOptimizerPlugin {
    pub fn new() -> Self {
        Self {
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of recipients currently tracked.
    pub async fn tracked_recipients(&self) -> usize {
        self.cache.lock().await.len()
    }
}

impl Default for PingOptimizerPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for PingOptimizerPlugin {
    fn name(&self) -> &str {
        "ping_optimizer"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn is_core(&self) -> bool {
        true
    }

    fn hooks(&self) -> Hooks {
        Hooks::NONE
            .with(HookKind::Load)
            .with(HookKind::Connect)
            .with(HookKind::Disconnect)
            .with(HookKind::Unload)
    }

    async fn on_load(&self, api: Arc<dyn ServerApi>) -> Result<(), PluginError> {
        api.set_broadcast_override(Arc::new(DedupBroadcast::new(self.cache.clone())))
            .await;
        api.log(LogLevel::Info, "Broadcast override active, deduplicating PLAYER_INFO");
        Ok(())
    }

    async fn on_connect(&self, conn: ConnectionId, _api: Arc<dyn ServerApi>) -> Result<(), PluginError> {
        self.cache.lock().await.insert(conn, HashMap::new());
        Ok(())
    }

    async fn on_disconnect(&self, conn: ConnectionId, _api: Arc<dyn ServerApi>) -> Result<(), PluginError> {
        self.cache.lock().await.remove(&conn);
        Ok(())
    }

    async fn on_unload(&self, api: Arc<dyn ServerApi>) -> Result<(), PluginError> {
        api.clear_broadcast_override().await;
        self.cache.lock().await.clear();
        api.log(LogLevel::Info, "Broadcast override released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plasocket_api::BlockId;
    use std::sync::Mutex as StdMutex;

    const INFO_A: &str = "alice|10|20|1|0|walk|PLAYER_INFO";
    const INFO_A_MOVED: &str = "alice|11|20|1|0|walk|PLAYER_INFO";
    const INFO_B: &str = "bob|3|4|0|0|idle|PLAYER_INFO";

    #[derive(Default)]
    struct Recorder {
        clients: Vec<ConnectionId>,
        sent: StdMutex<Vec<(ConnectionId, String)>>,
    }

    impl Recorder {
        fn with_clients(ids: &[u64]) -> Self {
            Self {
                clients: ids.iter().copied().map(ConnectionId).collect(),
                sent: StdMutex::default(),
            }
        }

        fn take(&self) -> Vec<(ConnectionId, String)> {
            std::mem::take(&mut *self.sent.lock().unwrap())
        }
    }

    impl DirectSender for Recorder {
        fn connected_clients(&self) -> Vec<ConnectionId> {
            self.clients.clone()
        }

        fn send_direct(&self, conn: ConnectionId, message: &str) -> bool {
            self.sent.lock().unwrap().push((conn, message.to_string()));
            true
        }
    }

    #[derive(Default)]
    struct OverrideSlot {
        installed: StdMutex<Option<Arc<dyn BroadcastOverride>>>,
    }

    #[async_trait]
    impl ServerApi for OverrideSlot {
        fn send_to_client(&self, _conn: ConnectionId, _message: &str) -> bool {
            true
        }
        async fn broadcast(&self, _message: &str, _exclude: Option<ConnectionId>) {}
        fn connected_clients(&self) -> Vec<ConnectionId> {
            Vec::new()
        }
        fn username_of(&self, _conn: ConnectionId) -> Option<String> {
            None
        }
        fn connection_of(&self, _username: &str) -> Option<ConnectionId> {
            None
        }
        fn is_pvp_enabled(&self) -> bool {
            false
        }
        fn log(&self, _level: LogLevel, _message: &str) {}
        fn plugin_names(&self) -> Vec<String> {
            Vec::new()
        }
        async fn block_at(&self, _x: i64, _y: i64) -> Option<BlockId> {
            None
        }
        async fn world_size(&self) -> (usize, usize) {
            (0, 0)
        }
        async fn set_broadcast_override(&self, handler: Arc<dyn BroadcastOverride>) {
            *self.installed.lock().unwrap() = Some(handler);
        }
        async fn clear_broadcast_override(&self) {
            *self.installed.lock().unwrap() = None;
        }
    }

    async fn tracked(ids: &[u64]) -> DedupBroadcast {
        let cache = Arc::new(Mutex::new(HashMap::new()));
        for id in ids {
            cache.lock().await.insert(ConnectionId(*id), HashMap::new());
        }
        DedupBroadcast::new(cache)
    }

    #[test]
    fn test_player_info_key() {
        assert_eq!(player_info_key(INFO_A), Some("alice"));
        assert_eq!(player_info_key("PLACE|PLACERSERVER|1|2|3"), None);
        assert_eq!(player_info_key("alice|PLAYER_INFO"), None);
    }

    #[tokio::test]
    async fn test_repeated_player_info_is_suppressed() {
        let dedup = tracked(&[1, 2]).await;
        let direct = Recorder::with_clients(&[1, 2]);

        dedup.broadcast(INFO_A, None, &direct).await;
        assert_eq!(direct.take().len(), 2);

        dedup.broadcast(INFO_A, None, &direct).await;
        assert!(direct.take().is_empty());

        dedup.broadcast(INFO_A_MOVED, None, &direct).await;
        assert_eq!(direct.take().len(), 2);
    }

    #[tokio::test]
    async fn test_cache_is_per_recipient_and_player() {
        let dedup = tracked(&[1, 2]).await;
        let direct = Recorder::with_clients(&[1, 2]);

        // Client 1 is excluded the first time, so it has not seen the frame yet.
        dedup.broadcast(INFO_A, Some(ConnectionId(1)), &direct).await;
        assert_eq!(direct.take(), vec![(ConnectionId(2), INFO_A.to_string())]);

        dedup.broadcast(INFO_A, None, &direct).await;
        assert_eq!(direct.take(), vec![(ConnectionId(1), INFO_A.to_string())]);

        dedup.broadcast(INFO_B, None, &direct).await;
        assert_eq!(direct.take().len(), 2);
    }

    #[tokio::test]
    async fn test_other_frames_always_delivered() {
        let dedup = tracked(&[1]).await;
        let direct = Recorder::with_clients(&[1]);
        let place = "PLACE|PLACERSERVER|1|1|2";

        dedup.broadcast(place, None, &direct).await;
        dedup.broadcast(place, None, &direct).await;

        assert_eq!(direct.take().len(), 2);
    }

    #[tokio::test]
    async fn test_untracked_recipient_gets_every_frame() {
        let dedup = tracked(&[]).await;
        let direct = Recorder::with_clients(&[7]);

        dedup.broadcast(INFO_A, None, &direct).await;
        dedup.broadcast(INFO_A, None, &direct).await;

        assert_eq!(direct.take().len(), 2);
    }

    #[tokio::test]
    async fn test_lifecycle_installs_and_releases_override() {
        let plugin = PingOptimizerPlugin::new();
        let slot = Arc::new(OverrideSlot::default());
        let api: Arc<dyn ServerApi> = slot.clone();

        plugin.on_load(api.clone()).await.unwrap();
        assert!(slot.installed.lock().unwrap().is_some());

        plugin.on_connect(ConnectionId(1), api.clone()).await.unwrap();
        plugin.on_connect(ConnectionId(2), api.clone()).await.unwrap();
        assert_eq!(plugin.tracked_recipients().await, 2);

        plugin.on_disconnect(ConnectionId(1), api.clone()).await.unwrap();
        assert_eq!(plugin.tracked_recipients().await, 1);

        plugin.on_unload(api.clone()).await.unwrap();
        assert!(slot.installed.lock().unwrap().is_none());
        assert_eq!(plugin.tracked_recipients().await, 0);
    }

    #[test]
    fn test_plugin_is_core_without_message_hook() {
        let plugin = PingOptimizerPlugin::new();
        assert!(plugin.is_core());
        assert!(!plugin.hooks().contains(HookKind::Message));
    }
}
