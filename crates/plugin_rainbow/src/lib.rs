//! Rainbow plugin
//!
//! `!rainbow` in chat toggles rainbow mode for the sender. While it is on,
//! the player's placements never reach the world: each one starts a
//! background task that keeps re-broadcasting the cell through a colour
//! cycle until the player disconnects or the plugin unloads.

use async_trait::async_trait;
use plasocket_api::{
    BlockId, ConnectionId, HookKind, Hooks, LogLevel, Plugin, PluginError, ServerApi, ServerFrame,
    CLIENT_TAG,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const COMMAND: &str = "!rainbow";

/// Pause between two frames of a colour cycle.
pub const DEFAULT_STEP: Duration = Duration::from_millis(300);

/// One full pass: up from purple to dark blue, then back down.
const CYCLE: [BlockId; 11] = [
    BlockId::Purple,
    BlockId::Orange,
    BlockId::Green,
    BlockId::Red,
    BlockId::LightBlue,
    BlockId::DarkBlue,
    BlockId::LightBlue,
    BlockId::Red,
    BlockId::Green,
    BlockId::Orange,
    BlockId::Purple,
];

#[derive(Default)]
struct PlayerState {
    enabled: bool,
    cycles: Vec<JoinHandle<()>>,
}

impl PlayerState {
    fn stop(&mut self) {
        for cycle in self.cycles.drain(..) {
            cycle.abort();
        }
    }
}

pub struct RainbowPlugin {
    step: Duration,
    players: Mutex<HashMap<ConnectionId, PlayerState>>,
}

impl RainbowPlugin {
    pub fn new() -> Self {
        Self::with_step(DEFAULT_STEP)
    }

    pub fn with_step(step: Duration) -> Self {
        Self {
            step,
            players: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self, conn: ConnectionId) -> bool {
        self.players
            .lock()
            .map(|players| players.get(&conn).is_some_and(|p| p.enabled))
            .unwrap_or(false)
    }

    /// Number of colour cycles currently running for all players.
    pub fn running_cycles(&self) -> usize {
        self.players
            .lock()
            .map(|players| {
                players
                    .values()
                    .map(|p| p.cycles.iter().filter(|c| !c.is_finished()).count())
                    .sum()
            })
            .unwrap_or(0)
    }

    fn lock_players(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<ConnectionId, PlayerState>>, PluginError> {
        self.players
            .lock()
            .map_err(|_| PluginError::Runtime("rainbow state lock poisoned".to_string()))
    }

    fn toggle(&self, conn: ConnectionId) -> Result<bool, PluginError> {
        let mut players = self.lock_players()?;
        let state = players.entry(conn).or_default();
        state.enabled = !state.enabled;
        Ok(state.enabled)
    }

    fn start_cycle(&self, conn: ConnectionId, x: i64, y: i64, api: Arc<dyn ServerApi>) -> Result<(), PluginError> {
        let step = self.step;
        let handle = tokio::spawn(async move {
            for block in CYCLE.iter().copied().cycle() {
                api.broadcast(&ServerFrame::Place { x, y, block }.to_string(), None)
                    .await;
                tokio::time::sleep(step).await;
            }
        });

        let mut players = self.lock_players()?;
        let state = players.entry(conn).or_default();
        state.cycles.retain(|c| !c.is_finished());
        state.cycles.push(handle);
        Ok(())
    }
}

impl Default for RainbowPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for RainbowPlugin {
    fn name(&self) -> &str {
        "rainbow"
    }

    fn hooks(&self) -> Hooks {
        Hooks::ALL
    }

    async fn on_load(&self, api: Arc<dyn ServerApi>) -> Result<(), PluginError> {
        api.log(LogLevel::Info, "Rainbow mode available, toggle with !rainbow");
        Ok(())
    }

    async fn on_connect(&self, conn: ConnectionId, _api: Arc<dyn ServerApi>) -> Result<(), PluginError> {
        self.lock_players()?.insert(conn, PlayerState::default());
        Ok(())
    }

    async fn on_message(
        &self,
        conn: ConnectionId,
        raw: &str,
        parts: &[String],
        api: Arc<dyn ServerApi>,
    ) -> Result<bool, PluginError> {
        match parts {
            [kind, tag, username, content]
                if kind == "PLAYER_MESSAGE"
                    && tag == CLIENT_TAG
                    && content.eq_ignore_ascii_case(COMMAND) =>
            {
                let enabled = self.toggle(conn)?;
                let status = if enabled { "ON" } else { "OFF" };
                api.send_to_client(
                    conn,
                    &ServerFrame::ServerMessage(&format!("RainbowMode|Your rainbow mode is now {}", status))
                        .to_string(),
                );
                api.log(
                    LogLevel::Info,
                    &format!("{} ({}) toggled rainbow mode {}", username, conn, status),
                );
                Ok(true)
            }
            [kind, tag, x, y, _block] if kind == "PLACE" && tag == CLIENT_TAG && self.is_enabled(conn) => {
                let (Ok(x), Ok(y)) = (x.parse::<i64>(), y.parse::<i64>()) else {
                    api.log(LogLevel::Warn, &format!("Invalid coordinates in {}", raw));
                    return Ok(false);
                };
                self.start_cycle(conn, x, y, api.clone())?;
                api.log(LogLevel::Debug, &format!("Started colour cycle at ({}, {}) for {}", x, y, conn));
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn on_disconnect(&self, conn: ConnectionId, _api: Arc<dyn ServerApi>) -> Result<(), PluginError> {
        if let Some(mut state) = self.lock_players()?.remove(&conn) {
            state.stop();
        }
        Ok(())
    }

    async fn on_unload(&self, api: Arc<dyn ServerApi>) -> Result<(), PluginError> {
        let mut players = self.lock_players()?;
        for state in players.values_mut() {
            state.stop();
        }
        players.clear();
        api.log(LogLevel::Info, "Stopped all colour cycles");
        Ok(())
    }
}
