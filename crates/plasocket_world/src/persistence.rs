//! Durable storage for the world grid.
//!
//! The world lives in a single JSON file. Saves go through a temp file and a
//! rename so a crash mid-write leaves the previous file intact.

use crate::error::{WorldError, WorldResult};
use crate::grid::{WorldGrid, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tokio::{
    fs as tokio_fs,
    io::AsyncWriteExt,
    sync::{broadcast, RwLock},
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

/// The grid shared between connection tasks and the saver.
pub type SharedWorld = Arc<RwLock<WorldGrid>>;

pub fn shared(grid: WorldGrid) -> SharedWorld {
    Arc::new(RwLock::new(grid))
}

/// On-disk and on-wire representation of a world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldFile {
    pub c2tilemap: bool,
    pub width: usize,
    pub height: usize,
    pub data: String,
}

impl WorldFile {
    pub fn from_grid(grid: &WorldGrid) -> Self {
        Self {
            c2tilemap: true,
            width: grid.width(),
            height: grid.height(),
            data: grid.encode_rle(),
        }
    }

    pub fn to_grid(&self) -> WorldResult<WorldGrid> {
        if self.width == 0 || self.height == 0 {
            return Err(WorldError::MalformedRle("world has no cells".to_string()));
        }
        WorldGrid::decode_rle(&self.data, self.width, self.height)
    }

    pub fn to_json(&self) -> WorldResult<String> {
        serde_json::to_string(self).map_err(WorldError::Serialization)
    }
}

#[derive(Debug, Clone)]
pub struct WorldStore {
    path: PathBuf,
}

impl WorldStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and decodes the world file, failing on any problem.
    pub async fn load(&self) -> WorldResult<WorldGrid> {
        let contents = tokio_fs::read_to_string(&self.path)
            .await
            .map_err(|e| WorldError::FileRead(self.path.clone(), e))?;

        let file: WorldFile = serde_json::from_str(&contents)
            .map_err(|e| WorldError::Deserialization(self.path.clone(), e))?;

        file.to_grid()
    }

    /// Loads the world, or generates and persists the default one when the
    /// file is missing or unreadable.
    pub async fn load_or_generate(&self) -> WorldGrid {
        match self.load().await {
            Ok(grid) => {
                info!(
                    "Loaded {}x{} world from {}",
                    grid.width(),
                    grid.height(),
                    self.path.display()
                );
                grid
            }
            Err(e) => {
                warn!("Could not load world ({}), generating a new one", e);
                let grid = WorldGrid::default_generate(DEFAULT_WIDTH, DEFAULT_HEIGHT);
                if let Err(e) = self.save(&grid).await {
                    error!("Failed to persist generated world: {}", e);
                }
                grid
            }
        }
    }

    pub async fn save(&self, grid: &WorldGrid) -> WorldResult<()> {
        self.write(&WorldFile::from_grid(grid)).await
    }

    /// Encodes under the read lock, then writes with the lock released.
    pub async fn save_shared(&self, world: &SharedWorld) -> WorldResult<()> {
        let snapshot = {
            let grid = world.read().await;
            WorldFile::from_grid(&grid)
        };
        self.write(&snapshot).await
    }

    async fn write(&self, file: &WorldFile) -> WorldResult<()> {
        let json = serde_json::to_string(file).map_err(WorldError::Serialization)?;
        let temp_path = self.path.with_extension("tmp");

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio_fs::create_dir_all(parent)
                .await
                .map_err(|e| WorldError::FileCreate(parent.to_path_buf(), e))?;
        }

        let mut out = tokio_fs::File::create(&temp_path)
            .await
            .map_err(|e| WorldError::FileCreate(temp_path.clone(), e))?;

        out.write_all(json.as_bytes())
            .await
            .map_err(|e| WorldError::FileWrite(temp_path.clone(), e))?;

        out.sync_all()
            .await
            .map_err(|e| WorldError::FileSync(temp_path.clone(), e))?;
        drop(out);

        tokio_fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| WorldError::FileRename(temp_path, self.path.clone(), e))?;

        debug!("Saved world to {}", self.path.display());
        Ok(())
    }

    /// Saves every `period` until `shutdown` fires or its sender goes away.
    ///
    /// The first save happens one full period after the call. Failed saves are
    /// logged and the timer keeps running.
    pub fn spawn_periodic(
        &self,
        world: SharedWorld,
        period: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let store = self.clone();
        let period = if period.is_zero() {
            Duration::from_secs(1)
        } else {
            period
        };

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.recv() => break,
                }

                if let Err(e) = store.save_shared(&world).await {
                    error!("Periodic world save failed: {}", e);
                }
            }

            debug!("Periodic world saver stopped");
        })
    }

    pub async fn save_on_shutdown(&self, world: &SharedWorld) -> WorldResult<()> {
        self.save_shared(world).await?;
        info!("World saved to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockId;
    use tempfile::tempdir;

    #[test]
    fn test_world_file_json_shape() {
        let grid = WorldGrid::filled(2, 2, BlockId::Sand);
        let json = WorldFile::from_grid(&grid).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["c2tilemap"], true);
        assert_eq!(value["width"], 2);
        assert_eq!(value["height"], 2);
        assert_eq!(value["data"], "4x3");
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let store = WorldStore::new(dir.path().join("world.json"));

        let mut grid = WorldGrid::default();
        grid.set_block(10, 3, BlockId::Ruby).unwrap();
        store.save(&grid).await.unwrap();

        assert_eq!(store.load().await.unwrap(), grid);
        assert!(!dir.path().join("world.tmp").exists());
    }

    #[tokio::test]
    async fn test_save_creates_parent_directory() {
        let dir = tempdir().unwrap();
        let store = WorldStore::new(dir.path().join("nested/deeper/world.json"));
        store.save(&WorldGrid::filled(1, 1, BlockId::Air)).await.unwrap();
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_missing_file_generates_and_persists() {
        let dir = tempdir().unwrap();
        let store = WorldStore::new(dir.path().join("world.json"));

        let grid = store.load_or_generate().await;
        assert_eq!(grid, WorldGrid::default());
        assert_eq!(store.load().await.unwrap(), grid);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_replaced() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("world.json");
        std::fs::write(
            &path,
            r#"{"c2tilemap":true,"width":2,"height":2,"data":"1,1"}"#,
        )
        .unwrap();
        let store = WorldStore::new(&path);

        assert!(matches!(
            store.load().await,
            Err(WorldError::MalformedRle(_))
        ));
        let grid = store.load_or_generate().await;
        assert_eq!(grid.width(), DEFAULT_WIDTH);
        assert_eq!(store.load().await.unwrap(), grid);
    }

    #[tokio::test]
    async fn test_huge_dimensions_fall_back_to_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("world.json");
        std::fs::write(
            &path,
            r#"{"c2tilemap":true,"width":4000000000000,"height":1,"data":"1"}"#,
        )
        .unwrap();
        let store = WorldStore::new(&path);

        assert!(matches!(
            store.load().await,
            Err(WorldError::MalformedRle(_))
        ));
        let grid = store.load_or_generate().await;
        assert_eq!(grid, WorldGrid::default());
        assert_eq!(store.load().await.unwrap(), grid);
    }

    #[tokio::test]
    async fn test_garbage_json_is_deserialization_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("world.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            WorldStore::new(&path).load().await,
            Err(WorldError::Deserialization(..))
        ));
    }

    #[tokio::test]
    async fn test_periodic_saver_writes_and_stops() {
        let dir = tempdir().unwrap();
        let store = WorldStore::new(dir.path().join("world.json"));
        let world = shared(WorldGrid::filled(3, 3, BlockId::Stone));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = store.spawn_periodic(world.clone(), Duration::from_millis(20), shutdown_rx);

        world.write().await.set_block(1, 1, BlockId::Gold).unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(store.load().await.unwrap().get(1, 1).unwrap(), BlockId::Gold);

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_periodic_saver_survives_failures() {
        let dir = tempdir().unwrap();
        // the parent is a regular file, so every save fails
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let store = WorldStore::new(blocker.join("world.json"));
        let world = shared(WorldGrid::filled(1, 1, BlockId::Air));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = store.spawn_periodic(world, Duration::from_millis(10), shutdown_rx);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!handle.is_finished());

        drop(shutdown_tx);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
