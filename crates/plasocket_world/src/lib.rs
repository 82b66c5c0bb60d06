//! World state for Plasocket: the block grid, its run-length codec and the
//! world file.

pub mod block;
pub mod error;
pub mod grid;
pub mod persistence;
pub mod rle;

pub use block::BlockId;
pub use error::{WorldError, WorldResult};
pub use grid::{WorldGrid, DEFAULT_HEIGHT, DEFAULT_WIDTH, DIRT_DEPTH, MAX_CELLS};
pub use persistence::{shared, SharedWorld, WorldFile, WorldStore};
