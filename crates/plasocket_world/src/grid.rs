//! The authoritative block grid.

use crate::block::BlockId;
use crate::error::{WorldError, WorldResult};
use crate::rle;

pub const DEFAULT_WIDTH: usize = 100;
pub const DEFAULT_HEIGHT: usize = 60;

/// Number of dirt rows generated under the grass layer.
pub const DIRT_DEPTH: usize = 5;

/// Largest grid accepted from encoded data.
pub const MAX_CELLS: usize = 1 << 24;

/// Row-major grid of blocks, row 0 at the top.
///
/// `cells.len() == width * height` holds for every constructed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldGrid {
    width: usize,
    height: usize,
    cells: Vec<BlockId>,
}

impl WorldGrid {
    pub fn filled(width: usize, height: usize, block: BlockId) -> Self {
        Self {
            width,
            height,
            cells: vec![block; width * height],
        }
    }

    pub fn from_cells(width: usize, height: usize, cells: Vec<BlockId>) -> WorldResult<Self> {
        if cells.len() != width * height {
            return Err(WorldError::MalformedRle(format!(
                "{} cells do not fill a {}x{} world",
                cells.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Grass on the top row, [`DIRT_DEPTH`] rows of dirt, stone below.
    ///
    /// The bottom row is always stone, so very short worlds get fewer dirt rows.
    pub fn default_generate(width: usize, height: usize) -> Self {
        let mut cells = Vec::with_capacity(width * height);
        let dirt_end = (1 + DIRT_DEPTH).min(height.saturating_sub(1));

        for row in 0..height {
            let block = if row == 0 {
                BlockId::Grass
            } else if row < dirt_end {
                BlockId::Dirt
            } else {
                BlockId::Stone
            };
            cells.extend(std::iter::repeat(block).take(width));
        }

        Self {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[BlockId] {
        &self.cells
    }

    fn index(&self, x: i64, y: i64) -> WorldResult<usize> {
        let in_range = |v: i64, limit: usize| v >= 0 && (v as u64) < limit as u64;
        if !in_range(x, self.width) || !in_range(y, self.height) {
            return Err(WorldError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(y as usize * self.width + x as usize)
    }

    pub fn get(&self, x: i64, y: i64) -> WorldResult<BlockId> {
        let index = self.index(x, y)?;
        Ok(self.cells[index])
    }

    /// Validates `id` against the block enumeration and stores it.
    ///
    /// Returns the block that was there before.
    pub fn set(&mut self, x: i64, y: i64, id: i64) -> WorldResult<BlockId> {
        let index = self.index(x, y)?;
        let block = BlockId::try_from(id)?;
        Ok(std::mem::replace(&mut self.cells[index], block))
    }

    pub fn set_block(&mut self, x: i64, y: i64, block: BlockId) -> WorldResult<BlockId> {
        self.set(x, y, i64::from(block.id()))
    }

    pub fn encode_rle(&self) -> String {
        rle::encode(&self.cells)
    }

    pub fn decode_rle(data: &str, width: usize, height: usize) -> WorldResult<Self> {
        let len = width
            .checked_mul(height)
            .filter(|len| *len <= MAX_CELLS)
            .ok_or_else(|| {
                WorldError::MalformedRle(format!("{}x{} exceeds {} cells", width, height, MAX_CELLS))
            })?;
        let cells = rle::decode(data, len)?;
        Ok(Self {
            width,
            height,
            cells,
        })
    }
}

impl Default for WorldGrid {
    fn default() -> Self {
        Self::default_generate(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layers() {
        let grid = WorldGrid::default();
        assert_eq!(grid.width(), 100);
        assert_eq!(grid.height(), 60);
        assert_eq!(grid.cells().len(), 6000);

        for x in 0..100 {
            assert_eq!(grid.get(x, 0).unwrap(), BlockId::Grass);
            assert_eq!(grid.get(x, 1).unwrap(), BlockId::Dirt);
            assert_eq!(grid.get(x, 5).unwrap(), BlockId::Dirt);
            assert_eq!(grid.get(x, 6).unwrap(), BlockId::Stone);
            assert_eq!(grid.get(x, 59).unwrap(), BlockId::Stone);
        }
    }

    #[test]
    fn test_short_world_keeps_stone_bottom() {
        let grid = WorldGrid::default_generate(4, 3);
        assert_eq!(grid.get(0, 0).unwrap(), BlockId::Grass);
        assert_eq!(grid.get(0, 1).unwrap(), BlockId::Dirt);
        assert_eq!(grid.get(3, 2).unwrap(), BlockId::Stone);

        let grid = WorldGrid::default_generate(4, 2);
        assert_eq!(grid.get(1, 0).unwrap(), BlockId::Grass);
        assert_eq!(grid.get(1, 1).unwrap(), BlockId::Stone);
    }

    #[test]
    fn test_bounds() {
        let grid = WorldGrid::filled(3, 2, BlockId::Air);
        assert!(grid.get(2, 1).is_ok());
        for (x, y) in [(-1, 0), (3, 0), (0, 2), (0, -1)] {
            assert!(matches!(
                grid.get(x, y),
                Err(WorldError::OutOfBounds { .. })
            ));
        }
    }

    #[test]
    fn test_set_returns_previous() {
        let mut grid = WorldGrid::filled(3, 3, BlockId::Stone);
        let previous = grid.set(1, 2, BlockId::Gold.id() as i64).unwrap();
        assert_eq!(previous, BlockId::Stone);
        assert_eq!(grid.get(1, 2).unwrap(), BlockId::Gold);

        let previous = grid.set_block(1, 2, BlockId::Air).unwrap();
        assert_eq!(previous, BlockId::Gold);
    }

    #[test]
    fn test_set_rejects_unknown_id_without_writing() {
        let mut grid = WorldGrid::filled(2, 2, BlockId::Dirt);
        assert!(matches!(
            grid.set(0, 0, 500),
            Err(WorldError::InvalidBlockId(500))
        ));
        assert!(matches!(
            grid.set(5, 0, 1),
            Err(WorldError::OutOfBounds { .. })
        ));
        assert_eq!(grid, WorldGrid::filled(2, 2, BlockId::Dirt));
    }

    #[test]
    fn test_rle_round_trip() {
        let mut grid = WorldGrid::default();
        grid.set_block(5, 5, BlockId::Tnt).unwrap();
        grid.set_block(99, 59, BlockId::Air).unwrap();
        grid.set_block(0, 30, BlockId::Emerald).unwrap();

        let decoded = WorldGrid::decode_rle(&grid.encode_rle(), 100, 60).unwrap();
        assert_eq!(decoded, grid);
    }

    #[test]
    fn test_decode_rejects_oversized_dimensions() {
        for (width, height) in [(MAX_CELLS + 1, 1), (usize::MAX, 2), (MAX_CELLS, 2)] {
            assert!(matches!(
                WorldGrid::decode_rle("1", width, height),
                Err(WorldError::MalformedRle(_))
            ));
        }
    }

    #[test]
    fn test_decode_length_mismatch() {
        assert!(matches!(
            WorldGrid::decode_rle("1,1", 2, 2),
            Err(WorldError::MalformedRle(_))
        ));
    }

    #[test]
    fn test_from_cells_checks_length() {
        assert!(WorldGrid::from_cells(2, 2, vec![BlockId::Air; 3]).is_err());
        assert!(WorldGrid::from_cells(2, 2, vec![BlockId::Air; 4]).is_ok());
    }
}
