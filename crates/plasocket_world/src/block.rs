//! The closed set of block ids understood by clients.

use crate::error::WorldError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A tile type. The numeric values are part of the wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
#[repr(i16)]
pub enum BlockId {
    Air = -1,
    Dirt = 0,
    Grass = 1,
    Stone = 2,
    Sand = 3,
    WoodLog = 4,
    Planks = 5,
    HollowPlanks = 6,
    HollowStone = 7,
    HollowDirt = 8,
    Copper = 9,
    Emerald = 10,
    Ruby = 11,
    Diamond = 12,
    Iron = 13,
    GiftedChest = 14,
    Gold = 15,
    Purple = 16,
    Orange = 17,
    Green = 18,
    Red = 19,
    LightBlue = 20,
    DarkBlue = 21,
    Tnt = 22,
    WhiteChest = 23,
    YellowChest = 24,
    GrayChest = 25,
    GreenChest = 26,
    BlueChest = 27,
}

impl BlockId {
    pub const ALL: [BlockId; 29] = [
        BlockId::Air,
        BlockId::Dirt,
        BlockId::Grass,
        BlockId::Stone,
        BlockId::Sand,
        BlockId::WoodLog,
        BlockId::Planks,
        BlockId::HollowPlanks,
        BlockId::HollowStone,
        BlockId::HollowDirt,
        BlockId::Copper,
        BlockId::Emerald,
        BlockId::Ruby,
        BlockId::Diamond,
        BlockId::Iron,
        BlockId::GiftedChest,
        BlockId::Gold,
        BlockId::Purple,
        BlockId::Orange,
        BlockId::Green,
        BlockId::Red,
        BlockId::LightBlue,
        BlockId::DarkBlue,
        BlockId::Tnt,
        BlockId::WhiteChest,
        BlockId::YellowChest,
        BlockId::GrayChest,
        BlockId::GreenChest,
        BlockId::BlueChest,
    ];

    pub fn id(self) -> i16 {
        self as i16
    }

    pub fn is_air(self) -> bool {
        self == BlockId::Air
    }

    /// Parses a decimal token such as `"12"` or `"-1"`.
    pub fn parse(token: &str) -> Result<Self, WorldError> {
        let value: i64 = token
            .trim()
            .parse()
            .map_err(|_| WorldError::MalformedRle(format!("not a block id: {:?}", token)))?;
        Self::try_from(value)
    }
}

impl TryFrom<i64> for BlockId {
    type Error = WorldError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        // ids are contiguous from -1
        let index = value
            .checked_add(1)
            .and_then(|i| usize::try_from(i).ok())
            .ok_or(WorldError::InvalidBlockId(value))?;
        BlockId::ALL
            .get(index)
            .copied()
            .ok_or(WorldError::InvalidBlockId(value))
    }
}

impl TryFrom<i16> for BlockId {
    type Error = WorldError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        BlockId::try_from(i64::from(value))
    }
}

impl From<BlockId> for i16 {
    fn from(block: BlockId) -> Self {
        block.id()
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_ordered_by_id() {
        for (index, block) in BlockId::ALL.iter().enumerate() {
            assert_eq!(block.id() as i64, index as i64 - 1);
        }
    }

    #[test]
    fn test_conversion_bounds() {
        assert_eq!(BlockId::try_from(-1i16).unwrap(), BlockId::Air);
        assert_eq!(BlockId::try_from(27i16).unwrap(), BlockId::BlueChest);
        assert!(matches!(
            BlockId::try_from(28i16),
            Err(WorldError::InvalidBlockId(28))
        ));
        assert!(matches!(
            BlockId::try_from(-2i16),
            Err(WorldError::InvalidBlockId(-2))
        ));
        assert!(BlockId::try_from(i64::MIN).is_err());
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(BlockId::parse("12").unwrap(), BlockId::Diamond);
        assert_eq!(BlockId::parse("-1").unwrap(), BlockId::Air);
        assert_eq!(BlockId::Tnt.to_string(), "22");
        assert!(BlockId::parse("grass").is_err());
    }
}
