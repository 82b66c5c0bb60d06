//! Run-length codec for block sequences.
//!
//! The format is a comma separated token stream. A run of `n > 1` identical
//! blocks is written `{n}x{id}`, a single block as its bare id. Runs are
//! broken only by a change of value, never by row boundaries.

use crate::block::BlockId;
use crate::error::{WorldError, WorldResult};

pub fn encode(cells: &[BlockId]) -> String {
    let mut tokens: Vec<String> = Vec::new();
    let mut iter = cells.iter().copied();

    let Some(mut current) = iter.next() else {
        return String::new();
    };
    let mut count = 1usize;

    for block in iter {
        if block == current {
            count += 1;
        } else {
            tokens.push(token(count, current));
            current = block;
            count = 1;
        }
    }
    tokens.push(token(count, current));

    tokens.join(",")
}

fn token(count: usize, block: BlockId) -> String {
    if count > 1 {
        format!("{}x{}", count, block)
    } else {
        block.to_string()
    }
}

/// Decodes `data` and checks that it expands to exactly `expected_len` cells.
///
/// Memory grows with the decoded data, never with `expected_len` alone.
pub fn decode(data: &str, expected_len: usize) -> WorldResult<Vec<BlockId>> {
    let mut cells = Vec::new();

    for raw in data.split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(WorldError::MalformedRle("empty token".to_string()));
        }

        let (count, block) = match raw.split_once('x') {
            Some((count, id)) => {
                let count: i64 = count.trim().parse().map_err(|_| {
                    WorldError::MalformedRle(format!("bad run length in {:?}", raw))
                })?;
                if count <= 0 {
                    return Err(WorldError::MalformedRle(format!(
                        "run length must be positive, got {}",
                        count
                    )));
                }
                (count as u64, parse_block(id)?)
            }
            None => (1, parse_block(raw)?),
        };

        let remaining = (expected_len - cells.len()) as u64;
        if count > remaining {
            return Err(WorldError::MalformedRle(format!(
                "data expands past {} cells",
                expected_len
            )));
        }
        cells.extend(std::iter::repeat(block).take(count as usize));
    }

    if cells.len() != expected_len {
        return Err(WorldError::MalformedRle(format!(
            "decoded {} cells, expected {}",
            cells.len(),
            expected_len
        )));
    }

    Ok(cells)
}

// Unknown ids surface as MalformedRle so callers see one error class for bad data.
fn parse_block(token: &str) -> WorldResult<BlockId> {
    BlockId::parse(token).map_err(|e| match e {
        WorldError::InvalidBlockId(id) => {
            WorldError::MalformedRle(format!("unknown block id {}", id))
        }
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_run_is_one_token() {
        let cells = vec![BlockId::Stone; 6000];
        assert_eq!(encode(&cells), "6000x2");
    }

    #[test]
    fn test_single_blocks_are_bare() {
        let cells = [BlockId::Air, BlockId::Grass, BlockId::Grass, BlockId::Dirt];
        assert_eq!(encode(&cells), "-1,2x1,0");
    }

    #[test]
    fn test_runs_span_rows() {
        // a 3x2 grid where the run crosses from row 0 into row 1
        let cells = [
            BlockId::Sand,
            BlockId::Stone,
            BlockId::Stone,
            BlockId::Stone,
            BlockId::Stone,
            BlockId::Sand,
        ];
        assert_eq!(encode(&cells), "3,4x2,3");
    }

    #[test]
    fn test_decode_expands_runs() {
        let cells = decode("2x-1,5,3x12", 6).unwrap();
        assert_eq!(
            cells,
            vec![
                BlockId::Air,
                BlockId::Air,
                BlockId::Planks,
                BlockId::Diamond,
                BlockId::Diamond,
                BlockId::Diamond,
            ]
        );
    }

    #[test]
    fn test_decode_rejects_short_data() {
        let err = decode("1,1", 4).unwrap_err();
        assert!(matches!(err, WorldError::MalformedRle(_)));
    }

    #[test]
    fn test_decode_rejects_long_data() {
        assert!(matches!(
            decode("5x1", 4),
            Err(WorldError::MalformedRle(_))
        ));
        assert!(matches!(
            decode("99999999999x1", 4),
            Err(WorldError::MalformedRle(_))
        ));
    }

    #[test]
    fn test_decode_rejects_bad_counts_and_ids() {
        assert!(decode("0x1,4x1", 4).is_err());
        assert!(decode("-2x1,6x1", 4).is_err());
        assert!(decode("4x99", 4).is_err());
        assert!(decode("1,1,,1", 3).is_err());
        assert!(decode("ax1", 1).is_err());
        assert!(decode("", 0).is_err());
    }

    #[test]
    fn test_round_trip_mixed() {
        let cells: Vec<BlockId> = (0..240)
            .map(|i| BlockId::ALL[(i / 7 + i % 3) % BlockId::ALL.len()])
            .collect();
        let encoded = encode(&cells);
        assert_eq!(decode(&encoded, cells.len()).unwrap(), cells);
    }
}
