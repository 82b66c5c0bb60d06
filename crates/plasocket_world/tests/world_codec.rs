use plasocket_world::{BlockId, WorldError, WorldFile, WorldGrid};

/// Deterministic pseudo-random grid so failures are reproducible.
fn scrambled_grid(width: usize, height: usize, seed: u64) -> WorldGrid {
    let mut state = seed;
    let cells = (0..width * height)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            // long runs are more realistic than pure noise
            let pick = (state >> 60) as usize;
            if pick < 10 {
                BlockId::Stone
            } else {
                BlockId::ALL[(state >> 33) as usize % BlockId::ALL.len()]
            }
        })
        .collect();
    WorldGrid::from_cells(width, height, cells).unwrap()
}

#[test]
fn encoded_world_decodes_to_same_cells() {
    for (width, height, seed) in [(1, 1, 1), (7, 3, 2), (100, 60, 3), (13, 41, 4)] {
        let grid = scrambled_grid(width, height, seed);
        let decoded = WorldGrid::decode_rle(&grid.encode_rle(), width, height).unwrap();
        assert_eq!(decoded.cells(), grid.cells());
    }
}

#[test]
fn world_file_round_trips_through_json() {
    let grid = scrambled_grid(20, 10, 9);
    let json = WorldFile::from_grid(&grid).to_json().unwrap();
    let file: WorldFile = serde_json::from_str(&json).unwrap();
    assert_eq!(file.to_grid().unwrap(), grid);
}

#[test]
fn default_world_encodes_compactly() {
    let encoded = WorldGrid::default().encode_rle();
    assert_eq!(encoded, "100x1,500x0,5400x2");
}

#[test]
fn world_file_rejects_empty_dimensions() {
    let file = WorldFile {
        c2tilemap: true,
        width: 0,
        height: 10,
        data: String::new(),
    };
    assert!(matches!(file.to_grid(), Err(WorldError::MalformedRle(_))));
}
