//! Integration tests for generation, storage, biome propagation and save/load
//!
//! These drive the public world API the way the server does: resolve through the
//! store, classify and propagate, then persist modified chunks.

use glam::IVec2;
use strata_core::tiles::{CHUNK_AREA, TileId};
use strata_core::world::{
    BiomeResolver, BiomeType, ChunkData, ChunkStore, Resolved, WorldGenerator, WorldSave,
};

fn biome_chunk(coord: IVec2, biome: BiomeType) -> ChunkData {
    ChunkData::generated(
        coord,
        [TileId::STONE; CHUNK_AREA],
        [TileId::INVALID; CHUNK_AREA],
        [biome.tag(); CHUNK_AREA],
    )
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_independent_generators_agree() {
    let coords = [
        IVec2::new(0, 0),
        IVec2::new(-3, -1),
        IVec2::new(9, -4),
        IVec2::new(-12, -9),
        IVec2::new(2, -30),
    ];

    let first = WorldGenerator::new(2024);
    let second = WorldGenerator::new(2024);
    for coord in coords {
        assert_eq!(
            first.generate_chunk(coord),
            second.generate_chunk(coord),
            "chunk {coord} differs between generators"
        );
    }
}

#[test]
fn test_store_resolution_matches_direct_generation() {
    let generator = WorldGenerator::new(5);
    let mut store = ChunkStore::new();
    let coord = IVec2::new(1, -2);

    let spawns = match store.ensure(coord, &generator).unwrap() {
        Resolved::Generated(spawns) => spawns,
        Resolved::Hit => panic!("first resolution should generate"),
    };
    let direct = generator.generate_chunk(coord);
    assert_eq!(spawns, direct.spawns);
    assert_eq!(store.get(coord).unwrap().ground_ids(), direct.chunk.ground_ids());

    assert!(matches!(store.ensure(coord, &generator), Ok(Resolved::Hit)));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_generated_layers_are_consistent() {
    let generator = WorldGenerator::new(77);
    for coord in [IVec2::new(0, -1), IVec2::new(-5, -6), IVec2::new(4, -20)] {
        let chunk = generator.generate_chunk(coord).chunk;
        for (index, (&ground, &ore)) in chunk.ground_ids().iter().zip(chunk.ore_ids()).enumerate() {
            if ore != TileId::INVALID {
                assert!(
                    generator.tiles().is_carvable(ground),
                    "ore {ore} on non-solid tile {ground} at index {index} of {coord}"
                );
            }
            assert!(BiomeType::from_tag(chunk.biome_tags()[index]).is_some());
        }
        assert!(chunk.durabilities().iter().all(|&d| d == -1));
    }
}

// ============================================================================
// Biome propagation
// ============================================================================

#[test]
fn test_cave_next_to_trench_becomes_trench() {
    let mut resolver = BiomeResolver::new();
    let cave = IVec2::new(0, -3);
    let trench = IVec2::new(1, -3);

    resolver.classify(cave, &biome_chunk(cave, BiomeType::Cave));
    resolver.classify(trench, &biome_chunk(trench, BiomeType::Trench));

    // Seeding at the trench changes nothing; the neighbor seed does
    assert!(resolver.propagate(trench).is_empty());
    assert_eq!(resolver.propagate(cave), vec![cave]);
    assert_eq!(resolver.dominant(cave), BiomeType::Trench);

    // Fixpoint reached: running again is a no-op
    assert!(resolver.propagate(cave).is_empty());
    assert!(resolver.propagate(trench).is_empty());
}

#[test]
fn test_propagation_runs_down_a_cave_corridor() {
    let mut resolver = BiomeResolver::new();
    for x in 0..5 {
        let coord = IVec2::new(x, 0);
        resolver.classify(coord, &biome_chunk(coord, BiomeType::Cave));
    }
    // Unrelated chunk touching the corridor stays as it is
    let frozen = IVec2::new(2, 1);
    resolver.classify(frozen, &biome_chunk(frozen, BiomeType::Frozen));

    let trench = IVec2::new(-1, 0);
    resolver.classify(trench, &biome_chunk(trench, BiomeType::Trench));

    let changed = resolver.propagate(IVec2::new(0, 0));
    assert_eq!(changed, (0..5).map(|x| IVec2::new(x, 0)).collect::<Vec<_>>());
    assert_eq!(resolver.dominant(frozen), BiomeType::Frozen);
}

// ============================================================================
// Save / load
// ============================================================================

#[test]
fn test_save_load_roundtrip_reproduces_modified_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.json");
    let seed = 31337;

    let generator = WorldGenerator::new(seed);
    let mut store = ChunkStore::new();
    let dug = IVec2::new(0, -2);
    let untouched = IVec2::new(1, -2);
    store.ensure(dug, &generator).unwrap();
    store.ensure(untouched, &generator).unwrap();

    // Dig a tunnel and chip a tile next to it
    for wx in 0..6 {
        let (chunk, x, y) = store.cell_mut(wx, -25).unwrap();
        chunk.set_ground(x, y, TileId::AIR).unwrap();
        chunk.set_ore(x, y, TileId::INVALID).unwrap();
    }
    let (chunk, x, y) = store.cell_mut(6, -25).unwrap();
    chunk.set_ground(x, y, TileId::STONE).unwrap();
    chunk.set_durability(x, y, 3).unwrap();

    let mut save = WorldSave::new(seed);
    assert_eq!(save.capture(store.modified()), 1);
    save.save(&path).unwrap();

    let loaded = WorldSave::load(&path).unwrap();
    assert_eq!(loaded.seed, seed);

    let regenerator = WorldGenerator::new(loaded.seed);
    let mut restored_store = ChunkStore::new();
    for restored in loaded.restore_chunks(regenerator.tiles()) {
        let mut chunk = regenerator.generate_chunk(restored.coord).chunk;
        restored.apply_to(&mut chunk).unwrap();
        restored_store.insert(chunk);
    }
    restored_store.ensure(untouched, &regenerator).unwrap();

    for coord in [dug, untouched] {
        let original = store.get(coord).unwrap();
        let reloaded = restored_store.get(coord).unwrap();
        assert_eq!(original.ground_ids(), reloaded.ground_ids(), "ground of {coord}");
        assert_eq!(original.durabilities(), reloaded.durabilities(), "durability of {coord}");
        assert_eq!(original.ore_ids(), reloaded.ore_ids(), "ore of {coord}");
    }
    assert!(restored_store.get(dug).unwrap().is_modified);
}
