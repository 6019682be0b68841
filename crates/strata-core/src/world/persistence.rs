//! Persisted world document (JSON)
//!
//! Only chunks that were modified are stored; everything else is regenerated from
//! the seed. A saved chunk holds resolved ground ids, durabilities and its ore
//! overlay, which overwrite the regenerated grids on load. Documents written
//! before the overlay was saved still load; their ore is only cleared under air.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::chunk::{ChunkData, FULL_DURABILITY};
use crate::tiles::{CHUNK_AREA, TileId, TileRegistry};

/// Current save format version
pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed world document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported save version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PersistenceError + '_ {
    move |source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Flattened grids of one saved chunk (row-major, `CHUNK_AREA` long)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedChunk {
    pub tile_ids: Vec<i32>,
    pub tile_durabilities: Vec<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ore_ids: Option<Vec<i32>>,
}

/// A saved chunk validated against the tile registry
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredChunk {
    pub coord: IVec2,
    pub ground: Vec<u16>,
    pub durability: Vec<i16>,
    pub ore: Option<Vec<u16>>,
}

impl RestoredChunk {
    /// Overwrite a regenerated chunk with the saved grids
    pub fn apply_to(&self, chunk: &mut ChunkData) -> Result<(), crate::WorldError> {
        chunk.overwrite_ground(&self.ground, &self.durability)?;
        if let Some(ore) = &self.ore {
            chunk.overwrite_ore(ore)?;
        }
        Ok(())
    }
}

/// The whole persisted world
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSave {
    pub version: u32,
    pub seed: u64,
    pub created_at: String,
    pub last_played: String,
    pub player_position: Vec2,
    /// Keyed by `"x,y"` chunk coordinates
    pub chunks: BTreeMap<String, SavedChunk>,
}

/// `"x,y"` key for a chunk coordinate
pub fn chunk_key(coord: IVec2) -> String {
    format!("{},{}", coord.x, coord.y)
}

/// Inverse of [`chunk_key`]
pub fn parse_chunk_key(key: &str) -> Option<IVec2> {
    let (x, y) = key.split_once(',')?;
    Some(IVec2::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
}

impl WorldSave {
    pub fn new(seed: u64) -> Self {
        let now = chrono::Local::now().to_rfc3339();
        Self {
            version: SAVE_VERSION,
            seed,
            created_at: now.clone(),
            last_played: now,
            player_position: Vec2::ZERO,
            chunks: BTreeMap::new(),
        }
    }

    /// Store (or replace) one chunk's ground and durability grids
    pub fn record_chunk(&mut self, chunk: &ChunkData) {
        self.chunks.insert(
            chunk_key(chunk.coord),
            SavedChunk {
                tile_ids: chunk.ground_ids().iter().map(|&id| i32::from(id)).collect(),
                tile_durabilities: chunk.durabilities().iter().map(|&d| i32::from(d)).collect(),
                ore_ids: Some(chunk.ore_ids().iter().map(|&id| i32::from(id)).collect()),
            },
        );
    }

    /// Record every chunk yielded, returning how many were recorded
    pub fn capture<'a>(&mut self, chunks: impl IntoIterator<Item = &'a ChunkData>) -> usize {
        let mut count = 0;
        for chunk in chunks {
            self.record_chunk(chunk);
            count += 1;
        }
        count
    }

    /// Write atomically: temp file first, then rename over the target
    pub fn save(&mut self, path: &Path) -> Result<(), PersistenceError> {
        self.last_played = chrono::Local::now().to_rfc3339();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(io_error(parent))?;
        }

        let json = serde_json::to_string_pretty(self)?;
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, json).map_err(io_error(&temp_path))?;
        std::fs::rename(&temp_path, path).map_err(io_error(path))?;

        log::info!("[SAVE] World saved to {:?} ({} chunks)", path, self.chunks.len());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, PersistenceError> {
        let text = std::fs::read_to_string(path).map_err(io_error(path))?;
        let save: WorldSave = serde_json::from_str(&text)?;
        if save.version > SAVE_VERSION {
            return Err(PersistenceError::Version {
                found: save.version,
                expected: SAVE_VERSION,
            });
        }
        log::info!("[LOAD] World loaded from {:?} ({} chunks)", path, save.chunks.len());
        Ok(save)
    }

    /// Validate every saved chunk
    ///
    /// Malformed keys and wrong-length grids are skipped; unknown tile ids become
    /// air and out-of-range durabilities become full health. Each is logged.
    pub fn restore_chunks(&self, tiles: &TileRegistry) -> Vec<RestoredChunk> {
        let mut restored = Vec::with_capacity(self.chunks.len());

        for (key, saved) in &self.chunks {
            let Some(coord) = parse_chunk_key(key) else {
                log::warn!("[LOAD] Skipping chunk with malformed key {:?}", key);
                continue;
            };
            if saved.tile_ids.len() != CHUNK_AREA || saved.tile_durabilities.len() != CHUNK_AREA {
                log::warn!(
                    "[LOAD] Skipping chunk {}: expected {} tiles, got {} ids / {} durabilities",
                    key,
                    CHUNK_AREA,
                    saved.tile_ids.len(),
                    saved.tile_durabilities.len()
                );
                continue;
            }

            let ground = saved
                .tile_ids
                .iter()
                .map(|&raw| match u16::try_from(raw) {
                    Ok(id) if tiles.is_ground(id) => id,
                    _ => {
                        log::warn!("[LOAD] Unknown tile id {} in chunk {}, using air", raw, key);
                        TileId::AIR
                    }
                })
                .collect();

            let durability = saved
                .tile_durabilities
                .iter()
                .map(|&raw| match i16::try_from(raw) {
                    Ok(value) if value >= FULL_DURABILITY => value,
                    _ => {
                        log::warn!("[LOAD] Invalid durability {} in chunk {}, resetting", raw, key);
                        FULL_DURABILITY
                    }
                })
                .collect();

            let ore = match &saved.ore_ids {
                Some(ids) if ids.len() == CHUNK_AREA => Some(
                    ids.iter()
                        .map(|&raw| match u16::try_from(raw) {
                            Ok(id) if id == TileId::INVALID || tiles.is_ore(id) => id,
                            _ => {
                                log::warn!("[LOAD] Unknown ore id {} in chunk {}, dropping", raw, key);
                                TileId::INVALID
                            }
                        })
                        .collect(),
                ),
                Some(ids) => {
                    log::warn!(
                        "[LOAD] Ignoring ore overlay of chunk {}: expected {} ids, got {}",
                        key,
                        CHUNK_AREA,
                        ids.len()
                    );
                    None
                }
                None => None,
            };

            restored.push(RestoredChunk {
                coord,
                ground,
                durability,
                ore,
            });
        }

        restored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saved_chunk(tile: i32, durability: i32) -> SavedChunk {
        SavedChunk {
            tile_ids: vec![tile; CHUNK_AREA],
            tile_durabilities: vec![durability; CHUNK_AREA],
            ore_ids: None,
        }
    }

    #[test]
    fn test_chunk_key_roundtrip() {
        for coord in [IVec2::new(0, 0), IVec2::new(-3, 17), IVec2::new(i32::MIN, i32::MAX)] {
            assert_eq!(parse_chunk_key(&chunk_key(coord)), Some(coord));
        }
        assert_eq!(parse_chunk_key("1;2"), None);
        assert_eq!(parse_chunk_key("a,2"), None);
        assert_eq!(parse_chunk_key("1,2,3"), None);
    }

    #[test]
    fn test_unknown_tile_becomes_air() {
        let mut save = WorldSave::new(1);
        let mut chunk = saved_chunk(TileId::STONE as i32, 50);
        chunk.tile_ids[0] = 12345;
        chunk.tile_ids[1] = -7;
        chunk.tile_ids[2] = TileId::COAL_ORE as i32;
        save.chunks.insert("2,-1".to_string(), chunk);

        let restored = save.restore_chunks(&TileRegistry::new());
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].coord, IVec2::new(2, -1));
        assert_eq!(&restored[0].ground[..4], &[TileId::AIR, TileId::AIR, TileId::AIR, TileId::STONE]);
        assert!(restored[0].durability.iter().all(|&d| d == 50));
    }

    #[test]
    fn test_malformed_entries_skipped() {
        let mut save = WorldSave::new(1);
        save.chunks.insert("oops".to_string(), saved_chunk(1, -1));
        save.chunks.insert(
            "0,0".to_string(),
            SavedChunk {
                tile_ids: vec![1; 10],
                tile_durabilities: vec![-1; CHUNK_AREA],
                ore_ids: None,
            },
        );
        save.chunks.insert("1,0".to_string(), saved_chunk(1, -5));

        let restored = save.restore_chunks(&TileRegistry::new());
        assert_eq!(restored.len(), 1);
        assert!(restored[0].durability.iter().all(|&d| d == FULL_DURABILITY));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("worlds").join("test.json");

        let mut chunk = ChunkData::new(IVec2::new(4, -2));
        chunk.set_ground(1, 1, TileId::ICE).unwrap();
        chunk.set_durability(1, 1, 12).unwrap();

        let mut save = WorldSave::new(99);
        save.player_position = Vec2::new(3.5, -20.0);
        assert_eq!(save.capture([&chunk]), 1);
        save.save(&path).unwrap();
        assert!(!path.with_extension("tmp").exists());

        let loaded = WorldSave::load(&path).unwrap();
        assert_eq!(loaded.seed, 99);
        assert_eq!(loaded.player_position, Vec2::new(3.5, -20.0));
        assert_eq!(loaded.chunks, save.chunks);

        let restored = loaded.restore_chunks(&TileRegistry::new());
        assert_eq!(restored[0].ground.as_slice(), chunk.ground_ids());
        assert_eq!(restored[0].durability.as_slice(), chunk.durabilities());
        assert_eq!(restored[0].ore.as_deref(), Some(chunk.ore_ids()));
    }

    #[test]
    fn test_placed_tile_keeps_ore_cleared_after_reload() {
        let mut ore = [TileId::INVALID; CHUNK_AREA];
        ore[3] = TileId::IRON_ORE;
        ore[4] = TileId::GOLD_ORE;
        let generated = ChunkData::generated(IVec2::ZERO, [TileId::STONE; CHUNK_AREA], ore, [0; CHUNK_AREA]);

        // Placing dirt over the iron removes it; the gold stays
        let mut edited = generated.clone();
        edited.set_ground(3, 0, TileId::DIRT).unwrap();
        edited.set_ore(3, 0, TileId::INVALID).unwrap();
        assert_eq!(edited.ore(3, 0).unwrap(), TileId::INVALID);

        let mut save = WorldSave::new(1);
        save.capture([&edited]);
        let restored = save.restore_chunks(&TileRegistry::new());

        let mut reloaded = generated.clone();
        restored[0].apply_to(&mut reloaded).unwrap();
        assert_eq!(reloaded.ground(3, 0).unwrap(), TileId::DIRT);
        assert_eq!(reloaded.ore(3, 0).unwrap(), TileId::INVALID);
        assert_eq!(reloaded.ore(4, 0).unwrap(), TileId::GOLD_ORE);
        assert_eq!(reloaded.ore_ids(), edited.ore_ids());
    }

    #[test]
    fn test_unknown_ore_id_is_dropped() {
        let mut save = WorldSave::new(1);
        let mut chunk = saved_chunk(TileId::STONE as i32, -1);
        let mut ore = vec![TileId::INVALID as i32; CHUNK_AREA];
        ore[0] = TileId::COAL_ORE as i32;
        ore[1] = TileId::STONE as i32;
        ore[2] = -3;
        chunk.ore_ids = Some(ore);
        save.chunks.insert("0,0".to_string(), chunk);

        let restored = save.restore_chunks(&TileRegistry::new());
        let ore = restored[0].ore.as_ref().unwrap();
        assert_eq!(&ore[..3], &[TileId::COAL_ORE, TileId::INVALID, TileId::INVALID]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = WorldSave::load(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(PersistenceError::Io { .. })));
    }

    #[test]
    fn test_load_newer_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.json");
        let mut save = WorldSave::new(1);
        save.version = SAVE_VERSION + 1;
        std::fs::write(&path, serde_json::to_string(&save).unwrap()).unwrap();
        assert!(matches!(WorldSave::load(&path), Err(PersistenceError::Version { .. })));
    }
}
