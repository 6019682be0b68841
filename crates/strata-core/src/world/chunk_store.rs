//! Authoritative chunk storage with lazy generation on miss

use ahash::AHashMap;
use glam::IVec2;

use super::chunk::{ChunkData, world_to_chunk_coords};
use super::generation::{GeneratedChunk, SpawnCandidate};
use crate::error::WorldError;

/// Anything that can produce a chunk for a coordinate
pub trait ChunkSource {
    fn produce(&self, coord: IVec2) -> Result<GeneratedChunk, WorldError>;
}

/// Outcome of [`ChunkStore::ensure`]
#[derive(Debug)]
pub enum Resolved {
    /// The chunk was already stored
    Hit,
    /// The chunk was generated and stored; these spawns still need registering
    Generated(Vec<SpawnCandidate>),
}

/// Every chunk generated this session, keyed by chunk coordinate
///
/// Chunks are never evicted: the store only grows.
#[derive(Default)]
pub struct ChunkStore {
    chunks: AHashMap<IVec2, ChunkData>,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, coord: IVec2) -> Option<&ChunkData> {
        self.chunks.get(&coord)
    }

    pub fn get_mut(&mut self, coord: IVec2) -> Option<&mut ChunkData> {
        self.chunks.get_mut(&coord)
    }

    pub fn contains(&self, coord: IVec2) -> bool {
        self.chunks.contains_key(&coord)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IVec2, &ChunkData)> {
        self.chunks.iter()
    }

    /// Chunks changed since they were generated or last saved
    pub fn modified(&self) -> impl Iterator<Item = &ChunkData> {
        self.chunks.values().filter(|chunk| chunk.is_modified)
    }

    pub fn mark_all_clean(&mut self) {
        for chunk in self.chunks.values_mut() {
            chunk.mark_clean();
        }
    }

    /// Make sure `coord` is stored, generating it from `source` on a miss
    ///
    /// The store stays mutably borrowed while `source` runs, so a source cannot
    /// reach back into it and start a nested generation. On failure nothing is stored.
    pub fn ensure(&mut self, coord: IVec2, source: &impl ChunkSource) -> Result<Resolved, WorldError> {
        if self.chunks.contains_key(&coord) {
            return Ok(Resolved::Hit);
        }

        match source.produce(coord) {
            Ok(generated) => Ok(Resolved::Generated(self.insert_generated(generated))),
            Err(e) => {
                log::error!("[STORE] Failed to generate chunk ({}, {}): {}", coord.x, coord.y, e);
                Err(e)
            }
        }
    }

    /// Store a chunk produced elsewhere (e.g. by a parallel batch)
    ///
    /// Returns its spawn candidates, or nothing when the coordinate was already
    /// stored (the existing chunk wins).
    pub fn insert_generated(&mut self, generated: GeneratedChunk) -> Vec<SpawnCandidate> {
        let coord = generated.chunk.coord;
        if self.chunks.contains_key(&coord) {
            log::debug!("[STORE] Chunk ({}, {}) already stored, dropping duplicate", coord.x, coord.y);
            return Vec::new();
        }
        self.chunks.insert(coord, generated.chunk);
        generated.spawns
    }

    /// Insert or replace a chunk wholesale
    pub fn insert(&mut self, chunk: ChunkData) {
        self.chunks.insert(chunk.coord, chunk);
    }

    /// Ground tile at a world cell, if its chunk is stored
    pub fn tile_at(&self, world_x: i32, world_y: i32) -> Option<u16> {
        let (coord, x, y) = world_to_chunk_coords(world_x, world_y);
        self.chunks.get(&coord)?.ground(x as i32, y as i32).ok()
    }

    /// Chunk holding a world cell plus the cell's local position
    pub fn cell_mut(
        &mut self,
        world_x: i32,
        world_y: i32,
    ) -> Result<(&mut ChunkData, i32, i32), WorldError> {
        let (coord, x, y) = world_to_chunk_coords(world_x, world_y);
        let chunk = self
            .chunks
            .get_mut(&coord)
            .ok_or(WorldError::ChunkNotGenerated(coord))?;
        Ok((chunk, x as i32, y as i32))
    }
}
