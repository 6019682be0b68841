//! Client mirrors of server-owned entity state
//!
//! The server broadcasts typed diffs; the mirror applies them and never decides
//! anything on its own.

use ahash::{AHashMap, AHashSet};
use glam::IVec2;
use strata_core::entity::EntityTransform;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MirroredEntity {
    pub entity_type: u16,
    pub transform: EntityTransform,
}

/// Live entities as last reported by the server, plus per-chunk id lists from payloads
#[derive(Debug, Default)]
pub struct EntityMirror {
    live: AHashMap<u64, MirroredEntity>,
    by_chunk: AHashMap<IVec2, Vec<u64>>,
}

impl EntityMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawned(&mut self, id: u64, entity_type: u16, transform: EntityTransform) {
        let previous = self.live.insert(
            id,
            MirroredEntity {
                entity_type,
                transform,
            },
        );
        if previous.is_some() {
            log::debug!("[ENTITY] Spawn for already mirrored entity {}", id);
        }
    }

    pub fn despawned(&mut self, id: u64) -> bool {
        self.live.remove(&id).is_some()
    }

    pub fn set_chunk_entities(&mut self, coord: IVec2, ids: Vec<u64>) {
        self.by_chunk.insert(coord, ids);
    }

    pub fn forget_chunk(&mut self, coord: IVec2) {
        self.by_chunk.remove(&coord);
    }

    pub fn chunk_entities(&self, coord: IVec2) -> &[u64] {
        self.by_chunk.get(&coord).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, id: u64) -> Option<&MirroredEntity> {
        self.live.get(&id)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Ids referenced by any loaded chunk
    pub fn referenced_ids(&self) -> AHashSet<u64> {
        self.by_chunk.values().flatten().copied().collect()
    }
}
