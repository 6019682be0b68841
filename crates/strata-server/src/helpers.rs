//! Shared steps used by several reducers and jobs

use glam::IVec2;
use strata_core::WorldError;
use strata_core::entity::EntityTransform;
use strata_core::protocol::{ChunkPayload, ServerMessage};
use strata_core::world::{BiomeType, GeneratedChunk, Resolved, SpawnCandidate, chunk_of_position};

use crate::state::WorldCore;
use crate::transport::Outbox;

const NEIGHBORS: [IVec2; 4] = [IVec2::X, IVec2::NEG_X, IVec2::Y, IVec2::NEG_Y];

/// Make sure a chunk is stored, generating and integrating it on a miss
pub fn ensure_chunk<O: Outbox>(core: &mut WorldCore<O>, coord: IVec2) -> Result<(), WorldError> {
    let state = &mut core.state;
    match state.store.ensure(coord, &state.generator)? {
        Resolved::Hit => {}
        Resolved::Generated(spawns) => integrate_chunk(core, coord, spawns),
    }
    Ok(())
}

/// Store a chunk generated off the store (batch path) and integrate it
///
/// Does nothing when the coordinate was stored in the meantime.
pub fn store_generated<O: Outbox>(core: &mut WorldCore<O>, generated: GeneratedChunk) {
    let coord = generated.chunk.coord;
    if core.state.store.contains(coord) {
        return;
    }
    let spawns = core.state.store.insert_generated(generated);
    integrate_chunk(core, coord, spawns);
}

/// First-store bookkeeping: classify, reconcile biomes, register spawned entities
fn integrate_chunk<O: Outbox>(core: &mut WorldCore<O>, coord: IVec2, spawns: Vec<SpawnCandidate>) {
    let state = &mut core.state;
    let Some(chunk) = state.store.get(coord) else {
        return;
    };

    let dominant = state.biomes.classify(coord, chunk).dominant;
    if dominant != BiomeType::None {
        core.outbox.broadcast(&ServerMessage::BiomeChanged {
            coord,
            biome: dominant,
        });
    }

    // The new chunk may flip, or may be the neighbor that flips an old chunk
    let mut changed = state.biomes.propagate(coord);
    for offset in NEIGHBORS {
        let neighbor = coord + offset;
        if state.biomes.info(neighbor).is_some() {
            changed.extend(state.biomes.propagate(neighbor));
        }
    }
    changed.sort_by_key(|c| (c.x, c.y));
    changed.dedup();
    for changed_coord in changed {
        let biome = state.biomes.dominant(changed_coord);
        core.outbox.broadcast(&ServerMessage::BiomeChanged {
            coord: changed_coord,
            biome,
        });
    }

    for candidate in &spawns {
        let transform = EntityTransform::from_candidate(candidate);
        let id = state
            .entities
            .register(candidate.entity_type, transform, coord);

        // Anchored on a border: the open cell it occupies belongs to the neighbor too
        let occupied = chunk_of_position(transform.position);
        if occupied != coord {
            state.entities.associate(id, occupied);
        }
    }

    log::debug!(
        "[STORE] Integrated chunk ({}, {}): {} entities, biome {}",
        coord.x,
        coord.y,
        spawns.len(),
        state.biomes.dominant(coord).name()
    );
}

/// Payload for a stored chunk, including the entities associated with it
pub fn build_payload<O: Outbox>(core: &WorldCore<O>, coord: IVec2) -> Option<ChunkPayload> {
    let chunk = core.state.store.get(coord)?;
    let entity_ids = core.state.entities.entities_in_chunk(coord).to_vec();
    Some(ChunkPayload::from_chunk(chunk, entity_ids))
}

/// Activate a chunk's entities once its first viewer arrives
pub fn activate_chunk<O: Outbox>(core: &mut WorldCore<O>, coord: IVec2) {
    if core.state.entities.activate_chunk(coord) {
        log::trace!("[ENTITY] Chunk ({}, {}) active", coord.x, coord.y);
    }
}

/// Deactivate a chunk's entities once no client holds the chunk
pub fn deactivate_chunk<O: Outbox>(core: &mut WorldCore<O>, coord: IVec2) {
    if core.state.entities.deactivate_chunk(coord) {
        log::trace!("[ENTITY] Chunk ({}, {}) inactive", coord.x, coord.y);
    }
}
