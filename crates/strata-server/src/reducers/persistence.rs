//! Save and restore the authoritative world

use std::path::Path;

use glam::Vec2;
use strata_core::world::{PersistenceError, WorldSave};

use crate::helpers::ensure_chunk;
use crate::state::WorldCore;
use crate::transport::Outbox;

/// Capture modified chunks into the save document and write it
///
/// Returns how many chunks were captured by this call.
pub fn save_world<O: Outbox>(
    core: &mut WorldCore<O>,
    path: &Path,
    player_position: Option<Vec2>,
) -> Result<usize, PersistenceError> {
    let state = &mut core.state;
    let captured = state.save.capture(state.store.modified());
    if let Some(position) = player_position {
        state.save.player_position = position;
    }

    state.save.save(path)?;
    state.store.mark_all_clean();

    log::info!("[SAVE] {} modified chunk(s) captured", captured);
    Ok(captured)
}

/// Rebuild every saved chunk: regenerate it, then overwrite it with the saved grids
///
/// The save becomes the document future saves are captured into. Returns the
/// number of chunks restored.
pub fn load_world<O: Outbox>(core: &mut WorldCore<O>, save: WorldSave) -> usize {
    if save.seed != core.state.generator.seed {
        log::warn!(
            "[LOAD] Save seed {} differs from generator seed {}",
            save.seed,
            core.state.generator.seed
        );
    }

    let restored = save.restore_chunks(core.state.generator.tiles());
    let mut applied = 0;
    for chunk in &restored {
        if let Err(e) = ensure_chunk(core, chunk.coord) {
            log::error!("[LOAD] Chunk ({}, {}) skipped: {}", chunk.coord.x, chunk.coord.y, e);
            continue;
        }
        let Some(stored) = core.state.store.get_mut(chunk.coord) else {
            continue;
        };
        match chunk.apply_to(stored) {
            Ok(()) => applied += 1,
            Err(e) => log::warn!("[LOAD] Chunk ({}, {}): {}", chunk.coord.x, chunk.coord.y, e),
        }
    }

    core.state.save = save;
    log::info!("[LOAD] Restored {} chunk(s)", applied);
    applied
}

/// Open a save file and restore it into the core
pub fn load_world_file<O: Outbox>(
    core: &mut WorldCore<O>,
    path: &Path,
) -> Result<usize, PersistenceError> {
    let save = WorldSave::load(path)?;
    Ok(load_world(core, save))
}
