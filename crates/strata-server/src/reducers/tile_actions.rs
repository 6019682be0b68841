//! Tile mutation reducers (placement and damage)

use glam::IVec2;
use strata_core::WorldError;
use strata_core::protocol::{ClientId, ServerMessage};
use strata_core::tiles::TileId;
use strata_core::world::{ChunkData, FULL_DURABILITY, world_to_chunk_coords};

use crate::helpers::ensure_chunk;
use crate::state::WorldCore;
use crate::transport::Outbox;

/// What a damage request did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Nothing to damage (air, unbreakable tile, missing chunk, bad amount)
    Ignored,
    /// Durability lowered to the given value
    Damaged(i16),
    /// Durability ran out; the tile is now air
    Destroyed,
}

/// Make sure the chunk holding `cell` exists, generating it on demand
fn ensure_cell<O: Outbox>(core: &mut WorldCore<O>, cell: IVec2) -> bool {
    let (coord, _, _) = world_to_chunk_coords(cell.x, cell.y);
    match ensure_chunk(core, coord) {
        Ok(()) => true,
        Err(e) => {
            log::error!("[STORE] Tile action at ({}, {}) aborted: {}", cell.x, cell.y, e);
            false
        }
    }
}

/// Put a fresh tile in a cell: no ore, full durability
fn reset_cell(chunk: &mut ChunkData, x: i32, y: i32, tile_id: u16) -> Result<(), WorldError> {
    chunk.set_ground(x, y, tile_id)?;
    chunk.set_ore(x, y, TileId::INVALID)?;
    chunk.set_durability(x, y, FULL_DURABILITY)
}

/// Place a tile (air digs); ore and damage at the cell are reset
pub fn set_tile<O: Outbox>(core: &mut WorldCore<O>, client: ClientId, cell: IVec2, tile_id: u16) -> bool {
    if !core.state.generator.tiles().is_ground(tile_id) {
        log::warn!("[STORE] {} tried to place invalid ground tile {}", client, tile_id);
        return false;
    }
    if !ensure_cell(core, cell) {
        return false;
    }

    let (chunk, x, y) = match core.state.store.cell_mut(cell.x, cell.y) {
        Ok(found) => found,
        Err(e) => {
            log::error!("[STORE] {}", e);
            return false;
        }
    };
    let previous_durability = chunk.durability(x, y).unwrap_or(FULL_DURABILITY);
    if let Err(e) = reset_cell(chunk, x, y, tile_id) {
        log::warn!("[STORE] {}", e);
        return false;
    }

    log::trace!("[STORE] {} set ({}, {}) to {}", client, cell.x, cell.y, tile_id);
    core.outbox.broadcast(&ServerMessage::TileChanged { cell, tile_id });
    if previous_durability != FULL_DURABILITY {
        core.outbox.broadcast(&ServerMessage::DurabilityChanged {
            cell,
            durability: FULL_DURABILITY,
        });
    }
    true
}

/// Apply mining damage to a tile
///
/// Untouched tiles start from their type's max durability. When durability
/// reaches zero the tile becomes air and its ore is cleared.
pub fn damage_tile<O: Outbox>(
    core: &mut WorldCore<O>,
    client: ClientId,
    cell: IVec2,
    amount: i16,
) -> DamageOutcome {
    if amount <= 0 {
        log::warn!("[STORE] {} sent non-positive damage {}", client, amount);
        return DamageOutcome::Ignored;
    }
    if !ensure_cell(core, cell) {
        return DamageOutcome::Ignored;
    }

    let state = &mut core.state;
    let (chunk, x, y) = match state.store.cell_mut(cell.x, cell.y) {
        Ok(found) => found,
        Err(e) => {
            log::error!("[STORE] {}", e);
            return DamageOutcome::Ignored;
        }
    };
    let (Ok(tile), Ok(stored)) = (chunk.ground(x, y), chunk.durability(x, y)) else {
        return DamageOutcome::Ignored;
    };
    if tile == TileId::AIR {
        return DamageOutcome::Ignored;
    }
    let Some(max) = state.generator.tiles().max_durability(tile) else {
        log::trace!("[STORE] Tile {} at ({}, {}) is unbreakable", tile, cell.x, cell.y);
        return DamageOutcome::Ignored;
    };

    let current = if stored == FULL_DURABILITY {
        i32::from(max)
    } else {
        i32::from(stored)
    };
    let remaining = current - i32::from(amount);

    if remaining <= 0 {
        if let Err(e) = reset_cell(chunk, x, y, TileId::AIR) {
            log::warn!("[STORE] {}", e);
            return DamageOutcome::Ignored;
        }
        log::trace!("[STORE] {} broke tile {} at ({}, {})", client, tile, cell.x, cell.y);
        core.outbox.broadcast(&ServerMessage::TileChanged {
            cell,
            tile_id: TileId::AIR,
        });
        core.outbox.broadcast(&ServerMessage::DurabilityChanged {
            cell,
            durability: FULL_DURABILITY,
        });
        return DamageOutcome::Destroyed;
    }

    // remaining < current <= i16::MAX
    let durability = remaining as i16;
    if let Err(e) = chunk.set_durability(x, y, durability) {
        log::warn!("[STORE] {}", e);
        return DamageOutcome::Ignored;
    }
    core.outbox
        .broadcast(&ServerMessage::DurabilityChanged { cell, durability });
    DamageOutcome::Damaged(durability)
}
