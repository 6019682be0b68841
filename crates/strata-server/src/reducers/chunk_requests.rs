//! Chunk request handling

use glam::IVec2;
use strata_core::protocol::ClientId;

use crate::helpers::{activate_chunk, deactivate_chunk};
use crate::jobs::ChunkBatchJob;
use crate::state::WorldCore;
use crate::transport::Outbox;

/// Accept one request batch from a client
///
/// The client's origin moves first, releasing chunks it no longer holds and
/// reactivating delivered chunks it came back to; the returned job then resolves
/// and delivers the requested coordinates.
pub fn request_chunks<O: Outbox>(
    core: &mut WorldCore<O>,
    client: ClientId,
    coordinates: Vec<IVec2>,
    origin_chunk: IVec2,
) -> ChunkBatchJob {
    let radius = core.config.activation_radius;
    let change = core
        .windows
        .move_origin(client, origin_chunk, &coordinates, radius);
    for coord in &change.released {
        deactivate_chunk(core, *coord);
    }
    for coord in &change.activated {
        activate_chunk(core, *coord);
    }

    log::debug!(
        "[STREAM] {} requested {} chunk(s) around ({}, {}), released {}, reactivated {}",
        client,
        coordinates.len(),
        origin_chunk.x,
        origin_chunk.y,
        change.released.len(),
        change.activated.len()
    );
    ChunkBatchJob::new(client, coordinates)
}
