//! Client side of chunk streaming
//!
//! Each time the viewer enters a new chunk the streamer diffs the required square
//! against what it already holds, asks the server for the difference in one
//! `RequestChunks` and clears what fell out of range. Delivered batches are
//! applied through the cooperative job queue so a large batch never lands in a
//! single tick.

use ahash::{AHashMap, AHashSet};
use glam::{IVec2, UVec2, Vec2};
use strata_core::protocol::{ChunkPayload, ClientMessage, ServerMessage};
use strata_core::schedule::{Job, JobQueue, JobStatus, TickBudget, TickReport};
use strata_core::tiles::{CHUNK_SIZE, TileId};
use strata_core::world::{BiomeResolver, chunk_of_position, world_to_chunk_coords};

use crate::mirror::EntityMirror;
use crate::spiral::required_chunks;
use crate::tile_grid::{DurabilityCache, TileSurface, chunk_origin};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    ComputingRequiredSet,
    AwaitingBatch,
    Applying,
}

/// Counters for what the streamer has done so far
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StreamStats {
    pub requests_sent: usize,
    pub chunks_requested: usize,
    pub chunks_applied: usize,
    pub bulk_batches: usize,
    pub per_chunk_batches: usize,
    pub stale_discarded: usize,
    pub rejected: usize,
    pub released: usize,
}

/// Everything the client mirrors locally; the context apply jobs run against
pub struct ClientWorld<S: TileSurface> {
    pub surface: S,
    pub durability: DurabilityCache,
    pub entities: EntityMirror,
    pub biomes: BiomeResolver,
    active: AHashSet<IVec2>,
    loaded: AHashSet<IVec2>,
    ore: AHashMap<IVec2, Vec<u16>>,
    stats: StreamStats,
}

impl<S: TileSurface> ClientWorld<S> {
    fn new(surface: S) -> Self {
        Self {
            surface,
            durability: DurabilityCache::new(),
            entities: EntityMirror::new(),
            biomes: BiomeResolver::new(),
            active: AHashSet::new(),
            loaded: AHashSet::new(),
            ore: AHashMap::new(),
            stats: StreamStats::default(),
        }
    }

    /// Ore overlay of a cell in a loaded chunk (`TileId::INVALID` = none)
    pub fn ore_at(&self, cell: IVec2) -> Option<u16> {
        let (coord, x, y) = world_to_chunk_coords(cell.x, cell.y);
        self.ore.get(&coord).map(|ore| ore[y * CHUNK_SIZE + x])
    }

    pub fn is_loaded(&self, coord: IVec2) -> bool {
        self.loaded.contains(&coord)
    }

    /// Everything but the ground ids, which the caller writes to the surface
    fn record_chunk(&mut self, payload: ChunkPayload) {
        let coord = payload.coord;
        self.durability.insert_chunk(coord, payload.durabilities);
        self.ore.insert(coord, payload.ore_ids);
        self.entities.set_chunk_entities(coord, payload.entity_ids);
        self.loaded.insert(coord);
        self.stats.chunks_applied += 1;
    }

    fn release(&mut self, coord: IVec2) {
        self.active.remove(&coord);
        if !self.loaded.remove(&coord) {
            return;
        }
        self.surface
            .clear_region(chunk_origin(coord), UVec2::splat(CHUNK_SIZE as u32));
        self.durability.drop_chunk(coord);
        self.ore.remove(&coord);
        self.entities.forget_chunk(coord);
        self.stats.released += 1;
    }

    fn apply_tile_change(&mut self, cell: IVec2, tile_id: u16) {
        let (coord, x, y) = world_to_chunk_coords(cell.x, cell.y);
        if !self.loaded.contains(&coord) {
            return;
        }
        self.surface.set_block(cell, tile_id);
        // The server clears ore whenever it replaces a tile
        if let Some(ore) = self.ore.get_mut(&coord) {
            ore[y * CHUNK_SIZE + x] = TileId::INVALID;
        }
    }
}

/// Bounding rectangle of a payload set when it covers that rectangle exactly once
fn dense_rectangle(payloads: &[ChunkPayload]) -> Option<(IVec2, IVec2)> {
    let first = payloads.first()?.coord;
    let (min, max) = payloads
        .iter()
        .fold((first, first), |(min, max), p| (min.min(p.coord), max.max(p.coord)));

    let span = max - min + IVec2::ONE;
    let unique: AHashSet<IVec2> = payloads.iter().map(|p| p.coord).collect();
    let dense = unique.len() == payloads.len() && payloads.len() == (span.x * span.y) as usize;
    dense.then_some((min, max))
}

/// Flatten a dense rectangle of payloads into one row-major tile buffer
///
/// Rows run bottom-up: chunk row, then the row inside the chunk; within a row,
/// chunk column, then the column inside the chunk.
pub fn merge_rectangle(payloads: &[ChunkPayload], min: IVec2, max: IVec2) -> (UVec2, Vec<u16>) {
    let span = (max - min + IVec2::ONE).as_uvec2();
    let size = span * CHUNK_SIZE as u32;
    let width = size.x as usize;
    let mut tiles = vec![TileId::AIR; width * size.y as usize];

    for payload in payloads {
        let offset = (payload.coord - min).as_uvec2();
        let (col0, row0) = (offset.x as usize * CHUNK_SIZE, offset.y as usize * CHUNK_SIZE);
        for ly in 0..CHUNK_SIZE {
            let source = &payload.ground_ids[ly * CHUNK_SIZE..(ly + 1) * CHUNK_SIZE];
            let start = (row0 + ly) * width + col0;
            tiles[start..start + CHUNK_SIZE].copy_from_slice(source);
        }
    }
    (size, tiles)
}

/// Applies one delivered batch to the client world
struct ApplyBatchJob {
    payloads: Vec<ChunkPayload>,
    /// Set once the batch is known not to be a dense rectangle
    per_chunk: bool,
}

impl ApplyBatchJob {
    fn new(payloads: Vec<ChunkPayload>) -> Self {
        Self {
            payloads,
            per_chunk: false,
        }
    }

    fn keep<S: TileSurface>(world: &mut ClientWorld<S>, payload: &ChunkPayload) -> bool {
        if !world.active.contains(&payload.coord) {
            log::debug!(
                "[STREAM] Discarding stale chunk ({}, {})",
                payload.coord.x,
                payload.coord.y
            );
            world.stats.stale_discarded += 1;
            return false;
        }
        if let Err(e) = payload.validate() {
            log::warn!("[STREAM] Rejecting payload: {}", e);
            world.stats.rejected += 1;
            return false;
        }
        true
    }
}

impl<S: TileSurface> Job<ClientWorld<S>> for ApplyBatchJob {
    fn step(&mut self, world: &mut ClientWorld<S>, budget: &mut TickBudget) -> JobStatus {
        if !self.per_chunk {
            self.payloads.retain(|payload| Self::keep(world, payload));

            if let Some((min, max)) = dense_rectangle(&self.payloads) {
                if !budget.try_spend() {
                    return JobStatus::Pending;
                }
                let (size, tiles) = merge_rectangle(&self.payloads, min, max);
                world.surface.write_region(chunk_origin(min), size, &tiles);
                for payload in self.payloads.drain(..) {
                    world.record_chunk(payload);
                }
                world.stats.bulk_batches += 1;
                log::debug!(
                    "[STREAM] Bulk write of {}x{} chunk(s) at ({}, {})",
                    max.x - min.x + 1,
                    max.y - min.y + 1,
                    min.x,
                    min.y
                );
                return JobStatus::Done;
            }

            self.per_chunk = true;
            if !self.payloads.is_empty() {
                world.stats.per_chunk_batches += 1;
            }
            // Applied from the back; order inside a batch does not matter
            self.payloads.reverse();
        }

        while let Some(payload) = self.payloads.pop() {
            // A chunk may have been released since the previous tick
            if !world.active.contains(&payload.coord) {
                world.stats.stale_discarded += 1;
                continue;
            }
            if !budget.try_spend() {
                self.payloads.push(payload);
                return JobStatus::Pending;
            }
            world.surface.write_region(
                chunk_origin(payload.coord),
                UVec2::splat(CHUNK_SIZE as u32),
                &payload.ground_ids,
            );
            world.record_chunk(payload);
        }
        JobStatus::Done
    }

    fn label(&self) -> &str {
        "apply batch"
    }
}

/// Per-client streaming state machine
pub struct ChunkStreamer<S: TileSurface> {
    radius: i32,
    state: StreamState,
    current_chunk: Option<IVec2>,
    world: ClientWorld<S>,
    jobs: JobQueue<ClientWorld<S>>,
    /// Requests sent whose batch has not arrived yet
    outstanding: usize,
}

impl<S: TileSurface + 'static> ChunkStreamer<S> {
    pub fn new(surface: S, radius: i32, payloads_per_tick: u32) -> Self {
        Self {
            radius: radius.max(0),
            state: StreamState::Idle,
            current_chunk: None,
            world: ClientWorld::new(surface),
            jobs: JobQueue::new(payloads_per_tick),
            outstanding: 0,
        }
    }

    /// Viewer moved; returns the request to send when the chunk changed
    pub fn update_position(&mut self, position: Vec2) -> Option<ClientMessage> {
        let chunk = chunk_of_position(position);
        if self.current_chunk == Some(chunk) {
            return None;
        }
        self.current_chunk = Some(chunk);
        self.state = StreamState::ComputingRequiredSet;

        let required = required_chunks(chunk, self.radius);
        let required_set: AHashSet<IVec2> = required.iter().copied().collect();

        let mut to_release: Vec<IVec2> = self
            .world
            .active
            .iter()
            .filter(|coord| !required_set.contains(coord))
            .copied()
            .collect();
        to_release.sort_by_key(|c| (c.y, c.x));
        for coord in &to_release {
            self.world.release(*coord);
        }

        let to_request: Vec<IVec2> = required
            .into_iter()
            .filter(|coord| !self.world.active.contains(coord))
            .collect();
        self.world.active.extend(to_request.iter().copied());

        log::debug!(
            "[STREAM] Entered chunk ({}, {}): {} to request, {} released",
            chunk.x,
            chunk.y,
            to_request.len(),
            to_release.len()
        );

        if to_request.is_empty() && to_release.is_empty() {
            self.settle();
            return None;
        }

        self.outstanding += 1;
        self.world.stats.requests_sent += 1;
        self.world.stats.chunks_requested += to_request.len();
        self.state = StreamState::AwaitingBatch;
        Some(ClientMessage::RequestChunks {
            coordinates: to_request,
            origin_chunk: chunk,
        })
    }

    /// Apply one server message to the local mirrors
    pub fn receive(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::DeliverChunks { payloads } => {
                self.outstanding = self.outstanding.saturating_sub(1);
                log::debug!("[STREAM] Received batch of {} chunk(s)", payloads.len());
                self.jobs.push(ApplyBatchJob::new(payloads));
                self.state = StreamState::Applying;
            }
            ServerMessage::TileChanged { cell, tile_id } => {
                self.world.apply_tile_change(cell, tile_id);
            }
            ServerMessage::DurabilityChanged { cell, durability } => {
                self.world.durability.set(cell, durability);
            }
            ServerMessage::BiomeChanged { coord, biome } => {
                self.world.biomes.set_dominant(coord, biome);
            }
            ServerMessage::EntitySpawned {
                id,
                entity_type,
                transform,
            } => self.world.entities.spawned(id, entity_type, transform),
            ServerMessage::EntityDespawned { id } => {
                self.world.entities.despawned(id);
            }
        }
    }

    /// Apply queued batches within this tick's budget
    pub fn tick(&mut self) -> TickReport {
        let report = self.jobs.run_tick(&mut self.world);
        self.settle();
        report
    }

    fn settle(&mut self) {
        self.state = if !self.jobs.is_empty() {
            StreamState::Applying
        } else if self.outstanding > 0 {
            StreamState::AwaitingBatch
        } else {
            StreamState::Idle
        };
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn current_chunk(&self) -> Option<IVec2> {
        self.current_chunk
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    pub fn is_active(&self, coord: IVec2) -> bool {
        self.world.active.contains(&coord)
    }

    /// Active chunks, sorted bottom row first
    pub fn active_chunks(&self) -> Vec<IVec2> {
        let mut chunks: Vec<IVec2> = self.world.active.iter().copied().collect();
        chunks.sort_by_key(|c| (c.y, c.x));
        chunks
    }

    pub fn loaded_count(&self) -> usize {
        self.world.loaded.len()
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn pending_batches(&self) -> usize {
        self.jobs.len()
    }

    pub fn stats(&self) -> StreamStats {
        self.world.stats
    }

    pub fn world(&self) -> &ClientWorld<S> {
        &self.world
    }

    pub fn surface(&self) -> &S {
        &self.world.surface
    }
}
