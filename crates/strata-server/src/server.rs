//! The world server: owns all world state and handles client messages one at a time

use std::path::Path;
use std::time::Duration;

use crossbeam_channel::Receiver;
use glam::Vec2;
use strata_core::protocol::{self, ClientId, ClientMessage};
use strata_core::schedule::{JobQueue, TickReport};
use strata_core::world::{PersistenceError, WorldGenerator, WorldSave};

use crate::config::ServerConfig;
use crate::reducers;
use crate::state::{WorldCore, WorldState};
use crate::transport::{InboundFrame, Outbox};

pub struct WorldServer<O: Outbox> {
    core: WorldCore<O>,
    jobs: JobQueue<WorldCore<O>>,
    inbound: Receiver<InboundFrame>,
    tick_count: u64,
}

impl<O: Outbox + 'static> WorldServer<O> {
    /// Fresh world from `config.seed`
    pub fn new(config: ServerConfig, outbox: O, inbound: Receiver<InboundFrame>) -> Self {
        let generator = WorldGenerator::from_config(config.seed, config.worldgen.clone());
        Self::with_generator(config, generator, outbox, inbound)
    }

    /// World restored from a save file; the save's seed wins over `config.seed`
    pub fn load(
        config: ServerConfig,
        outbox: O,
        inbound: Receiver<InboundFrame>,
        path: &Path,
    ) -> Result<Self, PersistenceError> {
        let save = WorldSave::load(path)?;
        let generator = WorldGenerator::from_config(save.seed, config.worldgen.clone());
        let mut server = Self::with_generator(config, generator, outbox, inbound);
        reducers::load_world(&mut server.core, save);
        Ok(server)
    }

    fn with_generator(
        config: ServerConfig,
        generator: WorldGenerator,
        outbox: O,
        inbound: Receiver<InboundFrame>,
    ) -> Self {
        let mut jobs = JobQueue::new(config.chunks_per_tick);
        if let Some(ms) = config.tick_time_budget_ms {
            jobs = jobs.with_time_slice(Duration::from_millis(ms));
        }

        log::info!(
            "[NET] World server up: seed {}, worldgen '{}', {} chunk(s)/tick",
            generator.seed,
            generator.config().name,
            jobs.units_per_tick()
        );

        Self {
            core: WorldCore::new(config, WorldState::new(generator), outbox),
            jobs,
            inbound,
            tick_count: 0,
        }
    }

    /// Handle one decoded client message
    pub fn handle(&mut self, client: ClientId, message: ClientMessage) {
        match message {
            ClientMessage::RequestChunks {
                coordinates,
                origin_chunk,
            } => {
                let job = reducers::request_chunks(&mut self.core, client, coordinates, origin_chunk);
                self.jobs.push(job);
            }
            ClientMessage::SetTile { cell, tile_id } => {
                reducers::set_tile(&mut self.core, client, cell, tile_id);
            }
            ClientMessage::DamageTile { cell, amount } => {
                reducers::damage_tile(&mut self.core, client, cell, amount);
            }
            ClientMessage::Disconnect => reducers::client_disconnected(&mut self.core, client),
        }
    }

    /// Drain inbound frames, advance queued jobs, broadcast entity changes
    pub fn tick(&mut self) -> TickReport {
        self.tick_count += 1;

        while let Ok((client, frame)) = self.inbound.try_recv() {
            match protocol::decode::<ClientMessage>(&frame) {
                Ok(message) => self.handle(client, message),
                Err(e) => log::warn!("[NET] Dropping frame from {}: {}", client, e),
            }
        }

        let report = self.jobs.run_tick(&mut self.core);
        let events = self.core.flush_entity_events();

        if report.completed > 0 || events > 0 {
            log::debug!(
                "[NET] Tick {}: {} batch(es) done, {} pending, {} entity event(s)",
                self.tick_count,
                report.completed,
                report.pending,
                events
            );
        }
        report
    }

    /// Tick until no job is queued, up to `max_ticks`
    pub fn run_until_idle(&mut self, max_ticks: usize) -> usize {
        for ticks in 1..=max_ticks {
            self.tick();
            if self.jobs.is_empty() && self.inbound.is_empty() {
                return ticks;
            }
        }
        max_ticks
    }

    pub fn save(&mut self, path: &Path, player_position: Option<Vec2>) -> Result<usize, PersistenceError> {
        reducers::save_world(&mut self.core, path, player_position)
    }

    /// Stop serving; saves to `save_path` when one is configured
    pub fn shutdown(mut self, player_position: Option<Vec2>) -> Result<O, PersistenceError> {
        if let Some(path) = self.core.config.save_path.clone() {
            self.save(&path, player_position)?;
        }
        log::info!("[NET] World server stopped after {} tick(s)", self.tick_count);
        Ok(self.core.outbox)
    }

    pub fn state(&self) -> &WorldState {
        &self.core.state
    }

    pub fn state_mut(&mut self) -> &mut WorldState {
        &mut self.core.state
    }

    pub fn outbox(&self) -> &O {
        &self.core.outbox
    }

    pub fn outbox_mut(&mut self) -> &mut O {
        &mut self.core.outbox
    }

    pub fn config(&self) -> &ServerConfig {
        &self.core.config
    }

    pub fn pending_jobs(&self) -> usize {
        self.jobs.len()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}
