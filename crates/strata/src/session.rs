//! Headless session: one server and one streaming client in a single process
//!
//! Every message still crosses the channel hub as an encoded frame, so a session
//! exercises the same path a networked client would.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use glam::{IVec2, Vec2};
use strata_core::protocol::ClientMessage;
use strata_server::{ChannelHub, ClientEndpoint, WorldServer};
use web_time::Instant;

use crate::config::StrataConfig;
use crate::streaming::{ChunkStreamer, StreamState, StreamStats};
use crate::tile_grid::TileGrid;

/// What a finished run looked like
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub ticks: u64,
    pub elapsed: Duration,
    pub position: Vec2,
    pub stream: StreamStats,
    pub loaded_chunks: usize,
    pub server_chunks: usize,
    pub live_entities: usize,
    pub mirrored_entities: usize,
}

pub struct Session {
    config: StrataConfig,
    server: WorldServer<ChannelHub>,
    endpoint: ClientEndpoint,
    streamer: ChunkStreamer<TileGrid>,
    position: Vec2,
    ticks: u64,
}

impl Session {
    /// Fresh world from `config.server.seed`
    pub fn new(config: StrataConfig) -> Self {
        let mut hub = ChannelHub::new();
        let inbound = hub.inbound();
        let endpoint = hub.connect();
        let server = WorldServer::new(config.server.clone(), hub, inbound);
        Self::assemble(config, server, endpoint)
    }

    /// World restored from a save file
    pub fn load(config: StrataConfig, path: &Path) -> Result<Self> {
        let mut hub = ChannelHub::new();
        let inbound = hub.inbound();
        let endpoint = hub.connect();
        let server = WorldServer::load(config.server.clone(), hub, inbound, path)
            .with_context(|| format!("Failed to load world from {}", path.display()))?;

        let mut session = Self::assemble(config, server, endpoint);
        session.position = session.server.state().save.player_position;
        Ok(session)
    }

    fn assemble(config: StrataConfig, server: WorldServer<ChannelHub>, endpoint: ClientEndpoint) -> Self {
        let streamer = ChunkStreamer::new(
            TileGrid::new(),
            config.client.view_radius,
            config.client.payloads_per_tick,
        );
        let position = config.session.start();
        Self {
            config,
            server,
            endpoint,
            streamer,
            position,
            ticks: 0,
        }
    }

    fn send(&self, message: &ClientMessage) {
        match self.endpoint.send(message) {
            Ok(true) => {}
            Ok(false) => log::warn!("[NET] Server is gone, message dropped"),
            Err(e) => log::error!("[NET] {}", e),
        }
    }

    /// One round trip: stream, let the server tick, apply what came back
    pub fn step(&mut self) {
        if let Some(request) = self.streamer.update_position(self.position) {
            self.send(&request);
        }

        self.server.tick();
        for message in self.endpoint.drain() {
            self.streamer.receive(message);
        }
        self.streamer.tick();
        self.ticks += 1;
    }

    /// Step until nothing is in flight, up to `max_ticks`; returns ticks taken
    pub fn settle(&mut self, max_ticks: usize) -> usize {
        for ticks in 1..=max_ticks {
            self.step();
            if self.streamer.state() == StreamState::Idle && self.server.pending_jobs() == 0 {
                return ticks;
            }
        }
        max_ticks
    }

    pub fn walk(&mut self, delta: Vec2) {
        self.position += delta;
    }

    pub fn teleport(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn dig(&self, cell: IVec2, amount: i16) {
        self.send(&ClientMessage::DamageTile { cell, amount });
    }

    pub fn place(&self, cell: IVec2, tile_id: u16) {
        self.send(&ClientMessage::SetTile { cell, tile_id });
    }

    /// Walk for `session.ticks` ticks, digging at the viewer's cell on the configured interval
    pub fn run(&mut self) -> SessionSummary {
        let started = Instant::now();
        let ticks = self.config.session.ticks;
        let velocity = self.config.session.velocity();
        let (dig_interval, dig_damage) = (self.config.session.dig_interval, self.config.session.dig_damage);

        log::info!(
            "[STREAM] Running {} tick(s) from ({:.1}, {:.1})",
            ticks,
            self.position.x,
            self.position.y
        );

        for tick in 1..=ticks {
            self.walk(velocity);
            if dig_interval > 0 && tick % dig_interval == 0 {
                self.dig(self.position.floor().as_ivec2(), dig_damage);
            }
            self.step();
        }
        self.settle(ticks.max(1) as usize);

        let summary = self.summary(started.elapsed());
        log::info!(
            "[STREAM] {} tick(s) in {:.2?}: {} chunk(s) loaded, {} bulk / {} per-chunk batch(es)",
            summary.ticks,
            summary.elapsed,
            summary.loaded_chunks,
            summary.stream.bulk_batches,
            summary.stream.per_chunk_batches
        );
        summary
    }

    pub fn summary(&self, elapsed: Duration) -> SessionSummary {
        SessionSummary {
            ticks: self.ticks,
            elapsed,
            position: self.position,
            stream: self.streamer.stats(),
            loaded_chunks: self.streamer.loaded_count(),
            server_chunks: self.server.state().store.len(),
            live_entities: self.server.state().entities.live_count(),
            mirrored_entities: self.streamer.world().entities.live_count(),
        }
    }

    /// Disconnect the client and stop the server, saving when a save path is configured
    pub fn shutdown(mut self) -> Result<()> {
        self.send(&ClientMessage::Disconnect);
        self.server.tick();
        self.server
            .shutdown(Some(self.position))
            .context("Failed to save world on shutdown")?;
        Ok(())
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn streamer(&self) -> &ChunkStreamer<TileGrid> {
        &self.streamer
    }

    pub fn server(&self) -> &WorldServer<ChannelHub> {
        &self.server
    }

    pub fn config(&self) -> &StrataConfig {
        &self.config
    }
}
