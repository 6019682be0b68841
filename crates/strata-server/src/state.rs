//! Server-owned world state
//!
//! Everything the server mutates lives here and is passed down explicitly; there
//! are no globals. [`WorldCore`] is the context jobs and reducers operate on.

use ahash::{AHashMap, AHashSet};
use glam::IVec2;
use strata_core::entity::{EntityLifecycleTracker, LifecycleEvent};
use strata_core::protocol::{ClientId, ServerMessage};
use strata_core::world::{BiomeResolver, ChunkStore, WorldGenerator, WorldSave};

use crate::config::ServerConfig;
use crate::transport::Outbox;

/// The authoritative world
pub struct WorldState {
    pub store: ChunkStore,
    pub generator: WorldGenerator,
    pub biomes: BiomeResolver,
    pub entities: EntityLifecycleTracker,
    /// Save document the modified chunks are captured into
    pub save: WorldSave,
}

impl WorldState {
    pub fn new(generator: WorldGenerator) -> Self {
        let save = WorldSave::new(generator.seed);
        Self {
            store: ChunkStore::new(),
            generator,
            biomes: BiomeResolver::new(),
            entities: EntityLifecycleTracker::new(),
            save,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct ClientWindow {
    origin: IVec2,
    /// Farthest requested coordinate seen, in chunks from the origin at request time
    reach: i32,
    /// Chunks sent to the client that it has not dropped yet
    delivered: AHashSet<IVec2>,
    /// Delivered chunks this client keeps active
    chunks: AHashSet<IVec2>,
}

/// Chunks whose viewer count crossed zero after a window update
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WindowChange {
    /// No client holds these any more
    pub released: Vec<IVec2>,
    /// Delivered earlier and back in range; first viewer again
    pub activated: Vec<IVec2>,
}

/// Which chunks each client currently holds, and how many clients hold each chunk
#[derive(Debug, Default)]
pub struct ClientWindows {
    windows: AHashMap<ClientId, ClientWindow>,
    viewers: AHashMap<IVec2, u32>,
}

/// Chebyshev distance in chunks
pub fn chunk_distance(a: IVec2, b: IVec2) -> i32 {
    let d = (a - b).abs();
    d.x.max(d.y)
}

impl ClientWindows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn origin(&self, client: ClientId) -> Option<IVec2> {
        self.windows.get(&client).map(|window| window.origin)
    }

    /// Record the client's position and requested coordinates, then resize its window
    ///
    /// Held chunks outside `radius` are released. Delivered chunks beyond the
    /// client's reach are forgotten, since the client has dropped them. Delivered
    /// chunks that are back within `radius` are held again.
    pub fn move_origin(
        &mut self,
        client: ClientId,
        origin: IVec2,
        requested: &[IVec2],
        radius: i32,
    ) -> WindowChange {
        let window = self.windows.entry(client).or_default();
        window.origin = origin;
        window.reach = requested
            .iter()
            .map(|&coord| chunk_distance(coord, origin))
            .fold(window.reach, i32::max);

        let reach = window.reach.max(radius);
        window
            .delivered
            .retain(|&coord| chunk_distance(coord, origin) <= reach);

        let outside: Vec<IVec2> = window
            .chunks
            .iter()
            .copied()
            .filter(|&coord| chunk_distance(coord, origin) > radius)
            .collect();
        for coord in &outside {
            window.chunks.remove(coord);
        }

        let returning: Vec<IVec2> = window
            .delivered
            .iter()
            .copied()
            .filter(|&coord| chunk_distance(coord, origin) <= radius)
            .filter(|coord| !window.chunks.contains(coord))
            .collect();
        window.chunks.extend(returning.iter().copied());

        let released = outside
            .into_iter()
            .filter(|&coord| self.release_viewer(coord))
            .collect();
        let activated = returning
            .into_iter()
            .filter(|&coord| self.add_viewer(coord))
            .collect();
        WindowChange {
            released,
            activated,
        }
    }

    /// Note a chunk sent to the client without holding it
    pub fn deliver(&mut self, client: ClientId, coord: IVec2) {
        self.windows.entry(client).or_default().delivered.insert(coord);
    }

    /// Give the client a delivered chunk; true when it is the chunk's first viewer
    pub fn hold(&mut self, client: ClientId, coord: IVec2) -> bool {
        let window = self.windows.entry(client).or_default();
        window.delivered.insert(coord);
        if !window.chunks.insert(coord) {
            return false;
        }
        self.add_viewer(coord)
    }

    fn add_viewer(&mut self, coord: IVec2) -> bool {
        let viewers = self.viewers.entry(coord).or_insert(0);
        *viewers += 1;
        *viewers == 1
    }

    /// Drop a client entirely, returning the chunks no client holds any more
    pub fn remove_client(&mut self, client: ClientId) -> Vec<IVec2> {
        let Some(window) = self.windows.remove(&client) else {
            return Vec::new();
        };
        window
            .chunks
            .into_iter()
            .filter(|&coord| self.release_viewer(coord))
            .collect()
    }

    fn release_viewer(&mut self, coord: IVec2) -> bool {
        let Some(viewers) = self.viewers.get_mut(&coord) else {
            return false;
        };
        *viewers = viewers.saturating_sub(1);
        if *viewers == 0 {
            self.viewers.remove(&coord);
            return true;
        }
        false
    }

    pub fn viewers(&self, coord: IVec2) -> u32 {
        self.viewers.get(&coord).copied().unwrap_or(0)
    }

    pub fn holds(&self, client: ClientId, coord: IVec2) -> bool {
        self.windows
            .get(&client)
            .is_some_and(|window| window.chunks.contains(&coord))
    }

    pub fn client_count(&self) -> usize {
        self.windows.len()
    }
}

/// State, client windows and transport bundled for jobs and reducers
pub struct WorldCore<O: Outbox> {
    pub config: ServerConfig,
    pub state: WorldState,
    pub windows: ClientWindows,
    pub outbox: O,
}

impl<O: Outbox> WorldCore<O> {
    pub fn new(config: ServerConfig, state: WorldState, outbox: O) -> Self {
        Self {
            config,
            state,
            windows: ClientWindows::new(),
            outbox,
        }
    }

    /// Broadcast queued entity spawns and despawns
    pub fn flush_entity_events(&mut self) -> usize {
        let events = self.state.entities.drain_events();
        for event in &events {
            let message = match *event {
                LifecycleEvent::Spawned {
                    id,
                    entity_type,
                    transform,
                } => ServerMessage::EntitySpawned {
                    id,
                    entity_type,
                    transform,
                },
                LifecycleEvent::Despawned { id } => ServerMessage::EntityDespawned { id },
            };
            self.outbox.broadcast(&message);
        }
        events.len()
    }
}
