//! Authoritative world server for Strata
//!
//! The server owns every piece of world state and is the only writer:
//! - Chunk requests are resolved through the chunk store (generating on a miss)
//!   by a budgeted job and delivered as one message per request batch
//! - Tile placement and mining damage are applied in arrival order
//! - Per-client chunk windows drive entity activation; spawns, despawns and
//!   biome changes are broadcast as typed messages
//! - The world is saved as a JSON document of modified chunks

mod config;
mod helpers;
mod jobs;
pub mod reducers;
mod server;
mod state;
pub mod transport;

pub use config::ServerConfig;
pub use jobs::ChunkBatchJob;
pub use reducers::DamageOutcome;
pub use server::WorldServer;
pub use state::{ClientWindows, WindowChange, WorldCore, WorldState, chunk_distance};
pub use transport::{ChannelHub, ClientEndpoint, InboundFrame, MemoryOutbox, Outbox};
