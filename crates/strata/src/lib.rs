//! Strata client and application layer
//!
//! - `streaming`: the client chunk streaming state machine and batch application
//! - `tile_grid`: the tile surface seam, a headless tile mirror and the durability cache
//! - `mirror`: client copies of server-broadcast entity state
//! - `spiral`: nearest-first ordering of the chunks around the viewer
//! - `config`: layered application configuration
//! - `session`: a server and a client wired together in one process

pub mod config;
pub mod mirror;
pub mod session;
pub mod spiral;
pub mod streaming;
pub mod tile_grid;

pub use config::{ClientConfig, SessionConfig, StrataConfig};
pub use session::{Session, SessionSummary};
pub use streaming::{ChunkStreamer, ClientWorld, StreamState, StreamStats};
pub use tile_grid::{DurabilityCache, TileGrid, TileSurface};
