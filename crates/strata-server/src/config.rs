//! Server settings

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strata_core::world::WorldGenConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// World generation seed (ignored when a save is loaded)
    pub seed: u64,
    /// Chebyshev radius, in chunks, around a client's origin that keeps chunks active
    pub activation_radius: i32,
    /// Chunk generations allowed per server tick
    pub chunks_per_tick: u32,
    /// Generate each tick's share of a batch in parallel
    pub parallel_generation: bool,
    /// Wall-clock cap on job work per tick, in milliseconds
    pub tick_time_budget_ms: Option<u64>,
    /// Where the world is saved on shutdown
    pub save_path: Option<PathBuf>,
    pub worldgen: WorldGenConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            activation_radius: 3,
            chunks_per_tick: 8,
            parallel_generation: true,
            tick_time_budget_ms: None,
            save_path: None,
            worldgen: WorldGenConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }
}
