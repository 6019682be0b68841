//! Application configuration with layered loading
//!
//! Configuration is loaded from multiple sources (lowest to highest priority):
//! 1. Compiled defaults
//! 2. `strata.ron` file (if exists)
//! 3. Environment variables prefixed with `STRATA_`
//!
//! Example environment variable: `STRATA_CLIENT__VIEW_RADIUS=3`

use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use strata_server::ServerConfig;

/// Top-level configuration of the `strata` binary
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StrataConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

/// Streaming client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Chunks kept around the viewer (radius of 2 = 5x5 grid = 25 chunks)
    pub view_radius: i32,
    /// Payload application work units per client tick
    pub payloads_per_tick: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            view_radius: 2,
            payloads_per_tick: 4,
        }
    }
}

/// Headless session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Ticks to run before shutting down
    pub ticks: u32,
    /// Viewer start position in tiles
    pub start_x: f32,
    pub start_y: f32,
    /// Viewer movement per tick in tiles
    pub velocity_x: f32,
    pub velocity_y: f32,
    /// Damage dealt to the tile under the viewer every `dig_interval` ticks (0 = never)
    pub dig_interval: u32,
    pub dig_damage: i16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ticks: 240,
            start_x: 0.0,
            start_y: 0.0,
            velocity_x: 2.0,
            velocity_y: -0.5,
            dig_interval: 10,
            dig_damage: 25,
        }
    }
}

impl SessionConfig {
    pub fn start(&self) -> Vec2 {
        Vec2::new(self.start_x, self.start_y)
    }

    pub fn velocity(&self) -> Vec2 {
        Vec2::new(self.velocity_x, self.velocity_y)
    }
}

impl StrataConfig {
    /// Load configuration with layered priority:
    /// 1. Compiled defaults (lowest priority)
    /// 2. `strata.ron` file (if exists)
    /// 3. Environment variables prefixed with `STRATA_` (highest priority)
    pub fn load() -> Result<Self> {
        let builder = Self::defaults()?
            // Layer 2: Config file (optional, won't error if missing)
            .add_source(
                File::with_name("strata")
                    .format(config::FileFormat::Ron)
                    .required(false),
            );
        Self::finish(builder)
    }

    /// Like [`StrataConfig::load`], but the file layer is `path` and must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let builder = Self::defaults()?.add_source(
            File::from(path)
                .format(config::FileFormat::Ron)
                .required(true),
        );
        Self::finish(builder)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))
    }

    // Layer 1: Compiled defaults
    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        let client = ClientConfig::default();
        let session = SessionConfig::default();
        let server = ServerConfig::default();

        Ok(Config::builder()
            .set_default("server.seed", server.seed)?
            .set_default("server.activation_radius", server.activation_radius as i64)?
            .set_default("server.chunks_per_tick", server.chunks_per_tick as i64)?
            .set_default("server.parallel_generation", server.parallel_generation)?
            .set_default("client.view_radius", client.view_radius as i64)?
            .set_default("client.payloads_per_tick", client.payloads_per_tick as i64)?
            .set_default("session.ticks", session.ticks as i64)?
            .set_default("session.start_x", session.start_x as f64)?
            .set_default("session.start_y", session.start_y as f64)?
            .set_default("session.velocity_x", session.velocity_x as f64)?
            .set_default("session.velocity_y", session.velocity_y as f64)?
            .set_default("session.dig_interval", session.dig_interval as i64)?
            .set_default("session.dig_damage", session.dig_damage as i64)?)
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        // Layer 3: Environment variables (STRATA_SERVER__SEED, etc.)
        let config = builder
            .add_source(Environment::with_prefix("STRATA").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
