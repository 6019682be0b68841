//! Authoritative world layer for Strata
//!
//! - `world`: chunk data, chunk store, procedural generation, biomes, persistence
//! - `entity`: persistent entity records and ref-counted activation
//! - `protocol`: chunk payloads and the client/server message codec
//! - `schedule`: cooperative job queue drained at a bounded rate per tick

pub mod entity;
pub mod error;
pub mod protocol;
pub mod schedule;
pub mod world;

// Re-export the tile catalogue so downstream crates need a single dependency
pub mod tiles {
    pub use strata_tiles::*;
}

pub use error::WorldError;
