//! Tile data for Strata
//!
//! This crate provides the foundational data types shared by the server and clients:
//! - Tile definitions (TileId, TileDef, TileRegistry)
//! - Tile property flags (TileFlags)
//! - Chunk layout constants and index helpers (CHUNK_SIZE, CHUNK_AREA)

mod layout;
mod tiles;

pub use layout::{CHUNK_AREA, CHUNK_SIZE, local_index, local_position};
pub use tiles::{TileDef, TileFlags, TileId, TileRegistry};
