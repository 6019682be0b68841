//! World data, storage and procedural generation

pub mod biome;
pub mod chunk;
pub mod chunk_store;
pub mod generation;
pub mod noise_field;
pub mod persistence;
pub mod worldgen_config;

pub use biome::{BiomeChunkInfo, BiomeOverrideRule, BiomeResolver, BiomeType};
pub use chunk::{ChunkData, FULL_DURABILITY, chunk_of_position, world_to_chunk_coords};
pub use chunk_store::{ChunkSource, ChunkStore, Resolved};
pub use generation::{GeneratedChunk, SpawnCandidate, WorldGenerator};
pub use noise_field::NoiseField;
pub use persistence::{PersistenceError, RestoredChunk, SavedChunk, WorldSave};
pub use worldgen_config::{AttachmentKind, EntityTypeId, WorldGenConfig};
