//! Chunk tile storage - 16x16 tiles with ground, ore, durability and biome layers

use glam::IVec2;
use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;

use crate::error::WorldError;
use crate::tiles::{CHUNK_AREA, CHUNK_SIZE, TileId, local_index};

/// Durability value meaning "untouched, full health" for any tile type
pub const FULL_DURABILITY: i16 = -1;

/// A 16x16 chunk of the world
///
/// All four layers share the row-major layout `index = y * CHUNK_SIZE + x`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkData {
    /// Chunk position in chunk coordinates
    pub coord: IVec2,

    /// Ground tile ids (0 = air)
    #[serde(with = "BigArray")]
    ground: [u16; CHUNK_AREA],

    /// Ore overlay ids (`TileId::INVALID` = no ore)
    #[serde(with = "BigArray")]
    ore: [u16; CHUNK_AREA],

    /// Remaining hit points (`FULL_DURABILITY` = untouched)
    #[serde(with = "BigArray")]
    durability: [i16; CHUNK_AREA],

    /// Per-tile biome tag (see `BiomeType`)
    #[serde(with = "BigArray")]
    biome: [u8; CHUNK_AREA],

    /// Dirty flag - chunk differs from its generated state and must be saved
    #[serde(skip)]
    pub is_modified: bool,

    /// Set once the generator has filled the chunk
    pub has_been_generated: bool,
}

impl ChunkData {
    /// Create an all-air chunk with no ore and full durability
    pub fn new(coord: IVec2) -> Self {
        Self {
            coord,
            ground: [TileId::AIR; CHUNK_AREA],
            ore: [TileId::INVALID; CHUNK_AREA],
            durability: [FULL_DURABILITY; CHUNK_AREA],
            biome: [0; CHUNK_AREA],
            is_modified: false,
            has_been_generated: false,
        }
    }

    /// Assemble a freshly generated chunk from its layers
    pub fn generated(
        coord: IVec2,
        ground: [u16; CHUNK_AREA],
        ore: [u16; CHUNK_AREA],
        biome: [u8; CHUNK_AREA],
    ) -> Self {
        Self {
            coord,
            ground,
            ore,
            durability: [FULL_DURABILITY; CHUNK_AREA],
            biome,
            is_modified: false,
            has_been_generated: true,
        }
    }

    /// World position of the chunk's bottom-left tile
    pub fn world_origin(&self) -> IVec2 {
        self.coord * CHUNK_SIZE as i32
    }

    fn index(&self, x: i32, y: i32) -> Result<usize, WorldError> {
        let out_of_range = || WorldError::LocalOutOfRange {
            coord: self.coord,
            x,
            y,
        };
        if x < 0 || y < 0 {
            return Err(out_of_range());
        }
        local_index(x as usize, y as usize).ok_or_else(out_of_range)
    }

    /// Ground tile at local position
    pub fn ground(&self, x: i32, y: i32) -> Result<u16, WorldError> {
        Ok(self.ground[self.index(x, y)?])
    }

    /// Set the ground tile at local position (marks the chunk dirty)
    pub fn set_ground(&mut self, x: i32, y: i32, tile_id: u16) -> Result<(), WorldError> {
        let index = self.index(x, y)?;
        self.ground[index] = tile_id;
        self.is_modified = true;
        Ok(())
    }

    /// Ore overlay at local position (`TileId::INVALID` = none)
    pub fn ore(&self, x: i32, y: i32) -> Result<u16, WorldError> {
        Ok(self.ore[self.index(x, y)?])
    }

    pub fn set_ore(&mut self, x: i32, y: i32, ore_id: u16) -> Result<(), WorldError> {
        let index = self.index(x, y)?;
        self.ore[index] = ore_id;
        self.is_modified = true;
        Ok(())
    }

    /// Durability at local position (`FULL_DURABILITY` = untouched)
    pub fn durability(&self, x: i32, y: i32) -> Result<i16, WorldError> {
        Ok(self.durability[self.index(x, y)?])
    }

    pub fn set_durability(&mut self, x: i32, y: i32, value: i16) -> Result<(), WorldError> {
        let index = self.index(x, y)?;
        self.durability[index] = value;
        self.is_modified = true;
        Ok(())
    }

    /// Biome tag at local position
    pub fn biome_tag(&self, x: i32, y: i32) -> Result<u8, WorldError> {
        Ok(self.biome[self.index(x, y)?])
    }

    pub fn ground_ids(&self) -> &[u16] {
        &self.ground
    }

    pub fn ore_ids(&self) -> &[u16] {
        &self.ore
    }

    pub fn durabilities(&self) -> &[i16] {
        &self.durability
    }

    pub fn biome_tags(&self) -> &[u8] {
        &self.biome
    }

    /// Replace the ground and durability layers wholesale
    ///
    /// Ore under tiles that end up as air is cleared. Used when restoring saved chunks.
    pub fn overwrite_ground(&mut self, ground: &[u16], durability: &[i16]) -> Result<(), WorldError> {
        for len in [ground.len(), durability.len()] {
            if len != CHUNK_AREA {
                return Err(WorldError::GridSizeMismatch {
                    expected: CHUNK_AREA,
                    actual: len,
                });
            }
        }

        self.ground.copy_from_slice(ground);
        self.durability.copy_from_slice(durability);
        for (ore, &tile) in self.ore.iter_mut().zip(self.ground.iter()) {
            if tile == TileId::AIR {
                *ore = TileId::INVALID;
            }
        }
        self.is_modified = true;
        Ok(())
    }

    /// Replace the ore overlay wholesale
    pub fn overwrite_ore(&mut self, ore: &[u16]) -> Result<(), WorldError> {
        if ore.len() != CHUNK_AREA {
            return Err(WorldError::GridSizeMismatch {
                expected: CHUNK_AREA,
                actual: ore.len(),
            });
        }
        self.ore.copy_from_slice(ore);
        self.is_modified = true;
        Ok(())
    }

    /// Number of non-air ground tiles
    pub fn solid_count(&self) -> usize {
        self.ground.iter().filter(|&&id| id != TileId::AIR).count()
    }

    /// Clear the dirty flag after a successful save
    pub fn mark_clean(&mut self) {
        self.is_modified = false;
    }
}

impl std::fmt::Debug for ChunkData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkData")
            .field("coord", &self.coord)
            .field("solid_tiles", &self.solid_count())
            .field("is_modified", &self.is_modified)
            .field("has_been_generated", &self.has_been_generated)
            .finish()
    }
}

/// Convert world tile coordinates to (chunk coordinate, local x, local y)
///
/// Uses floored division so negative coordinates map into the chunk below/left of the origin.
pub fn world_to_chunk_coords(world_x: i32, world_y: i32) -> (IVec2, usize, usize) {
    let size = CHUNK_SIZE as i32;
    let coord = IVec2::new(world_x.div_euclid(size), world_y.div_euclid(size));
    let local_x = world_x.rem_euclid(size) as usize;
    let local_y = world_y.rem_euclid(size) as usize;
    (coord, local_x, local_y)
}

/// Chunk containing a world-space position (tile units)
pub fn chunk_of_position(position: glam::Vec2) -> IVec2 {
    let (coord, _, _) = world_to_chunk_coords(position.x.floor() as i32, position.y.floor() as i32);
    coord
}
