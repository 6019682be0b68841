//! Tile definitions and registry

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Built-in tile IDs
pub struct TileId;

impl TileId {
    /// Empty space; also the ground-grid sentinel for "nothing here"
    pub const AIR: u16 = 0;

    // Ground tiles
    pub const DIRT: u16 = 1;
    pub const STONE: u16 = 2;
    pub const TRENCH_ROCK: u16 = 3;
    pub const BASALT: u16 = 4;
    pub const ICE: u16 = 5;
    pub const FUNGAL_SOIL: u16 = 6;
    pub const CRYSTAL_ROCK: u16 = 7;
    pub const WATER: u16 = 8;
    pub const BEDROCK: u16 = 9;

    // Ore overlays (stored in the ore grid, never in the ground grid)
    pub const COAL_ORE: u16 = 20;
    pub const IRON_ORE: u16 = 21;
    pub const GOLD_ORE: u16 = 22;
    pub const CRYSTAL_ORE: u16 = 23;

    /// Ore-grid sentinel for "no ore"
    pub const INVALID: u16 = u16::MAX;
}

bitflags! {
    /// Physical properties of a tile
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct TileFlags: u8 {
        /// Blocks movement and counts as terrain for anchoring
        const SOLID = 1 << 0;
        /// Occupies a cell but is never carved or anchored to (water)
        const PASSABLE = 1 << 1;
        /// Lives in the ore overlay grid
        const ORE = 1 << 2;
    }
}

/// Definition of a tile's properties
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TileDef {
    pub id: u16,
    pub name: String,
    pub flags: TileFlags,
    /// Hit points of an untouched tile (None = unbreakable)
    pub max_durability: Option<i16>,
    /// Base color (RGBA), used by debug dumps
    pub color: [u8; 4],
}

impl Default for TileDef {
    fn default() -> Self {
        Self {
            id: TileId::AIR,
            name: "unknown".to_string(),
            flags: TileFlags::empty(),
            max_durability: None,
            color: [255, 0, 255, 255], // Magenta for missing tiles
        }
    }
}

/// Registry of all tiles
pub struct TileRegistry {
    tiles: Vec<Option<TileDef>>,
}

impl TileRegistry {
    pub fn new() -> Self {
        let mut registry = Self { tiles: Vec::new() };
        registry.register_defaults();
        registry
    }

    fn register_defaults(&mut self) {
        self.register(TileDef {
            id: TileId::AIR,
            name: "air".to_string(),
            color: [0, 0, 0, 0],
            ..Default::default()
        });

        self.register(solid(TileId::DIRT, "dirt", 40, [134, 96, 67, 255]));
        self.register(solid(TileId::STONE, "stone", 100, [128, 128, 128, 255]));
        self.register(solid(TileId::TRENCH_ROCK, "trench_rock", 160, [52, 48, 70, 255]));
        self.register(solid(TileId::BASALT, "basalt", 140, [60, 60, 64, 255]));
        self.register(solid(TileId::ICE, "ice", 60, [170, 210, 240, 255]));
        self.register(solid(TileId::FUNGAL_SOIL, "fungal_soil", 50, [96, 70, 110, 255]));
        self.register(solid(TileId::CRYSTAL_ROCK, "crystal_rock", 180, [120, 200, 210, 255]));

        self.register(TileDef {
            id: TileId::WATER,
            name: "water".to_string(),
            flags: TileFlags::SOLID | TileFlags::PASSABLE,
            max_durability: None,
            color: [64, 164, 223, 200],
        });

        self.register(TileDef {
            id: TileId::BEDROCK,
            name: "bedrock".to_string(),
            flags: TileFlags::SOLID,
            max_durability: None,
            color: [30, 30, 30, 255],
        });

        self.register(ore(TileId::COAL_ORE, "coal_ore", 120, [40, 40, 40, 255]));
        self.register(ore(TileId::IRON_ORE, "iron_ore", 150, [180, 120, 90, 255]));
        self.register(ore(TileId::GOLD_ORE, "gold_ore", 170, [230, 190, 60, 255]));
        self.register(ore(TileId::CRYSTAL_ORE, "crystal_ore", 220, [160, 240, 255, 255]));
    }

    fn register(&mut self, tile: TileDef) {
        let id = tile.id as usize;

        if self.tiles.len() <= id {
            self.tiles.resize(id + 1, None);
        }

        if let Some(previous) = self.tiles[id].replace(tile) {
            log::warn!("Tile id {} ({}) registered twice, replacing", id, previous.name);
        }
    }

    /// Get tile definition by ID (falls back to air for unknown IDs)
    pub fn get(&self, id: u16) -> &TileDef {
        self.try_get(id)
            .or_else(|| self.try_get(TileId::AIR))
            .unwrap_or_else(|| unreachable!("air is always registered"))
    }

    /// Get tile definition by ID if it exists
    pub fn try_get(&self, id: u16) -> Option<&TileDef> {
        self.tiles.get(id as usize).and_then(Option::as_ref)
    }

    /// Whether `id` names a registered tile
    pub fn is_known(&self, id: u16) -> bool {
        self.try_get(id).is_some()
    }

    /// Known tile that may live in the ground grid (anything but ore overlays)
    pub fn is_ground(&self, id: u16) -> bool {
        self.try_get(id)
            .is_some_and(|tile| !tile.flags.contains(TileFlags::ORE))
    }

    /// Known ore overlay id
    pub fn is_ore(&self, id: u16) -> bool {
        self.try_get(id)
            .is_some_and(|tile| tile.flags.contains(TileFlags::ORE))
    }

    /// Solid terrain that caves may carve and entities may anchor to
    pub fn is_carvable(&self, id: u16) -> bool {
        let flags = self.get(id).flags;
        flags.contains(TileFlags::SOLID) && !flags.contains(TileFlags::PASSABLE)
    }

    /// Whether the tile blocks clearance (any SOLID tile, passable or not)
    pub fn is_solid(&self, id: u16) -> bool {
        self.get(id).flags.contains(TileFlags::SOLID)
    }

    /// Max durability of an untouched tile (None = unbreakable or air)
    pub fn max_durability(&self, id: u16) -> Option<i16> {
        self.get(id).max_durability
    }
}

impl Default for TileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn solid(id: u16, name: &str, durability: i16, color: [u8; 4]) -> TileDef {
    TileDef {
        id,
        name: name.to_string(),
        flags: TileFlags::SOLID,
        max_durability: Some(durability),
        color,
    }
}

fn ore(id: u16, name: &str, durability: i16, color: [u8; 4]) -> TileDef {
    TileDef {
        id,
        name: name.to_string(),
        flags: TileFlags::SOLID | TileFlags::ORE,
        max_durability: Some(durability),
        color,
    }
}
