//! World generation configuration - serializable parameters for world generation
//!
//! Everything the generator needs besides the seed lives here, so a world can be
//! described by a RON preset. The seed is NOT part of the config - same config +
//! different seed = different world.

use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};

use super::biome::BiomeType;
use crate::tiles::TileId;

/// Complete world generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldGenConfig {
    /// Display name for this configuration
    pub name: String,

    /// Surface line, topsoil and bedrock floor
    pub world: WorldParams,

    /// Vertical trench corridor around x = 0
    pub trench: TrenchParams,

    /// Biome regions (scanned by descending priority, first match wins)
    pub regions: Vec<BiomeRegionConfig>,

    /// Domain-warped cave carving
    pub caves: CaveParams,

    /// Ore placement, applied in order (later ores overwrite earlier ones)
    pub ores: Vec<OreConfig>,

    /// Entity spawn definitions, tried in order per anchor cell
    pub spawns: Vec<SpawnConfig>,
}

/// Surface and floor parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldParams {
    /// Baseline height of the surface line (default: 0)
    pub surface_y: i32,
    /// Surface noise amplitude in tiles (default: 12.0)
    pub surface_amplitude: f32,
    /// Noise layer perturbing the surface line along x
    pub surface_noise: NoiseLayerConfig,
    /// Thickness of the topsoil band below the surface line (default: 4)
    pub topsoil_depth: i32,
    /// Topsoil tile
    pub topsoil_tile: u16,
    /// Everything at or below this height is bedrock (default: -720)
    pub bedrock_y: i32,
}

/// Trench corridor parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrenchParams {
    pub enabled: bool,
    /// Corridor only exists below this height (default: -8)
    pub top_y: i32,
    /// Base half width in tiles (default: 5.0)
    pub half_width: f32,
    /// Width noise amplitude in tiles (default: 3.0)
    pub widen_amplitude: f32,
    /// Noise layer widening the corridor along y
    pub width_noise: NoiseLayerConfig,
    /// Tile filling the corridor
    pub tile: u16,
}

/// Rectangular biome region with noise-perturbed boundaries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiomeRegionConfig {
    pub name: String,
    /// Biome tag written for cells inside the region
    pub biome: BiomeType,
    /// Scan priority (higher = checked first)
    pub priority: i32,
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
    /// How far (in tiles) the boundaries may wander
    pub boundary_amplitude: f32,
    /// Perturbs the left/right edges, sampled along y
    pub horizontal_noise: NoiseLayerConfig,
    /// Perturbs the top/bottom edges, sampled along x
    pub vertical_noise: NoiseLayerConfig,
    /// Ground tile for cells inside the region
    pub fill_tile: u16,
    /// Per-region cave parameters (None = global cave settings)
    #[serde(default)]
    pub cave_override: Option<CaveOverride>,
}

/// Cave carving parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaveParams {
    pub enabled: bool,
    /// Density below this carves (lower = fewer caves, default: -0.35)
    pub threshold: f32,
    /// Density sampling frequency (default: 0.045)
    pub frequency: f32,
    /// Domain warp displacement in tiles (default: 14.0)
    pub warp_amplitude: f32,
    /// Domain warp sampling frequency (default: 0.012)
    pub warp_frequency: f32,
    /// Density layer (frequency 1.0, scaled by `frequency`)
    pub density_noise: NoiseLayerConfig,
    /// Warp layer for the x displacement
    pub warp_x_noise: NoiseLayerConfig,
    /// Warp layer for the y displacement
    pub warp_y_noise: NoiseLayerConfig,
}

/// Region-local replacement for the global cave parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaveOverride {
    /// No caves at all inside the region
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub threshold: Option<f32>,
    #[serde(default)]
    pub frequency: Option<f32>,
    #[serde(default)]
    pub warp_amplitude: Option<f32>,
}

/// Individual ore generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OreConfig {
    /// Tile ID written to the ore layer
    pub tile_id: u16,
    pub name: String,
    /// Noise layer for ore placement (frequency 1.0, scaled by `noise_scale`)
    pub noise: NoiseLayerConfig,
    pub noise_scale: f32,
    /// Sample must exceed this (higher = rarer)
    pub threshold: f32,
    /// Lowest world y where this ore appears
    pub min_y: i32,
    /// Highest world y where this ore appears
    pub max_y: i32,
    /// Restrict to these biomes (empty = anywhere)
    #[serde(default)]
    pub biomes: Vec<BiomeType>,
    /// Optional low-frequency gate that groups veins into clusters
    #[serde(default)]
    pub cluster: Option<ClusterConfig>,
}

/// Cluster gate for an ore
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub noise: NoiseLayerConfig,
    pub noise_scale: f32,
    pub threshold: f32,
}

/// How an entity attaches to the terrain around its anchor cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttachmentKind {
    /// Stands on top of the anchor; needs open cells above
    Ground,
    /// Hangs below the anchor; needs open cells below
    Ceiling,
    /// Sticks to the anchor's left face; needs open cells to the left
    WallLeft,
    /// Sticks to the anchor's right face; needs open cells to the right
    WallRight,
}

impl AttachmentKind {
    /// Rotation recorded for an entity attached this way (degrees)
    pub fn rotation_degrees(self) -> f32 {
        match self {
            AttachmentKind::Ground => 0.0,
            AttachmentKind::Ceiling => 180.0,
            AttachmentKind::WallLeft => 90.0,
            AttachmentKind::WallRight => 270.0,
        }
    }

    /// Direction from the anchor cell towards the open side
    pub fn normal(self) -> glam::IVec2 {
        match self {
            AttachmentKind::Ground => glam::IVec2::Y,
            AttachmentKind::Ceiling => glam::IVec2::NEG_Y,
            AttachmentKind::WallLeft => glam::IVec2::NEG_X,
            AttachmentKind::WallRight => glam::IVec2::X,
        }
    }
}

/// Entity spawn definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnConfig {
    pub name: String,
    /// Entity type id stored in the persistent record
    pub entity_type: u16,
    /// Placement noise (frequency 1.0, scaled by `noise_scale`)
    pub noise: NoiseLayerConfig,
    pub noise_scale: f32,
    /// Sample must exceed this (higher = rarer)
    pub threshold: f32,
    pub min_y: i32,
    pub max_y: i32,
    /// Attachment kinds to try, in order
    pub attachments: SmallVec<[AttachmentKind; 4]>,
    /// Open cells required on the attachment side
    pub clearance: u8,
}

/// Reusable noise layer configuration
///
/// Abstracts FastNoiseLite settings for serialization. The offset is added to sample
/// coordinates so layers sharing a seed offset stay decorrelated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseLayerConfig {
    /// Offset added to world seed for this layer
    pub seed_offset: i32,
    /// Noise algorithm type
    pub noise_type: NoiseTypeConfig,
    /// Base frequency (lower = larger features)
    pub frequency: f32,
    /// Fractal combination type
    pub fractal_type: FractalTypeConfig,
    /// Number of fractal octaves (1-8)
    pub octaves: u8,
    /// Frequency multiplier per octave (default: 2.0)
    pub lacunarity: f32,
    /// Amplitude multiplier per octave / persistence (default: 0.5)
    pub gain: f32,
    #[serde(default)]
    pub offset_x: f32,
    #[serde(default)]
    pub offset_y: f32,
}

/// Noise algorithm types (maps to FastNoiseLite::NoiseType)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoiseTypeConfig {
    OpenSimplex2,
    OpenSimplex2S,
    Cellular,
    Perlin,
    ValueCubic,
    Value,
}

/// Fractal combination types (maps to FastNoiseLite::FractalType)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FractalTypeConfig {
    None,
    FBm,
    Ridged,
    PingPong,
}

// ============================================================================
// Default implementations
// ============================================================================

impl Default for WorldGenConfig {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            world: WorldParams::default(),
            trench: TrenchParams::default(),
            regions: default_regions(),
            caves: CaveParams::default(),
            ores: default_ore_configs(),
            spawns: default_spawn_configs(),
        }
    }
}

impl Default for WorldParams {
    fn default() -> Self {
        Self {
            surface_y: 0,
            surface_amplitude: 12.0,
            surface_noise: NoiseLayerConfig {
                seed_offset: 1,
                frequency: 0.01,
                octaves: 4,
                ..NoiseLayerConfig::default()
            },
            topsoil_depth: 4,
            topsoil_tile: TileId::DIRT,
            bedrock_y: -720,
        }
    }
}

impl Default for TrenchParams {
    fn default() -> Self {
        Self {
            enabled: true,
            top_y: -8,
            half_width: 5.0,
            widen_amplitude: 3.0,
            width_noise: NoiseLayerConfig {
                seed_offset: 2,
                frequency: 0.03,
                octaves: 2,
                ..NoiseLayerConfig::default()
            },
            tile: TileId::TRENCH_ROCK,
        }
    }
}

impl Default for CaveParams {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: -0.35,
            frequency: 0.045,
            warp_amplitude: 14.0,
            warp_frequency: 0.012,
            density_noise: NoiseLayerConfig {
                seed_offset: 3,
                frequency: 1.0, // Scaled by `frequency`
                octaves: 3,
                ..NoiseLayerConfig::default()
            },
            warp_x_noise: NoiseLayerConfig {
                seed_offset: 4,
                frequency: 1.0, // Scaled by `warp_frequency`
                fractal_type: FractalTypeConfig::None,
                octaves: 1,
                ..NoiseLayerConfig::default()
            },
            warp_y_noise: NoiseLayerConfig {
                seed_offset: 4,
                frequency: 1.0,
                fractal_type: FractalTypeConfig::None,
                octaves: 1,
                // Same seed as the x warp, decorrelated by offset
                offset_x: 1000.0,
                offset_y: 1000.0,
                ..NoiseLayerConfig::default()
            },
        }
    }
}

impl Default for NoiseLayerConfig {
    fn default() -> Self {
        Self {
            seed_offset: 0,
            noise_type: NoiseTypeConfig::OpenSimplex2,
            frequency: 0.01,
            fractal_type: FractalTypeConfig::FBm,
            octaves: 3,
            lacunarity: 2.0,
            gain: 0.5,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

/// Single-octave layer sampled at frequency 1.0 (callers scale coordinates themselves)
fn scaled_layer(seed_offset: i32) -> NoiseLayerConfig {
    NoiseLayerConfig {
        seed_offset,
        frequency: 1.0,
        fractal_type: FractalTypeConfig::None,
        octaves: 1,
        ..NoiseLayerConfig::default()
    }
}

fn boundary_layer(seed_offset: i32) -> NoiseLayerConfig {
    NoiseLayerConfig {
        seed_offset,
        frequency: 0.02,
        octaves: 2,
        ..NoiseLayerConfig::default()
    }
}

fn region(
    name: &str,
    biome: BiomeType,
    priority: i32,
    (min_x, max_x): (i32, i32),
    (min_y, max_y): (i32, i32),
    fill_tile: u16,
    seed_offset: i32,
) -> BiomeRegionConfig {
    BiomeRegionConfig {
        name: name.to_string(),
        biome,
        priority,
        min_x,
        max_x,
        min_y,
        max_y,
        boundary_amplitude: 8.0,
        horizontal_noise: boundary_layer(seed_offset),
        vertical_noise: boundary_layer(seed_offset + 1),
        fill_tile,
        cave_override: None,
    }
}

fn default_regions() -> Vec<BiomeRegionConfig> {
    vec![
        BiomeRegionConfig {
            boundary_amplitude: 4.0,
            cave_override: Some(CaveOverride {
                disabled: true,
                ..CaveOverride::default()
            }),
            ..region("Sunken Lake", BiomeType::Lake, 60, (120, 220), (-45, -22), TileId::WATER, 40)
        },
        region("Frozen Caves", BiomeType::Frozen, 50, (40, 400), (-140, -40), TileId::ICE, 42),
        BiomeRegionConfig {
            cave_override: Some(CaveOverride {
                threshold: Some(-0.2),
                frequency: Some(0.06),
                ..CaveOverride::default()
            }),
            ..region("Fungal Hollows", BiomeType::Fungal, 40, (-400, -40), (-160, -30), TileId::FUNGAL_SOIL, 44)
        },
        region("Crystal Depths", BiomeType::Crystal, 30, (-600, 600), (-400, -160), TileId::CRYSTAL_ROCK, 46),
        BiomeRegionConfig {
            cave_override: Some(CaveOverride {
                threshold: Some(-0.5),
                warp_amplitude: Some(24.0),
                ..CaveOverride::default()
            }),
            ..region("Magma Core", BiomeType::Magma, 20, (-2000, 2000), (-700, -400), TileId::BASALT, 48)
        },
        BiomeRegionConfig {
            cave_override: Some(CaveOverride {
                threshold: Some(-0.1),
                ..CaveOverride::default()
            }),
            ..region("Cave Belt", BiomeType::Cave, 10, (-2000, 2000), (-120, -12), TileId::STONE, 50)
        },
    ]
}

fn default_ore_configs() -> Vec<OreConfig> {
    vec![
        OreConfig {
            tile_id: TileId::COAL_ORE,
            name: "Coal".to_string(),
            noise: scaled_layer(20),
            noise_scale: 0.12,
            threshold: 0.55,
            min_y: -300,
            max_y: -6,
            biomes: Vec::new(),
            cluster: None,
        },
        OreConfig {
            tile_id: TileId::IRON_ORE,
            name: "Iron".to_string(),
            noise: scaled_layer(21),
            noise_scale: 0.1,
            threshold: 0.6,
            min_y: -500,
            max_y: -40,
            biomes: Vec::new(),
            cluster: Some(ClusterConfig {
                noise: scaled_layer(31),
                noise_scale: 0.02,
                threshold: 0.1,
            }),
        },
        OreConfig {
            tile_id: TileId::GOLD_ORE,
            name: "Gold".to_string(),
            noise: scaled_layer(22),
            noise_scale: 0.15,
            threshold: 0.7,
            min_y: -720,
            max_y: -200,
            biomes: vec![BiomeType::Crystal, BiomeType::Magma, BiomeType::Rock],
            cluster: Some(ClusterConfig {
                noise: scaled_layer(32),
                noise_scale: 0.015,
                threshold: 0.2,
            }),
        },
        OreConfig {
            tile_id: TileId::CRYSTAL_ORE,
            name: "Crystal".to_string(),
            noise: scaled_layer(23),
            noise_scale: 0.2,
            threshold: 0.72,
            min_y: -400,
            max_y: -160,
            biomes: vec![BiomeType::Crystal],
            cluster: None,
        },
    ]
}

/// Built-in entity type ids used by the default spawn table
pub struct EntityTypeId;

impl EntityTypeId {
    pub const GLOWCAP: u16 = 1;
    pub const ROOST_BAT: u16 = 2;
    pub const WALL_CRYSTAL: u16 = 3;
}

fn default_spawn_configs() -> Vec<SpawnConfig> {
    vec![
        SpawnConfig {
            name: "Glowcap".to_string(),
            entity_type: EntityTypeId::GLOWCAP,
            noise: scaled_layer(60),
            noise_scale: 0.35,
            threshold: 0.55,
            min_y: -400,
            max_y: -10,
            attachments: smallvec![AttachmentKind::Ground],
            clearance: 2,
        },
        SpawnConfig {
            name: "Roost Bat".to_string(),
            entity_type: EntityTypeId::ROOST_BAT,
            noise: scaled_layer(61),
            noise_scale: 0.3,
            threshold: 0.65,
            min_y: -600,
            max_y: -20,
            attachments: smallvec![AttachmentKind::Ceiling],
            clearance: 3,
        },
        SpawnConfig {
            name: "Wall Crystal".to_string(),
            entity_type: EntityTypeId::WALL_CRYSTAL,
            noise: scaled_layer(62),
            noise_scale: 0.4,
            threshold: 0.6,
            min_y: -720,
            max_y: -60,
            attachments: smallvec![AttachmentKind::WallLeft, AttachmentKind::WallRight],
            clearance: 1,
        },
    ]
}

// ============================================================================
// Conversion helpers
// ============================================================================

impl NoiseTypeConfig {
    /// Convert to fastnoise_lite::NoiseType
    pub fn to_fastnoise(&self) -> fastnoise_lite::NoiseType {
        match self {
            NoiseTypeConfig::OpenSimplex2 => fastnoise_lite::NoiseType::OpenSimplex2,
            NoiseTypeConfig::OpenSimplex2S => fastnoise_lite::NoiseType::OpenSimplex2S,
            NoiseTypeConfig::Cellular => fastnoise_lite::NoiseType::Cellular,
            NoiseTypeConfig::Perlin => fastnoise_lite::NoiseType::Perlin,
            NoiseTypeConfig::ValueCubic => fastnoise_lite::NoiseType::ValueCubic,
            NoiseTypeConfig::Value => fastnoise_lite::NoiseType::Value,
        }
    }
}

impl FractalTypeConfig {
    /// Convert to fastnoise_lite::FractalType
    pub fn to_fastnoise(&self) -> fastnoise_lite::FractalType {
        match self {
            FractalTypeConfig::None => fastnoise_lite::FractalType::None,
            FractalTypeConfig::FBm => fastnoise_lite::FractalType::FBm,
            FractalTypeConfig::Ridged => fastnoise_lite::FractalType::Ridged,
            FractalTypeConfig::PingPong => fastnoise_lite::FractalType::PingPong,
        }
    }
}

impl NoiseLayerConfig {
    /// Create a FastNoiseLite instance from this config
    pub fn to_fastnoise(&self, base_seed: u64) -> fastnoise_lite::FastNoiseLite {
        let seed = (base_seed as i32).wrapping_add(self.seed_offset);
        let mut noise = fastnoise_lite::FastNoiseLite::with_seed(seed);
        noise.set_noise_type(Some(self.noise_type.to_fastnoise()));
        noise.set_frequency(Some(self.frequency));
        noise.set_fractal_type(Some(self.fractal_type.to_fastnoise()));
        noise.set_fractal_octaves(Some(self.octaves as i32));
        noise.set_fractal_lacunarity(Some(self.lacunarity));
        noise.set_fractal_gain(Some(self.gain));
        noise
    }
}

impl BiomeRegionConfig {
    /// Whether caves are switched off inside this region
    pub fn caves_disabled(&self) -> bool {
        self.cave_override.as_ref().is_some_and(|o| o.disabled)
    }
}

// ============================================================================
// Preset helpers
// ============================================================================

impl WorldGenConfig {
    /// Create a preset with more caves
    pub fn preset_cave_heavy() -> Self {
        Self {
            name: "Cave Heavy".to_string(),
            caves: CaveParams {
                threshold: -0.1, // Higher = more caves
                warp_amplitude: 20.0,
                ..CaveParams::default()
            },
            ..Self::default()
        }
    }

    /// Solid layers only: no caves, no trench, no entities (useful for tests)
    pub fn preset_solid() -> Self {
        Self {
            name: "Solid".to_string(),
            trench: TrenchParams {
                enabled: false,
                ..TrenchParams::default()
            },
            caves: CaveParams {
                enabled: false,
                ..CaveParams::default()
            },
            spawns: Vec::new(),
            ..Self::default()
        }
    }

    /// Load a preset from RON text
    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }
}
