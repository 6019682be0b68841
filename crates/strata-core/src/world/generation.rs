use ahash::{AHashMap, AHashSet};
use glam::{IVec2, Vec2};
use rayon::prelude::*;

use crate::error::WorldError;
use crate::tiles::{CHUNK_AREA, CHUNK_SIZE, TileId, TileRegistry, local_position};
use crate::world::biome::BiomeType;
use crate::world::chunk::{ChunkData, world_to_chunk_coords};
use crate::world::chunk_store::ChunkSource;
use crate::world::noise_field::NoiseField;
use crate::world::worldgen_config::{
    AttachmentKind, BiomeRegionConfig, ClusterConfig, OreConfig, SpawnConfig, WorldGenConfig,
};

/// An entity the generator wants placed, attached to a solid anchor cell
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnCandidate {
    pub entity_type: u16,
    /// World cell the entity is attached to
    pub cell: IVec2,
    pub attachment: AttachmentKind,
    /// Degrees (Ground 0, Ceiling 180, WallLeft 90, WallRight 270)
    pub rotation: f32,
}

impl SpawnCandidate {
    /// Center of the open cell the entity occupies
    pub fn position(&self) -> Vec2 {
        (self.cell + self.attachment.normal()).as_vec2() + Vec2::splat(0.5)
    }
}

/// A generated chunk together with the entities proposed for it
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedChunk {
    pub chunk: ChunkData,
    pub spawns: Vec<SpawnCandidate>,
}

/// Result of the base terrain pass for one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BaseCell {
    tile: u16,
    biome: BiomeType,
    /// Index into the priority-sorted region list
    region: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
struct CaveSettings {
    threshold: f32,
    frequency: f32,
    warp_amplitude: f32,
}

struct RegionSampler {
    config: BiomeRegionConfig,
    horizontal: NoiseField,
    vertical: NoiseField,
}

impl RegionSampler {
    // Each edge samples its own line of the boundary noise
    const FAR_EDGE_LINE: f32 = 97.0;

    fn contains(&self, world_x: i32, world_y: i32) -> bool {
        let c = &self.config;
        let amp = c.boundary_amplitude;
        let (x, y) = (world_x as f32, world_y as f32);

        let left = c.min_x as f32 + self.horizontal.sample(y, 0.0) * amp;
        let right = c.max_x as f32 + self.horizontal.sample(y, Self::FAR_EDGE_LINE) * amp;
        let bottom = c.min_y as f32 + self.vertical.sample(x, 0.0) * amp;
        let top = c.max_y as f32 + self.vertical.sample(x, Self::FAR_EDGE_LINE) * amp;

        x >= left && x <= right && y >= bottom && y <= top
    }
}

struct OreSampler {
    config: OreConfig,
    noise: NoiseField,
    cluster: Option<(ClusterConfig, NoiseField)>,
}

struct SpawnSampler {
    config: SpawnConfig,
    noise: NoiseField,
}

/// Deterministic procedural chunk generator
///
/// Output is a pure function of `(seed, config, coordinate)`. Passes run in a fixed
/// order per cell: base terrain and biome tag, cave carving, ore placement, then
/// entity anchoring over the finished chunk.
pub struct WorldGenerator {
    pub seed: u64,

    // Configuration (stored for update_config)
    config: WorldGenConfig,
    tiles: TileRegistry,

    surface_noise: NoiseField,
    trench_noise: NoiseField,

    // Sorted by descending priority (stable), first match wins
    regions: Vec<RegionSampler>,

    cave_density: NoiseField,
    warp_x: NoiseField,
    warp_y: NoiseField,

    ores: Vec<OreSampler>,
    spawns: Vec<SpawnSampler>,
}

impl WorldGenerator {
    /// Create a new WorldGenerator with default configuration
    pub fn new(seed: u64) -> Self {
        Self::from_config(seed, WorldGenConfig::default())
    }

    /// Create a WorldGenerator from a configuration
    pub fn from_config(seed: u64, config: WorldGenConfig) -> Self {
        let mut regions: Vec<RegionSampler> = config
            .regions
            .iter()
            .map(|region| RegionSampler {
                config: region.clone(),
                horizontal: NoiseField::new(&region.horizontal_noise, seed),
                vertical: NoiseField::new(&region.vertical_noise, seed),
            })
            .collect();
        regions.sort_by(|a, b| b.config.priority.cmp(&a.config.priority));

        let ores = config
            .ores
            .iter()
            .map(|ore| OreSampler {
                config: ore.clone(),
                noise: NoiseField::new(&ore.noise, seed),
                cluster: ore
                    .cluster
                    .as_ref()
                    .map(|cluster| (cluster.clone(), NoiseField::new(&cluster.noise, seed))),
            })
            .collect();

        let spawns = config
            .spawns
            .iter()
            .map(|spawn| SpawnSampler {
                config: spawn.clone(),
                noise: NoiseField::new(&spawn.noise, seed),
            })
            .collect();

        Self {
            seed,
            surface_noise: NoiseField::new(&config.world.surface_noise, seed),
            trench_noise: NoiseField::new(&config.trench.width_noise, seed),
            cave_density: NoiseField::new(&config.caves.density_noise, seed),
            warp_x: NoiseField::new(&config.caves.warp_x_noise, seed),
            warp_y: NoiseField::new(&config.caves.warp_y_noise, seed),
            regions,
            ores,
            spawns,
            tiles: TileRegistry::new(),
            config,
        }
    }

    /// Update the configuration and rebuild noise layers, keeping the seed
    pub fn update_config(&mut self, config: WorldGenConfig) {
        let seed = self.seed;
        *self = Self::from_config(seed, config);
    }

    pub fn config(&self) -> &WorldGenConfig {
        &self.config
    }

    pub fn tiles(&self) -> &TileRegistry {
        &self.tiles
    }

    /// Height of the surface line at a world column
    pub fn surface_height(&self, world_x: i32) -> i32 {
        let world = &self.config.world;
        let offset = self.surface_noise.sample_line(world_x as f32) * world.surface_amplitude;
        world.surface_y + offset as i32
    }

    fn in_trench(&self, world_x: i32, world_y: i32) -> bool {
        let trench = &self.config.trench;
        if !trench.enabled || world_y > trench.top_y {
            return false;
        }
        let half_width =
            trench.half_width + self.trench_noise.sample_line(world_y as f32) * trench.widen_amplitude;
        (world_x as f32).abs() <= half_width
    }

    /// Pass 1: base terrain and biome tag
    fn base_cell(&self, world_x: i32, world_y: i32) -> BaseCell {
        let world = &self.config.world;
        let cell = |tile, biome| BaseCell {
            tile,
            biome,
            region: None,
        };

        if world_y <= world.bedrock_y {
            return cell(TileId::BEDROCK, BiomeType::Rock);
        }

        let surface = self.surface_height(world_x);
        if world_y > surface {
            return cell(TileId::AIR, BiomeType::Surface);
        }
        if world_y > surface - world.topsoil_depth {
            return cell(world.topsoil_tile, BiomeType::Surface);
        }

        if self.in_trench(world_x, world_y) {
            return cell(self.config.trench.tile, BiomeType::Trench);
        }

        self.regions
            .iter()
            .position(|region| region.contains(world_x, world_y))
            .map(|index| {
                let region = &self.regions[index].config;
                BaseCell {
                    tile: region.fill_tile,
                    biome: region.biome,
                    region: Some(index),
                }
            })
            .unwrap_or_else(|| cell(TileId::STONE, BiomeType::Rock))
    }

    /// Effective cave parameters for a cell (None = caves disabled there)
    fn cave_settings(&self, region: Option<usize>) -> Option<CaveSettings> {
        let caves = &self.config.caves;
        if !caves.enabled {
            return None;
        }

        let mut settings = CaveSettings {
            threshold: caves.threshold,
            frequency: caves.frequency,
            warp_amplitude: caves.warp_amplitude,
        };

        if let Some(index) = region
            && let Some(cave_override) = &self.regions[index].config.cave_override
        {
            if cave_override.disabled {
                return None;
            }
            settings.threshold = cave_override.threshold.unwrap_or(settings.threshold);
            settings.frequency = cave_override.frequency.unwrap_or(settings.frequency);
            settings.warp_amplitude = cave_override.warp_amplitude.unwrap_or(settings.warp_amplitude);
        }

        Some(settings)
    }

    /// Pass 2: domain-warped cave carving
    fn carves(&self, world_x: i32, world_y: i32, base: &BaseCell) -> bool {
        if base.tile == TileId::BEDROCK || !self.tiles.is_carvable(base.tile) {
            return false;
        }
        let Some(settings) = self.cave_settings(base.region) else {
            return false;
        };

        let (x, y) = (world_x as f32, world_y as f32);
        let warp_freq = self.config.caves.warp_frequency;
        let dx = self.warp_x.sample(x * warp_freq, y * warp_freq) * settings.warp_amplitude;
        let dy = self.warp_y.sample(x * warp_freq, y * warp_freq) * settings.warp_amplitude;

        let density = self
            .cave_density
            .sample((x + dx) * settings.frequency, (y + dy) * settings.frequency);
        density < settings.threshold
    }

    /// Ground tile at any world cell after passes 1 and 2
    ///
    /// Pure: never consults or triggers chunk storage, so generation can look
    /// across chunk borders without generating neighbors.
    pub fn terrain_at(&self, world_x: i32, world_y: i32) -> u16 {
        let base = self.base_cell(world_x, world_y);
        if self.carves(world_x, world_y, &base) {
            TileId::AIR
        } else {
            base.tile
        }
    }

    /// Biome tag at any world cell (pass 1 only)
    pub fn biome_at(&self, world_x: i32, world_y: i32) -> BiomeType {
        self.base_cell(world_x, world_y).biome
    }

    /// Pass 3: ore for a solid host cell (`TileId::INVALID` when none)
    fn place_ore(&self, world_x: i32, world_y: i32, biome: BiomeType) -> u16 {
        let (x, y) = (world_x as f32, world_y as f32);
        let mut placed = TileId::INVALID;

        for ore in &self.ores {
            let c = &ore.config;
            if world_y < c.min_y || world_y > c.max_y {
                continue;
            }
            if !c.biomes.is_empty() && !c.biomes.contains(&biome) {
                continue;
            }
            if let Some((cluster, noise)) = &ore.cluster {
                let gate = noise.sample(x * cluster.noise_scale, y * cluster.noise_scale);
                if gate <= cluster.threshold {
                    continue;
                }
            }
            if ore.noise.sample(x * c.noise_scale, y * c.noise_scale) > c.threshold {
                // Later ores overwrite earlier ones
                placed = c.tile_id;
            }
        }

        placed
    }

    /// Ground tile at a world cell, preferring the chunk being generated
    fn anchor_tile(&self, coord: IVec2, ground: &[u16; CHUNK_AREA], cell: IVec2) -> u16 {
        let (cell_chunk, x, y) = world_to_chunk_coords(cell.x, cell.y);
        if cell_chunk == coord {
            ground[y * CHUNK_SIZE + x]
        } else {
            self.terrain_at(cell.x, cell.y)
        }
    }

    fn has_clearance(
        &self,
        coord: IVec2,
        ground: &[u16; CHUNK_AREA],
        cell: IVec2,
        kind: AttachmentKind,
        clearance: u8,
    ) -> bool {
        let normal = kind.normal();
        (1..=i32::from(clearance.max(1)))
            .all(|step| !self.tiles.is_solid(self.anchor_tile(coord, ground, cell + normal * step)))
    }

    /// Pass 4: entity anchoring over the finished ground layer
    fn anchor_entities(&self, coord: IVec2, ground: &[u16; CHUNK_AREA]) -> Vec<SpawnCandidate> {
        let origin = coord * CHUNK_SIZE as i32;
        let mut claimed = AHashSet::new();
        let mut spawns = Vec::new();

        for (index, &tile) in ground.iter().enumerate() {
            if !self.tiles.is_carvable(tile) {
                continue;
            }
            let (lx, ly) = local_position(index);
            let cell = origin + IVec2::new(lx as i32, ly as i32);
            if claimed.contains(&cell) {
                continue;
            }
            let (x, y) = (cell.x as f32, cell.y as f32);

            'defs: for spawn in &self.spawns {
                let c = &spawn.config;
                if cell.y < c.min_y || cell.y > c.max_y {
                    continue;
                }
                if spawn.noise.sample(x * c.noise_scale, y * c.noise_scale) <= c.threshold {
                    continue;
                }
                for &kind in &c.attachments {
                    if self.has_clearance(coord, ground, cell, kind, c.clearance) {
                        claimed.insert(cell);
                        spawns.push(SpawnCandidate {
                            entity_type: c.entity_type,
                            cell,
                            attachment: kind,
                            rotation: kind.rotation_degrees(),
                        });
                        break 'defs;
                    }
                }
            }
        }

        spawns
    }

    /// Generate a complete chunk at the given chunk coordinates
    pub fn generate_chunk(&self, coord: IVec2) -> GeneratedChunk {
        let origin = coord * CHUNK_SIZE as i32;
        let mut ground = [TileId::AIR; CHUNK_AREA];
        let mut ore = [TileId::INVALID; CHUNK_AREA];
        let mut biome = [BiomeType::None.tag(); CHUNK_AREA];

        for index in 0..CHUNK_AREA {
            let (lx, ly) = local_position(index);
            let world_x = origin.x + lx as i32;
            let world_y = origin.y + ly as i32;

            let base = self.base_cell(world_x, world_y);
            let tile = if self.carves(world_x, world_y, &base) {
                TileId::AIR
            } else {
                base.tile
            };

            ground[index] = tile;
            biome[index] = base.biome.tag();
            if tile != TileId::BEDROCK && self.tiles.is_carvable(tile) {
                ore[index] = self.place_ore(world_x, world_y, base.biome);
            }
        }

        let spawns = self.anchor_entities(coord, &ground);
        log::trace!(
            "[GEN] Chunk ({}, {}) generated with {} spawn candidates",
            coord.x,
            coord.y,
            spawns.len()
        );

        GeneratedChunk {
            chunk: ChunkData::generated(coord, ground, ore, biome),
            spawns,
        }
    }

    /// Generate many chunks in parallel
    ///
    /// Identical to calling [`WorldGenerator::generate_chunk`] for each coordinate.
    /// Coordinates that cannot be generated are logged and left out.
    pub fn generate_batch(&self, coords: &[IVec2]) -> AHashMap<IVec2, GeneratedChunk> {
        let unique: Vec<IVec2> = coords
            .iter()
            .copied()
            .collect::<AHashSet<_>>()
            .into_iter()
            .collect();

        let results: Vec<(IVec2, Result<GeneratedChunk, WorldError>)> = unique
            .par_iter()
            .map(|&coord| (coord, self.produce(coord)))
            .collect();

        results
            .into_iter()
            .filter_map(|(coord, result)| match result {
                Ok(generated) => Some((coord, generated)),
                Err(e) => {
                    log::error!("[GEN] {}", e);
                    None
                }
            })
            .collect()
    }
}

/// Chunk coordinates whose world cells fit in i32
fn chunk_in_range(coord: IVec2) -> bool {
    let size = CHUNK_SIZE as i32;
    [coord.x, coord.y].into_iter().all(|c| {
        c.checked_mul(size)
            .and_then(|origin| origin.checked_add(size - 1))
            .is_some()
    })
}

impl ChunkSource for WorldGenerator {
    fn produce(&self, coord: IVec2) -> Result<GeneratedChunk, WorldError> {
        if !chunk_in_range(coord) {
            return Err(WorldError::GenerationFailed {
                coord,
                reason: "world cells out of range".to_string(),
            });
        }
        Ok(self.generate_chunk(coord))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::worldgen_config::{CaveParams, SpawnConfig};
    use smallvec::smallvec;

    fn solid_generator(config: WorldGenConfig) -> WorldGenerator {
        WorldGenerator::from_config(42, config)
    }

    #[test]
    fn test_deterministic_generation() {
        let gen1 = WorldGenerator::new(42);
        let gen2 = WorldGenerator::new(42);

        for coord in [IVec2::new(0, 0), IVec2::new(-3, -5), IVec2::new(7, -20)] {
            assert_eq!(gen1.generate_chunk(coord), gen2.generate_chunk(coord));
        }
    }

    #[test]
    fn test_seed_changes_output() {
        let gen1 = WorldGenerator::new(1);
        let gen2 = WorldGenerator::new(2);
        let differs = (-4..4).any(|y| {
            let coord = IVec2::new(2, y);
            gen1.generate_chunk(coord).chunk != gen2.generate_chunk(coord).chunk
        });
        assert!(differs);
    }

    #[test]
    fn test_bedrock_layer() {
        let generator = WorldGenerator::new(42);
        // Chunk y=-46 covers y=-736..=-721, all at or below bedrock_y = -720
        let generated = generator.generate_chunk(IVec2::new(0, -46));
        assert!(generated.chunk.ground_ids().iter().all(|&t| t == TileId::BEDROCK));
        assert!(generated.chunk.ore_ids().iter().all(|&o| o == TileId::INVALID));
    }

    #[test]
    fn test_sky_is_air() {
        let generator = WorldGenerator::new(42);
        let generated = generator.generate_chunk(IVec2::new(0, 5));
        assert_eq!(generated.chunk.solid_count(), 0);
        assert!(
            generated
                .chunk
                .biome_tags()
                .iter()
                .all(|&tag| tag == BiomeType::Surface.tag())
        );
        assert!(generated.spawns.is_empty());
    }

    #[test]
    fn test_trench_corridor() {
        let config = WorldGenConfig {
            caves: CaveParams {
                enabled: false,
                ..CaveParams::default()
            },
            ..WorldGenConfig::default()
        };
        let generator = solid_generator(config);
        assert_eq!(generator.terrain_at(0, -30), TileId::TRENCH_ROCK);
        assert_eq!(generator.biome_at(0, -30), BiomeType::Trench);
        assert_ne!(generator.terrain_at(60, -30), TileId::TRENCH_ROCK);
    }

    #[test]
    fn test_region_priority_and_default() {
        let generator = WorldGenerator::new(42);
        // Inside both the lake and the frozen caves; the lake has higher priority
        // and disables caves
        assert_eq!(generator.terrain_at(200, -35), TileId::WATER);
        assert_eq!(generator.biome_at(200, -35), BiomeType::Lake);

        let base = generator.base_cell(3000, -300);
        assert_eq!(base.tile, TileId::STONE);
        assert_eq!(base.biome, BiomeType::Rock);
        assert_eq!(base.region, None);
    }

    #[test]
    fn test_bedrock_never_carved() {
        let config = WorldGenConfig {
            caves: CaveParams {
                threshold: 2.0, // Every density sample carves
                ..CaveParams::default()
            },
            ..WorldGenConfig::preset_solid()
        };
        let generator = solid_generator(config);

        let floor = generator.generate_chunk(IVec2::new(3, -46));
        assert!(floor.chunk.ground_ids().iter().all(|&t| t == TileId::BEDROCK));

        let cavern = generator.generate_chunk(IVec2::new(100, -20));
        assert_eq!(cavern.chunk.solid_count(), 0);
        assert!(cavern.chunk.ore_ids().iter().all(|&o| o == TileId::INVALID));
    }

    fn always_ore(tile_id: u16) -> OreConfig {
        OreConfig {
            tile_id,
            name: format!("ore {tile_id}"),
            noise: Default::default(),
            noise_scale: 0.1,
            threshold: -2.0,
            min_y: -1000,
            max_y: 1000,
            biomes: Vec::new(),
            cluster: None,
        }
    }

    #[test]
    fn test_later_ore_overwrites() {
        let config = WorldGenConfig {
            ores: vec![always_ore(TileId::COAL_ORE), always_ore(TileId::GOLD_ORE)],
            ..WorldGenConfig::preset_solid()
        };
        let generated = solid_generator(config).generate_chunk(IVec2::new(100, -10));
        let chunk = &generated.chunk;
        for (tile, ore) in chunk.ground_ids().iter().zip(chunk.ore_ids()) {
            assert_ne!(*tile, TileId::AIR);
            assert_eq!(*ore, TileId::GOLD_ORE);
        }
    }

    #[test]
    fn test_ore_filters() {
        let restricted = OreConfig {
            biomes: vec![BiomeType::Lake],
            ..always_ore(TileId::COAL_ORE)
        };
        let gated = OreConfig {
            cluster: Some(ClusterConfig {
                noise: Default::default(),
                noise_scale: 0.02,
                threshold: 2.0, // Gate never opens
            }),
            ..always_ore(TileId::IRON_ORE)
        };
        let out_of_range = OreConfig {
            min_y: 500,
            ..always_ore(TileId::GOLD_ORE)
        };
        let config = WorldGenConfig {
            ores: vec![restricted, gated, out_of_range],
            ..WorldGenConfig::preset_solid()
        };
        let generated = solid_generator(config).generate_chunk(IVec2::new(100, -10));
        assert!(generated.chunk.ore_ids().iter().all(|&o| o == TileId::INVALID));
    }

    #[test]
    fn test_ground_anchoring_on_surface() {
        let config = WorldGenConfig {
            spawns: vec![SpawnConfig {
                name: "test".to_string(),
                entity_type: 9,
                noise: Default::default(),
                noise_scale: 0.1,
                threshold: -2.0,
                min_y: -100,
                max_y: 100,
                // Ceiling is tried first and can never pass on open ground
                attachments: smallvec![AttachmentKind::Ceiling, AttachmentKind::Ground],
                clearance: 2,
            }],
            ..WorldGenConfig::preset_solid()
        };
        let generator = solid_generator(config);

        let mut spawns = Vec::new();
        for y in -1..=0 {
            spawns.extend(generator.generate_chunk(IVec2::new(0, y)).spawns);
        }

        // Exactly one anchor per column: the topmost solid cell
        assert_eq!(spawns.len(), CHUNK_SIZE);
        let mut columns: Vec<i32> = spawns.iter().map(|s| s.cell.x).collect();
        columns.sort();
        assert_eq!(columns, (0..CHUNK_SIZE as i32).collect::<Vec<_>>());

        for spawn in &spawns {
            assert_eq!(spawn.attachment, AttachmentKind::Ground);
            assert_eq!(spawn.rotation, 0.0);
            assert_eq!(spawn.entity_type, 9);
            assert!(generator.tiles().is_solid(generator.terrain_at(spawn.cell.x, spawn.cell.y)));
            assert_eq!(generator.terrain_at(spawn.cell.x, spawn.cell.y + 1), TileId::AIR);
            assert_eq!(generator.terrain_at(spawn.cell.x, spawn.cell.y + 2), TileId::AIR);
            assert_eq!(spawn.position(), spawn.cell.as_vec2() + Vec2::new(0.5, 1.5));
        }
    }

    #[test]
    fn test_every_open_anchor_cell_is_claimed_once() {
        let attachments = smallvec![
            AttachmentKind::Ground,
            AttachmentKind::WallLeft,
            AttachmentKind::WallRight
        ];
        let config = WorldGenConfig {
            spawns: vec![SpawnConfig {
                name: "test".to_string(),
                entity_type: 3,
                noise: Default::default(),
                noise_scale: 0.1,
                threshold: -2.0,
                min_y: -100,
                max_y: 100,
                attachments,
                clearance: 1,
            }],
            ..WorldGenConfig::preset_solid()
        };
        let generator = solid_generator(config);
        let open = |cell: IVec2| !generator.tiles().is_solid(generator.terrain_at(cell.x, cell.y));

        for coord in [IVec2::new(0, -1), IVec2::new(0, 0), IVec2::new(1, -1), IVec2::new(1, 0)] {
            let spawns = generator.generate_chunk(coord).spawns;
            let cells: AHashSet<IVec2> = spawns.iter().map(|s| s.cell).collect();
            assert_eq!(cells.len(), spawns.len());

            // A step in the surface puts a wall anchor and a ground anchor in front
            // of the same open cell; both still count
            let origin = coord * CHUNK_SIZE as i32;
            let expected = (0..CHUNK_AREA)
                .map(|index| {
                    let (lx, ly) = local_position(index);
                    origin + IVec2::new(lx as i32, ly as i32)
                })
                .filter(|&cell| {
                    generator.tiles().is_carvable(generator.terrain_at(cell.x, cell.y))
                        && [AttachmentKind::Ground, AttachmentKind::WallLeft, AttachmentKind::WallRight]
                            .iter()
                            .any(|kind| open(cell + kind.normal()))
                })
                .count();
            assert_eq!(spawns.len(), expected);
        }
    }

    #[test]
    fn test_batch_matches_sequential() {
        let generator = WorldGenerator::new(7);
        let coords = [IVec2::new(0, 0), IVec2::new(1, 0), IVec2::new(0, -3), IVec2::new(0, 0)];
        let batch = generator.generate_batch(&coords);
        assert_eq!(batch.len(), 3);
        for coord in coords {
            assert_eq!(batch[&coord], generator.generate_chunk(coord));
        }
    }

    #[test]
    fn test_out_of_range_coordinate_fails() {
        let generator = WorldGenerator::new(7);
        let result = generator.produce(IVec2::new(i32::MAX / 4, 0));
        assert!(matches!(result, Err(WorldError::GenerationFailed { .. })));
        assert!(generator.generate_batch(&[IVec2::new(i32::MIN, 0)]).is_empty());
    }

    #[test]
    fn test_update_config_keeps_seed() {
        let mut generator = WorldGenerator::new(42);
        generator.update_config(WorldGenConfig::preset_cave_heavy());
        assert_eq!(generator.seed, 42);
        assert_eq!(generator.config().name, "Cave Heavy");
    }
}
