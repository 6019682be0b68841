//! Biome classification and neighbor-consistency propagation

use std::collections::VecDeque;

use ahash::{AHashMap, AHashSet};
use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::chunk::ChunkData;

/// Biome tag stored per tile; enumeration order breaks dominant-biome ties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum BiomeType {
    None = 0,
    Surface = 1,
    Rock = 2,
    Cave = 3,
    Trench = 4,
    Frozen = 5,
    Fungal = 6,
    Crystal = 7,
    Magma = 8,
    Lake = 9,
}

impl BiomeType {
    /// All tags, in enumeration order
    pub const ALL: [BiomeType; 10] = [
        BiomeType::None,
        BiomeType::Surface,
        BiomeType::Rock,
        BiomeType::Cave,
        BiomeType::Trench,
        BiomeType::Frozen,
        BiomeType::Fungal,
        BiomeType::Crystal,
        BiomeType::Magma,
        BiomeType::Lake,
    ];

    pub const COUNT: usize = Self::ALL.len();

    #[inline]
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            BiomeType::None => "None",
            BiomeType::Surface => "Surface",
            BiomeType::Rock => "Rock",
            BiomeType::Cave => "Cave",
            BiomeType::Trench => "Trench",
            BiomeType::Frozen => "Frozen",
            BiomeType::Fungal => "Fungal",
            BiomeType::Crystal => "Crystal",
            BiomeType::Magma => "Magma",
            BiomeType::Lake => "Lake",
        }
    }
}

/// Per-chunk biome statistics
///
/// `dominant` is a cache: count mutations leave it stale until
/// [`BiomeChunkInfo::recompute_dominant`] runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiomeChunkInfo {
    counts: [u32; BiomeType::COUNT],
    pub dominant: BiomeType,
    pub total_tiles_counted: u32,
}

impl Default for BiomeChunkInfo {
    fn default() -> Self {
        Self {
            counts: [0; BiomeType::COUNT],
            dominant: BiomeType::None,
            total_tiles_counted: 0,
        }
    }
}

impl BiomeChunkInfo {
    /// Count every tile tag of a chunk and pick the dominant biome
    pub fn from_chunk(chunk: &ChunkData) -> Self {
        let mut info = Self::default();
        for &tag in chunk.biome_tags() {
            match BiomeType::from_tag(tag) {
                Some(biome) => info.add(biome),
                None => log::warn!(
                    "[BIOME] Unknown biome tag {} in chunk ({}, {})",
                    tag,
                    chunk.coord.x,
                    chunk.coord.y
                ),
            }
        }
        info.recompute_dominant();
        info
    }

    pub fn count(&self, biome: BiomeType) -> u32 {
        self.counts[biome as usize]
    }

    fn add(&mut self, biome: BiomeType) {
        self.counts[biome as usize] += 1;
        self.total_tiles_counted += 1;
    }

    fn remove(&mut self, biome: BiomeType) -> bool {
        let slot = &mut self.counts[biome as usize];
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
        self.total_tiles_counted -= 1;
        true
    }

    /// Re-derive the dominant biome from the counts
    ///
    /// First tag in enumeration order with the strictly highest count wins;
    /// `BiomeType::None` when nothing has been counted.
    pub fn recompute_dominant(&mut self) -> BiomeType {
        let mut best = BiomeType::None;
        let mut best_count = 0;
        for biome in BiomeType::ALL {
            let count = self.counts[biome as usize];
            if count > best_count {
                best = biome;
                best_count = count;
            }
        }
        self.dominant = best;
        best
    }
}

/// "If a chunk's dominant biome is `from` and any 4-neighbor's is `neighbor`,
/// the chunk becomes `becomes`"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiomeOverrideRule {
    pub from: BiomeType,
    pub neighbor: BiomeType,
    pub becomes: BiomeType,
}

impl BiomeOverrideRule {
    /// Rule where the neighbor's biome bleeds into the chunk
    pub const fn bleed(from: BiomeType, neighbor: BiomeType) -> Self {
        Self {
            from,
            neighbor,
            becomes: neighbor,
        }
    }
}

const NEIGHBOR_OFFSETS: [IVec2; 4] = [IVec2::X, IVec2::NEG_X, IVec2::Y, IVec2::NEG_Y];

/// Computes and reconciles per-chunk dominant biomes
pub struct BiomeResolver {
    infos: AHashMap<IVec2, BiomeChunkInfo>,
    rules: Vec<BiomeOverrideRule>,
}

impl BiomeResolver {
    /// Resolver with the default policy: caves next to a trench become trench
    pub fn new() -> Self {
        Self::with_rules(vec![BiomeOverrideRule::bleed(BiomeType::Cave, BiomeType::Trench)])
    }

    pub fn with_rules(rules: Vec<BiomeOverrideRule>) -> Self {
        Self {
            infos: AHashMap::new(),
            rules,
        }
    }

    pub fn rules(&self) -> &[BiomeOverrideRule] {
        &self.rules
    }

    /// Count the chunk's tags and store fresh info for it (replaces any previous info)
    pub fn classify(&mut self, coord: IVec2, chunk: &ChunkData) -> &BiomeChunkInfo {
        let info = BiomeChunkInfo::from_chunk(chunk);
        log::trace!(
            "[BIOME] Classified chunk ({}, {}) as {}",
            coord.x,
            coord.y,
            info.dominant.name()
        );
        self.infos.insert(coord, info);
        &self.infos[&coord]
    }

    pub fn info(&self, coord: IVec2) -> Option<&BiomeChunkInfo> {
        self.infos.get(&coord)
    }

    /// Dominant biome of a chunk (`BiomeType::None` for unclassified chunks)
    pub fn dominant(&self, coord: IVec2) -> BiomeType {
        self.infos.get(&coord).map_or(BiomeType::None, |info| info.dominant)
    }

    /// Count one more tile of `biome` in the chunk (dominant is not recomputed)
    pub fn record_tile(&mut self, coord: IVec2, biome: BiomeType) {
        self.infos.entry(coord).or_default().add(biome);
    }

    /// Count one fewer tile of `biome` in the chunk (dominant is not recomputed)
    pub fn forget_tile(&mut self, coord: IVec2, biome: BiomeType) {
        let removed = self
            .infos
            .get_mut(&coord)
            .is_some_and(|info| info.remove(biome));
        if !removed {
            log::warn!(
                "[BIOME] forget_tile({}) on chunk ({}, {}) with no such tile counted",
                biome.name(),
                coord.x,
                coord.y
            );
        }
    }

    /// Re-derive the cached dominant biome of a chunk
    pub fn recompute_dominant(&mut self, coord: IVec2) -> Option<BiomeType> {
        self.infos.get_mut(&coord).map(BiomeChunkInfo::recompute_dominant)
    }

    /// First rule that fires for `coord` given its current neighbors
    fn evaluate(&self, coord: IVec2) -> Option<BiomeType> {
        let current = self.infos.get(&coord)?.dominant;
        self.rules
            .iter()
            .filter(|rule| rule.from == current)
            .find(|rule| {
                NEIGHBOR_OFFSETS.iter().any(|offset| {
                    self.infos
                        .get(&(coord + *offset))
                        .is_some_and(|n| n.dominant == rule.neighbor)
                })
            })
            .map(|rule| rule.becomes)
            .filter(|&becomes| becomes != current)
    }

    /// Breadth-first fixpoint seeded at `start`
    ///
    /// Each popped chunk is checked against its current neighbors; when its dominant
    /// biome changes, every not-yet-visited neighbor that has data is enqueued. The
    /// visited set only lives for this run, so a later run seeded elsewhere may revisit
    /// the same chunks. Returns the coordinates whose dominant biome changed, in order.
    pub fn propagate(&mut self, start: IVec2) -> Vec<IVec2> {
        let mut changed = Vec::new();
        if !self.infos.contains_key(&start) {
            return changed;
        }

        let mut visited = AHashSet::new();
        let mut queue = VecDeque::new();
        visited.insert(start);
        queue.push_back(start);

        while let Some(coord) = queue.pop_front() {
            let Some(becomes) = self.evaluate(coord) else {
                continue;
            };

            if let Some(info) = self.infos.get_mut(&coord) {
                log::debug!(
                    "[BIOME] Chunk ({}, {}) {} -> {}",
                    coord.x,
                    coord.y,
                    info.dominant.name(),
                    becomes.name()
                );
                info.dominant = becomes;
            }
            changed.push(coord);

            for offset in NEIGHBOR_OFFSETS {
                let neighbor = coord + offset;
                if self.infos.contains_key(&neighbor) && visited.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }

        changed
    }

    /// Number of classified chunks
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Overwrite the dominant biome directly (used when mirroring a peer's state)
    pub fn set_dominant(&mut self, coord: IVec2, biome: BiomeType) {
        self.infos.entry(coord).or_default().dominant = biome;
    }
}

impl Default for BiomeResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver_with(dominants: &[(IVec2, BiomeType)]) -> BiomeResolver {
        let mut resolver = BiomeResolver::new();
        for &(coord, biome) in dominants {
            resolver.record_tile(coord, biome);
            resolver.recompute_dominant(coord);
        }
        resolver
    }

    #[test]
    fn test_empty_info_is_none() {
        let mut info = BiomeChunkInfo::default();
        assert_eq!(info.recompute_dominant(), BiomeType::None);
        assert_eq!(info.total_tiles_counted, 0);
    }

    #[test]
    fn test_tie_goes_to_enumeration_order() {
        let mut resolver = BiomeResolver::new();
        let coord = IVec2::ZERO;
        for _ in 0..3 {
            resolver.record_tile(coord, BiomeType::Trench);
            resolver.record_tile(coord, BiomeType::Cave);
        }
        assert_eq!(resolver.recompute_dominant(coord), Some(BiomeType::Cave));
    }

    #[test]
    fn test_dominant_is_not_implicitly_updated() {
        let mut resolver = resolver_with(&[(IVec2::ZERO, BiomeType::Rock)]);
        resolver.record_tile(IVec2::ZERO, BiomeType::Cave);
        resolver.record_tile(IVec2::ZERO, BiomeType::Cave);
        assert_eq!(resolver.dominant(IVec2::ZERO), BiomeType::Rock);
        resolver.recompute_dominant(IVec2::ZERO);
        assert_eq!(resolver.dominant(IVec2::ZERO), BiomeType::Cave);
    }

    #[test]
    fn test_forget_tile() {
        let mut resolver = resolver_with(&[(IVec2::ZERO, BiomeType::Rock)]);
        resolver.forget_tile(IVec2::ZERO, BiomeType::Rock);
        // Forgetting a tag that was never counted leaves counts untouched
        resolver.forget_tile(IVec2::ZERO, BiomeType::Cave);
        let info = resolver.info(IVec2::ZERO).unwrap();
        assert_eq!(info.total_tiles_counted, 0);
        assert_eq!(resolver.recompute_dominant(IVec2::ZERO), Some(BiomeType::None));
    }

    #[test]
    fn test_classify_counts_chunk_tags() {
        let chunk = ChunkData::new(IVec2::ZERO);
        let mut resolver = BiomeResolver::new();
        let info = resolver.classify(IVec2::ZERO, &chunk);
        assert_eq!(info.count(BiomeType::None), 256);
        assert_eq!(info.total_tiles_counted, 256);
        assert_eq!(info.dominant, BiomeType::None);
    }

    #[test]
    fn test_cave_next_to_trench_becomes_trench() {
        let a = IVec2::new(0, 0);
        let b = IVec2::new(1, 0);
        let mut resolver = resolver_with(&[(a, BiomeType::Cave), (b, BiomeType::Trench)]);

        assert_eq!(resolver.propagate(a), vec![a]);
        assert_eq!(resolver.dominant(a), BiomeType::Trench);

        // Converged: a second pass changes nothing
        assert!(resolver.propagate(a).is_empty());
        assert_eq!(resolver.dominant(a), BiomeType::Trench);
    }

    #[test]
    fn test_propagation_spreads_through_chain() {
        // Trench at 0, caves at 1..4 in a row; seeding at 1 spreads right
        let mut cells = vec![(IVec2::new(0, 0), BiomeType::Trench)];
        for x in 1..4 {
            cells.push((IVec2::new(x, 0), BiomeType::Cave));
        }
        let mut resolver = resolver_with(&cells);

        let changed = resolver.propagate(IVec2::new(1, 0));
        assert_eq!(changed, vec![IVec2::new(1, 0), IVec2::new(2, 0), IVec2::new(3, 0)]);
        for x in 0..4 {
            assert_eq!(resolver.dominant(IVec2::new(x, 0)), BiomeType::Trench);
        }
    }

    #[test]
    fn test_unchanged_seed_does_not_spread() {
        // The seed chunk has no trench neighbor, so its cave neighbors are never visited
        let mut resolver = resolver_with(&[
            (IVec2::new(0, 0), BiomeType::Cave),
            (IVec2::new(1, 0), BiomeType::Cave),
            (IVec2::new(2, 0), BiomeType::Trench),
        ]);
        assert!(resolver.propagate(IVec2::new(0, 0)).is_empty());
        assert_eq!(resolver.dominant(IVec2::new(1, 0)), BiomeType::Cave);

        // Seeding next to the trench picks both up
        let changed = resolver.propagate(IVec2::new(1, 0));
        assert_eq!(changed, vec![IVec2::new(1, 0), IVec2::new(0, 0)]);
    }

    #[test]
    fn test_propagate_unknown_chunk() {
        let mut resolver = BiomeResolver::new();
        assert!(resolver.propagate(IVec2::new(5, 5)).is_empty());
    }

    #[test]
    fn test_biome_tag_roundtrip() {
        for biome in BiomeType::ALL {
            assert_eq!(BiomeType::from_tag(biome.tag()), Some(biome));
        }
        assert_eq!(BiomeType::from_tag(200), None);
    }
}
