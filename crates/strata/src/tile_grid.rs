//! Client-side tile mirror
//!
//! [`TileSurface`] is the seam to whatever renders tiles. [`TileGrid`] is the
//! headless implementation: a sparse map of world cells, plus counters so the
//! cost of each write path can be observed.

use ahash::AHashMap;
use glam::{IVec2, UVec2};
use strata_core::tiles::{CHUNK_AREA, CHUNK_SIZE, TileId, local_position};

/// World cell of the bottom-left tile of a chunk
pub fn chunk_origin(coord: IVec2) -> IVec2 {
    coord * CHUNK_SIZE as i32
}

/// Destination for tile writes
pub trait TileSurface {
    fn set_block(&mut self, cell: IVec2, tile_id: u16);

    fn clear_block(&mut self, cell: IVec2);

    /// Write a `size.x` by `size.y` block whose bottom-left cell is `origin`
    ///
    /// `tiles` is row-major from the bottom row up; its length is `size.x * size.y`.
    fn write_region(&mut self, origin: IVec2, size: UVec2, tiles: &[u16]);

    fn clear_region(&mut self, origin: IVec2, size: UVec2) {
        for y in 0..size.y as i32 {
            for x in 0..size.x as i32 {
                self.clear_block(origin + IVec2::new(x, y));
            }
        }
    }
}

/// Sparse headless tile mirror; air is never stored
#[derive(Debug, Default, Clone)]
pub struct TileGrid {
    cells: AHashMap<IVec2, u16>,
    block_writes: usize,
    bulk_writes: usize,
}

impl TileGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, cell: IVec2) -> u16 {
        self.cells.get(&cell).copied().unwrap_or(TileId::AIR)
    }

    /// Number of non-air cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Region writes issued so far
    pub fn bulk_writes(&self) -> usize {
        self.bulk_writes
    }

    /// Single-cell writes issued so far
    pub fn block_writes(&self) -> usize {
        self.block_writes
    }

    /// Tiles of one chunk in payload order
    pub fn chunk_tiles(&self, coord: IVec2) -> Vec<u16> {
        let origin = chunk_origin(coord);
        (0..CHUNK_AREA)
            .map(|index| {
                let (x, y) = local_position(index);
                self.get(origin + IVec2::new(x as i32, y as i32))
            })
            .collect()
    }

    fn store(&mut self, cell: IVec2, tile_id: u16) {
        if tile_id == TileId::AIR {
            self.cells.remove(&cell);
        } else {
            self.cells.insert(cell, tile_id);
        }
    }
}

impl TileSurface for TileGrid {
    fn set_block(&mut self, cell: IVec2, tile_id: u16) {
        self.block_writes += 1;
        self.store(cell, tile_id);
    }

    fn clear_block(&mut self, cell: IVec2) {
        self.block_writes += 1;
        self.cells.remove(&cell);
    }

    fn write_region(&mut self, origin: IVec2, size: UVec2, tiles: &[u16]) {
        let expected = (size.x * size.y) as usize;
        if tiles.len() != expected {
            log::warn!(
                "[STREAM] Region write of {}x{} got {} tiles, skipping",
                size.x,
                size.y,
                tiles.len()
            );
            return;
        }

        self.bulk_writes += 1;
        let width = size.x as usize;
        for (index, &tile_id) in tiles.iter().enumerate() {
            let cell = origin + IVec2::new((index % width) as i32, (index / width) as i32);
            self.store(cell, tile_id);
        }
    }

    fn clear_region(&mut self, origin: IVec2, size: UVec2) {
        self.bulk_writes += 1;
        self.cells.retain(|cell, _| {
            let local = *cell - origin;
            local.x < 0 || local.y < 0 || local.x >= size.x as i32 || local.y >= size.y as i32
        });
    }
}

/// Last known durability of every cell in the loaded chunks
#[derive(Debug, Default)]
pub struct DurabilityCache {
    chunks: AHashMap<IVec2, Vec<i16>>,
}

impl DurabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_chunk(&mut self, coord: IVec2, durabilities: Vec<i16>) {
        self.chunks.insert(coord, durabilities);
    }

    pub fn drop_chunk(&mut self, coord: IVec2) -> bool {
        self.chunks.remove(&coord).is_some()
    }

    pub fn contains_chunk(&self, coord: IVec2) -> bool {
        self.chunks.contains_key(&coord)
    }

    /// Durability of a cell, or None when its chunk is not cached
    pub fn get(&self, cell: IVec2) -> Option<i16> {
        let (coord, index) = cell_index(cell);
        self.chunks.get(&coord).map(|grid| grid[index])
    }

    /// Update one cell; ignored when its chunk is not cached
    pub fn set(&mut self, cell: IVec2, durability: i16) -> bool {
        let (coord, index) = cell_index(cell);
        match self.chunks.get_mut(&coord) {
            Some(grid) => {
                grid[index] = durability;
                true
            }
            None => false,
        }
    }

    /// Number of cached chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

fn cell_index(cell: IVec2) -> (IVec2, usize) {
    let size = CHUNK_SIZE as i32;
    let coord = IVec2::new(cell.x.div_euclid(size), cell.y.div_euclid(size));
    let local = cell - coord * size;
    (coord, local.y as usize * CHUNK_SIZE + local.x as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_write_matches_block_writes() {
        let tiles: Vec<u16> = (0..6).map(|i| [TileId::DIRT, TileId::AIR, TileId::STONE][i % 3]).collect();
        let origin = IVec2::new(-2, 5);

        let mut bulk = TileGrid::new();
        bulk.write_region(origin, UVec2::new(3, 2), &tiles);

        let mut single = TileGrid::new();
        for (index, &tile) in tiles.iter().enumerate() {
            single.set_block(origin + IVec2::new(index as i32 % 3, index as i32 / 3), tile);
        }

        assert_eq!(bulk.get(IVec2::new(-2, 5)), TileId::DIRT);
        assert_eq!(bulk.get(IVec2::new(0, 5)), TileId::STONE);
        assert_eq!(bulk.get(IVec2::new(-1, 5)), TileId::AIR);
        assert_eq!(bulk.get(IVec2::new(-2, 6)), TileId::DIRT);
        for y in 5..7 {
            for x in -2..1 {
                let cell = IVec2::new(x, y);
                assert_eq!(bulk.get(cell), single.get(cell));
            }
        }
        assert_eq!(bulk.bulk_writes(), 1);
        assert_eq!(single.block_writes(), 6);
    }

    #[test]
    fn test_region_write_rejects_wrong_length() {
        let mut grid = TileGrid::new();
        grid.write_region(IVec2::ZERO, UVec2::new(2, 2), &[TileId::DIRT; 3]);
        assert!(grid.is_empty());
        assert_eq!(grid.bulk_writes(), 0);
    }

    #[test]
    fn test_clear_region_only_touches_region() {
        let mut grid = TileGrid::new();
        grid.write_region(IVec2::ZERO, UVec2::new(4, 1), &[TileId::DIRT; 4]);
        grid.clear_region(IVec2::new(1, 0), UVec2::new(2, 1));
        assert_eq!(grid.get(IVec2::new(0, 0)), TileId::DIRT);
        assert_eq!(grid.get(IVec2::new(1, 0)), TileId::AIR);
        assert_eq!(grid.get(IVec2::new(2, 0)), TileId::AIR);
        assert_eq!(grid.get(IVec2::new(3, 0)), TileId::DIRT);
        assert_eq!(grid.len(), 2);
    }

    #[test]
    fn test_durability_cache_negative_cells() {
        let mut cache = DurabilityCache::new();
        let mut grid = vec![-1i16; CHUNK_AREA];
        grid[15 * CHUNK_SIZE + 15] = 3;
        cache.insert_chunk(IVec2::new(-1, -1), grid);

        assert_eq!(cache.get(IVec2::new(-1, -1)), Some(3));
        assert_eq!(cache.get(IVec2::new(-16, -16)), Some(-1));
        assert_eq!(cache.get(IVec2::new(0, 0)), None);

        assert!(cache.set(IVec2::new(-16, -1), 9));
        assert_eq!(cache.get(IVec2::new(-16, -1)), Some(9));
        assert!(!cache.set(IVec2::new(16, 0), 9));

        assert!(cache.drop_chunk(IVec2::new(-1, -1)));
        assert!(cache.is_empty());
    }
}
