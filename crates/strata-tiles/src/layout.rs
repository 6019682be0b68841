//! Chunk layout constants
//!
//! Every per-tile grid in a chunk is stored row-major: `index = y * CHUNK_SIZE + x`.

/// Side length of a chunk in tiles (16x16)
pub const CHUNK_SIZE: usize = 16;

/// Total tiles in a chunk
pub const CHUNK_AREA: usize = CHUNK_SIZE * CHUNK_SIZE;

/// Row-major index of a local tile position, or None when it lies outside the chunk
#[inline]
pub fn local_index(x: usize, y: usize) -> Option<usize> {
    (x < CHUNK_SIZE && y < CHUNK_SIZE).then(|| y * CHUNK_SIZE + x)
}

/// Inverse of [`local_index`]
#[inline]
pub fn local_position(index: usize) -> (usize, usize) {
    debug_assert!(index < CHUNK_AREA);
    (index % CHUNK_SIZE, index / CHUNK_SIZE)
}
