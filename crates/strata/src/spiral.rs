//! Spiral ordering of chunk coordinates
//!
//! Chunks near the viewer are requested first, so the required set is walked in
//! expanding square rings from the center.

use glam::IVec2;

/// Iterator that generates chunk positions in a spiral pattern
///
/// Yields chunks in expanding square rings from the center:
/// - Radius 0: center (1 chunk)
/// - Radius 1: 8 chunks around center
/// - Radius 2: 16 chunks in next ring
///
/// Each ring starts at `center + (r, r)` and walks down the right side, then the
/// bottom, left and top sides.
pub struct SpiralChunkIterator {
    center: IVec2,
    max_radius: i32,
    ring: i32,
    /// Position within the current ring's perimeter
    step: i32,
    finished: bool,
}

impl SpiralChunkIterator {
    pub fn new(center: IVec2, max_radius: i32) -> Self {
        Self {
            center,
            max_radius: max_radius.max(0),
            ring: 0,
            step: 0,
            finished: false,
        }
    }

    /// Number of chunks in the full square (`(2r + 1)^2`)
    pub fn total_chunks(&self) -> usize {
        let side_length = (self.max_radius * 2 + 1) as usize;
        side_length * side_length
    }

    /// Offset of perimeter step `step` on ring `ring` (ring > 0)
    fn ring_offset(ring: i32, step: i32) -> IVec2 {
        let side = ring * 2;
        let (edge, along) = (step / side, step % side);
        match edge {
            0 => IVec2::new(ring, ring - along),  // right side, moving down
            1 => IVec2::new(ring - along, -ring), // bottom, moving left
            2 => IVec2::new(-ring, -ring + along), // left side, moving up
            _ => IVec2::new(-ring + along, ring), // top, moving right
        }
    }
}

impl Iterator for SpiralChunkIterator {
    type Item = IVec2;

    fn next(&mut self) -> Option<IVec2> {
        if self.finished {
            return None;
        }

        if self.ring == 0 {
            self.ring = 1;
            self.step = 0;
            self.finished = self.max_radius == 0;
            return Some(self.center);
        }

        let offset = Self::ring_offset(self.ring, self.step);
        self.step += 1;
        if self.step == self.ring * 8 {
            self.ring += 1;
            self.step = 0;
            self.finished = self.ring > self.max_radius;
        }
        Some(self.center + offset)
    }
}

/// Every chunk within Chebyshev distance `radius` of `center`, nearest rings first
pub fn required_chunks(center: IVec2, radius: i32) -> Vec<IVec2> {
    SpiralChunkIterator::new(center, radius).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashSet;

    #[test]
    fn test_spiral_center_only() {
        let chunks: Vec<IVec2> = SpiralChunkIterator::new(IVec2::ZERO, 0).collect();
        assert_eq!(chunks, vec![IVec2::ZERO]);
    }

    #[test]
    fn test_spiral_radius_1() {
        let chunks: Vec<IVec2> = SpiralChunkIterator::new(IVec2::ZERO, 1).collect();

        // Should have 9 chunks (3x3 grid)
        assert_eq!(chunks.len(), 9);
        assert_eq!(chunks[0], IVec2::ZERO);
        assert_eq!(chunks[1], IVec2::new(1, 1));

        let unique: AHashSet<IVec2> = chunks.iter().copied().collect();
        assert_eq!(unique.len(), 9);
        for chunk in chunks {
            assert!(
                chunk.x.abs() <= 1 && chunk.y.abs() <= 1,
                "Chunk {:?} outside radius 1",
                chunk
            );
        }
    }

    #[test]
    fn test_spiral_rings_in_order() {
        let center = IVec2::new(5, -5);
        let chunks: Vec<IVec2> = SpiralChunkIterator::new(center, 3).collect();
        assert_eq!(chunks.len(), 49);

        let rings: Vec<i32> = chunks
            .iter()
            .map(|c| {
                let d = (*c - center).abs();
                d.x.max(d.y)
            })
            .collect();
        assert!(rings.windows(2).all(|w| w[0] <= w[1]), "rings out of order: {:?}", rings);

        let unique: AHashSet<IVec2> = chunks.iter().copied().collect();
        assert_eq!(unique.len(), chunks.len(), "Spiral iterator produced duplicates");
    }

    #[test]
    fn test_spiral_total_chunks() {
        assert_eq!(SpiralChunkIterator::new(IVec2::ZERO, 10).total_chunks(), 441);
        assert_eq!(SpiralChunkIterator::new(IVec2::ZERO, 3).total_chunks(), 49);
        assert_eq!(SpiralChunkIterator::new(IVec2::ZERO, -2).count(), 1);
    }
}
