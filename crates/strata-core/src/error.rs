//! Error types for world operations

use glam::IVec2;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorldError {
    #[error("chunk ({}, {}) has not been generated", .0.x, .0.y)]
    ChunkNotGenerated(IVec2),

    #[error("local position ({x}, {y}) is outside chunk ({}, {})", coord.x, coord.y)]
    LocalOutOfRange { coord: IVec2, x: i32, y: i32 },

    #[error("generation of chunk ({}, {}) failed: {reason}", coord.x, coord.y)]
    GenerationFailed { coord: IVec2, reason: String },

    #[error("grid length {actual} does not match chunk area {expected}")]
    GridSizeMismatch { expected: usize, actual: usize },
}
