//! Persistent entity records - the authoritative state of every world entity

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use super::instances::InstanceHandle;
use crate::world::SpawnCandidate;

/// World transform of an entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityTransform {
    /// Position in tile units
    pub position: Vec2,
    /// Rotation in degrees
    pub rotation: f32,
    pub scale: Vec2,
}

impl Default for EntityTransform {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
        }
    }
}

impl EntityTransform {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Transform of a freshly anchored entity
    pub fn from_candidate(candidate: &SpawnCandidate) -> Self {
        Self {
            position: candidate.position(),
            rotation: candidate.rotation,
            scale: Vec2::ONE,
        }
    }
}

/// Authoritative record of a world entity
///
/// Outlives any live instance; `instance` is only a link to the current projection.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistentEntityRecord {
    /// Issued once, never reused within a session
    pub id: u64,
    pub entity_type: u16,
    pub transform: EntityTransform,
    /// Chunk whose activation drives this entity's primary reference
    pub home_chunk: IVec2,
    /// Live instance, None while deactivated
    pub instance: Option<InstanceHandle>,
}

impl PersistentEntityRecord {
    pub fn is_active(&self) -> bool {
        self.instance.is_some()
    }
}
