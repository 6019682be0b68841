//! Arena of live entity instances addressed by generation-checked handles

use serde::{Deserialize, Serialize};

use super::record::EntityTransform;

/// Index into the instance arena plus the slot generation it was issued for
///
/// A handle outlives its instance safely: once the slot is despawned or reused,
/// lookups through the old handle return None.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceHandle {
    pub index: u32,
    pub generation: u32,
}

/// Runtime projection of a persistent entity
#[derive(Debug, Clone, PartialEq)]
pub struct LiveEntity {
    pub entity_id: u64,
    pub entity_type: u16,
    pub transform: EntityTransform,
}

struct Slot {
    generation: u32,
    entity: Option<LiveEntity>,
}

#[derive(Default)]
pub struct InstanceArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl InstanceArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, entity: LiveEntity) -> InstanceHandle {
        self.live += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entity = Some(entity);
            return InstanceHandle {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            entity: Some(entity),
        });
        InstanceHandle {
            index,
            generation: 0,
        }
    }

    fn slot(&self, handle: InstanceHandle) -> Option<&Slot> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
    }

    pub fn get(&self, handle: InstanceHandle) -> Option<&LiveEntity> {
        self.slot(handle)?.entity.as_ref()
    }

    pub fn get_mut(&mut self, handle: InstanceHandle) -> Option<&mut LiveEntity> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)?
            .entity
            .as_mut()
    }

    /// Remove the instance; the slot's generation is bumped so old handles go stale
    pub fn despawn(&mut self, handle: InstanceHandle) -> Option<LiveEntity> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)?;
        let entity = slot.entity.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;
        Some(entity)
    }

    /// Number of live instances
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &LiveEntity> {
        self.slots.iter().filter_map(|slot| slot.entity.as_ref())
    }
}
