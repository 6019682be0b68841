//! Reference-counted activation of persistent entities
//!
//! A live instance exists exactly while at least one active chunk references the
//! entity. Chunks drive the counts through `activate_chunk` / `deactivate_chunk`;
//! every spawn and despawn is queued as a [`LifecycleEvent`] for broadcasting.
//!
//! Each active chunk remembers which entities it gave a reference to. An entity
//! that migrates keeps that reference until the chunk deactivates; at that point the
//! reference moves to an active chunk the entity now belongs to, or is dropped.

use ahash::{AHashMap, AHashSet};
use glam::{IVec2, Vec2};

use super::instances::{InstanceArena, LiveEntity};
use super::record::{EntityTransform, PersistentEntityRecord};
use crate::world::chunk_of_position;

/// Spawn/despawn notification for clients mirroring live entities
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    Spawned {
        id: u64,
        entity_type: u16,
        transform: EntityTransform,
    },
    Despawned {
        id: u64,
    },
}

pub struct EntityLifecycleTracker {
    records: AHashMap<u64, PersistentEntityRecord>,
    ref_counts: AHashMap<u64, u32>,
    chunk_entities: AHashMap<IVec2, Vec<u64>>,
    active_chunks: AHashSet<IVec2>,
    /// Entities each active chunk holds an activation reference for
    chunk_refs: AHashMap<IVec2, AHashSet<u64>>,
    instances: InstanceArena,
    next_id: u64,
    events: Vec<LifecycleEvent>,
    violations: u64,
}

impl EntityLifecycleTracker {
    pub fn new() -> Self {
        Self {
            records: AHashMap::new(),
            ref_counts: AHashMap::new(),
            chunk_entities: AHashMap::new(),
            active_chunks: AHashSet::new(),
            chunk_refs: AHashMap::new(),
            instances: InstanceArena::new(),
            next_id: 1,
            events: Vec::new(),
            violations: 0,
        }
    }

    /// Create a record associated with `chunk` and return its new id
    ///
    /// If the chunk is already active the entity is activated right away.
    pub fn register(&mut self, entity_type: u16, transform: EntityTransform, chunk: IVec2) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        self.records.insert(
            id,
            PersistentEntityRecord {
                id,
                entity_type,
                transform,
                home_chunk: chunk,
                instance: None,
            },
        );
        self.chunk_entities.entry(chunk).or_default().push(id);

        log::debug!(
            "[ENTITY] Registered entity {} (type {}) in chunk ({}, {})",
            id,
            entity_type,
            chunk.x,
            chunk.y
        );

        self.reference_from(chunk, id);
        id
    }

    /// Additionally associate an existing entity with another chunk
    ///
    /// Returns false when the id is unknown or already associated with the chunk.
    pub fn associate(&mut self, id: u64, chunk: IVec2) -> bool {
        if !self.records.contains_key(&id) {
            log::warn!("[ENTITY] associate: unknown entity {}", id);
            return false;
        }
        let ids = self.chunk_entities.entry(chunk).or_default();
        if ids.contains(&id) {
            return false;
        }
        ids.push(id);

        self.reference_from(chunk, id);
        true
    }

    /// Take a reference on behalf of `chunk` if it is active and holds none yet
    fn reference_from(&mut self, chunk: IVec2, id: u64) {
        if !self.active_chunks.contains(&chunk) {
            return;
        }
        if self.chunk_refs.entry(chunk).or_default().insert(id) {
            self.increment_activation_ref(id);
        }
    }

    /// Add one activation reference; the first one spawns the live instance
    ///
    /// Returns the new count, or None for an unknown id.
    pub fn increment_activation_ref(&mut self, id: u64) -> Option<u32> {
        let Some(record) = self.records.get_mut(&id) else {
            log::warn!("[ENTITY] increment: unknown entity {} (removed?)", id);
            return None;
        };

        let count = self.ref_counts.entry(id).or_insert(0);
        *count += 1;
        let count = *count;

        if count == 1 && record.instance.is_none() {
            let handle = self.instances.spawn(LiveEntity {
                entity_id: id,
                entity_type: record.entity_type,
                transform: record.transform,
            });
            record.instance = Some(handle);
            self.events.push(LifecycleEvent::Spawned {
                id,
                entity_type: record.entity_type,
                transform: record.transform,
            });
            log::trace!("[ENTITY] Spawned entity {}", id);
        }

        Some(count)
    }

    /// Remove one activation reference; the last one despawns the live instance
    ///
    /// A decrement at zero is an invariant violation: the count stays at zero and
    /// the violation is logged and counted.
    pub fn decrement_activation_ref(&mut self, id: u64) -> Option<u32> {
        if !self.records.contains_key(&id) {
            log::warn!("[ENTITY] decrement: unknown entity {} (removed?)", id);
            return None;
        }

        let count = self.ref_counts.entry(id).or_insert(0);
        if *count == 0 {
            self.violations += 1;
            log::error!(
                "[ENTITY] Activation ref count underflow for entity {} (missed increment?)",
                id
            );
            return Some(0);
        }

        *count -= 1;
        let count = *count;
        if count == 0 {
            self.ref_counts.remove(&id);
            self.deactivate(id);
        }
        Some(count)
    }

    /// Capture live state into the record and despawn the instance
    fn deactivate(&mut self, id: u64) {
        let Some(record) = self.records.get_mut(&id) else {
            return;
        };
        let Some(handle) = record.instance.take() else {
            return;
        };

        match self.instances.despawn(handle) {
            Some(live) => record.transform = live.transform,
            None => log::warn!("[ENTITY] Entity {} had a stale instance handle", id),
        }
        self.events.push(LifecycleEvent::Despawned { id });
        log::trace!("[ENTITY] Despawned entity {}", id);
    }

    /// Deactivate regardless of the ref count, clearing the counter and chunk references
    pub fn force_deactivation(&mut self, id: u64) {
        self.ref_counts.remove(&id);
        for ids in self.chunk_refs.values_mut() {
            ids.remove(&id);
        }
        self.deactivate(id);
    }

    /// Delete the record and every chunk association
    pub fn remove_permanently(&mut self, id: u64) -> Option<PersistentEntityRecord> {
        self.force_deactivation(id);
        let record = self.records.remove(&id)?;

        for ids in self.chunk_entities.values_mut() {
            ids.retain(|&other| other != id);
        }
        log::debug!("[ENTITY] Removed entity {} permanently", id);
        Some(record)
    }

    /// Give every entity associated with `chunk` one activation reference
    ///
    /// Returns false if the chunk was already active (nothing changes).
    pub fn activate_chunk(&mut self, chunk: IVec2) -> bool {
        if !self.active_chunks.insert(chunk) {
            return false;
        }
        for id in self.entities_in_chunk(chunk).to_vec() {
            self.reference_from(chunk, id);
        }
        true
    }

    /// Drop every activation reference `chunk` holds
    ///
    /// This includes entities that have since migrated out of the chunk. A
    /// reference for an entity that now belongs to another active chunk moves to
    /// that chunk instead. Returns false if the chunk was not active (nothing changes).
    pub fn deactivate_chunk(&mut self, chunk: IVec2) -> bool {
        if !self.active_chunks.remove(&chunk) {
            return false;
        }
        let Some(ids) = self.chunk_refs.remove(&chunk) else {
            return true;
        };

        for id in ids {
            match self.unreferenced_active_chunk(id) {
                Some(heir) => {
                    self.chunk_refs.entry(heir).or_default().insert(id);
                    log::trace!(
                        "[ENTITY] Entity {} reference moved ({}, {}) -> ({}, {})",
                        id,
                        chunk.x,
                        chunk.y,
                        heir.x,
                        heir.y
                    );
                }
                None => {
                    self.decrement_activation_ref(id);
                }
            }
        }
        true
    }

    /// An active chunk associated with the entity that holds no reference for it
    fn unreferenced_active_chunk(&self, id: u64) -> Option<IVec2> {
        self.active_chunks.iter().copied().find(|chunk| {
            self.entities_in_chunk(*chunk).contains(&id)
                && !self
                    .chunk_refs
                    .get(chunk)
                    .is_some_and(|ids| ids.contains(&id))
        })
    }

    /// Move an entity, re-homing it if it crossed into another chunk
    ///
    /// Ref counts are left untouched: the old chunk keeps its reference until it
    /// deactivates. Returns the entity's home chunk after the move.
    pub fn migrate(&mut self, id: u64, new_position: Vec2) -> Option<IVec2> {
        let record = self.records.get_mut(&id)?;
        record.transform.position = new_position;
        if let Some(live) = record.instance.and_then(|h| self.instances.get_mut(h)) {
            live.transform.position = new_position;
        }

        let old_chunk = record.home_chunk;
        let new_chunk = chunk_of_position(new_position);
        if new_chunk == old_chunk {
            return Some(old_chunk);
        }
        record.home_chunk = new_chunk;

        if let Some(ids) = self.chunk_entities.get_mut(&old_chunk) {
            ids.retain(|&other| other != id);
        }
        let ids = self.chunk_entities.entry(new_chunk).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }

        log::debug!(
            "[ENTITY] Entity {} migrated ({}, {}) -> ({}, {})",
            id,
            old_chunk.x,
            old_chunk.y,
            new_chunk.x,
            new_chunk.y
        );
        Some(new_chunk)
    }

    pub fn record(&self, id: u64) -> Option<&PersistentEntityRecord> {
        self.records.get(&id)
    }

    /// Live instance of an entity, if it is active
    pub fn live(&self, id: u64) -> Option<&LiveEntity> {
        self.instances.get(self.records.get(&id)?.instance?)
    }

    pub fn live_mut(&mut self, id: u64) -> Option<&mut LiveEntity> {
        let handle = self.records.get(&id)?.instance?;
        self.instances.get_mut(handle)
    }

    pub fn ref_count(&self, id: u64) -> u32 {
        self.ref_counts.get(&id).copied().unwrap_or(0)
    }

    pub fn entities_in_chunk(&self, chunk: IVec2) -> &[u64] {
        self.chunk_entities
            .get(&chunk)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_chunk_active(&self, chunk: IVec2) -> bool {
        self.active_chunks.contains(&chunk)
    }

    /// Active chunks currently holding an activation reference for the entity
    pub fn referencing_chunks(&self, id: u64) -> Vec<IVec2> {
        self.chunk_refs
            .iter()
            .filter(|(_, ids)| ids.contains(&id))
            .map(|(chunk, _)| *chunk)
            .collect()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn live_count(&self) -> usize {
        self.instances.len()
    }

    /// Ref-count underflows seen so far
    pub fn violations(&self) -> u64 {
        self.violations
    }

    /// Take all queued spawn/despawn events
    pub fn drain_events(&mut self) -> Vec<LifecycleEvent> {
        std::mem::take(&mut self.events)
    }
}

impl Default for EntityLifecycleTracker {
    fn default() -> Self {
        Self::new()
    }
}
