//! Integration tests for reference-counted entity activation
//!
//! Chunks activate and deactivate in arbitrary orders; the tracker must keep at most
//! one live instance per entity and never let a count go negative.

use glam::{IVec2, Vec2};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use strata_core::entity::{EntityLifecycleTracker, EntityTransform, LifecycleEvent};
use strata_core::world::{ChunkStore, WorldGenerator};

fn assert_consistent(tracker: &EntityLifecycleTracker, ids: &[u64]) {
    let mut active = 0;
    for &id in ids {
        let Some(record) = tracker.record(id) else {
            continue;
        };
        let count = tracker.ref_count(id);
        assert_eq!(
            record.is_active(),
            count > 0,
            "entity {id} active={} with ref count {count}",
            record.is_active()
        );
        if record.is_active() {
            active += 1;
            assert_eq!(tracker.live(id).map(|live| live.entity_id), Some(id));
            let referencing = tracker.referencing_chunks(id);
            assert!(
                !referencing.is_empty(),
                "entity {id} is live without an active chunk referencing it"
            );
            assert!(referencing.iter().all(|&chunk| tracker.is_chunk_active(chunk)));
        } else {
            assert!(tracker.live(id).is_none());
        }
    }
    assert_eq!(tracker.live_count(), active);
}

#[test]
fn test_entity_shared_by_two_chunks() {
    let mut tracker = EntityLifecycleTracker::new();
    let left = IVec2::new(0, 0);
    let right = IVec2::new(1, 0);

    let ids: Vec<u64> = (0..7)
        .map(|i| tracker.register(1, EntityTransform::at(Vec2::new(i as f32, 3.5)), left))
        .collect();
    let shared = ids[6];
    assert_eq!(shared, 7);
    assert!(tracker.associate(shared, right));

    tracker.activate_chunk(left);
    tracker.activate_chunk(right);
    assert_eq!(tracker.ref_count(shared), 2);
    assert_eq!(tracker.live_count(), 7);

    let spawned_shared = tracker
        .drain_events()
        .into_iter()
        .filter(|event| matches!(event, LifecycleEvent::Spawned { id, .. } if *id == shared))
        .count();
    assert_eq!(spawned_shared, 1);

    // Move the live instance; the record picks it up on despawn
    tracker.live_mut(shared).unwrap().transform.rotation = 90.0;

    tracker.deactivate_chunk(left);
    assert_eq!(tracker.ref_count(shared), 1);
    assert!(tracker.live(shared).is_some());
    assert_eq!(tracker.live_count(), 1);

    tracker.deactivate_chunk(right);
    assert_eq!(tracker.ref_count(shared), 0);
    assert!(tracker.live(shared).is_none());
    assert_eq!(tracker.record(shared).unwrap().transform.rotation, 90.0);
    assert_eq!(tracker.violations(), 0);

    let events = tracker.drain_events();
    assert_eq!(events.len(), 7);
    assert_eq!(events.last(), Some(&LifecycleEvent::Despawned { id: shared }));
}

#[test]
fn test_deactivating_old_chunk_releases_migrated_entity() {
    let mut tracker = EntityLifecycleTracker::new();
    let id = tracker.register(1, EntityTransform::at(Vec2::new(8.0, 8.0)), IVec2::ZERO);
    tracker.activate_chunk(IVec2::ZERO);
    assert!(tracker.live(id).is_some());

    // Walks into an inactive chunk; the count is untouched
    assert_eq!(tracker.migrate(id, Vec2::new(24.0, 8.0)), Some(IVec2::new(1, 0)));
    assert_eq!(tracker.ref_count(id), 1);
    assert_eq!(tracker.referencing_chunks(id), vec![IVec2::ZERO]);

    tracker.deactivate_chunk(IVec2::ZERO);
    assert_eq!(tracker.ref_count(id), 0);
    assert!(tracker.live(id).is_none());
    assert_eq!(tracker.record(id).unwrap().transform.position, Vec2::new(24.0, 8.0));

    // The new home behaves like any other chunk
    tracker.activate_chunk(IVec2::new(1, 0));
    assert_eq!(tracker.ref_count(id), 1);
    tracker.deactivate_chunk(IVec2::new(1, 0));
    assert_eq!(tracker.ref_count(id), 0);
    assert_eq!(tracker.live_count(), 0);
    assert_eq!(tracker.violations(), 0);
}

#[test]
fn test_random_activation_sequences_keep_counts_sane() {
    let chunks: Vec<IVec2> = (0..4)
        .flat_map(|x| (0..3).map(move |y| IVec2::new(x, y)))
        .collect();

    for seed in 0..16u64 {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let mut tracker = EntityLifecycleTracker::new();

        let mut ids = Vec::new();
        for _ in 0..24 {
            let home = chunks[rng.gen_range(0..chunks.len())];
            let position = (home * 16).as_vec2() + Vec2::splat(8.0);
            let id = tracker.register(rng.gen_range(1..4), EntityTransform::at(position), home);
            if rng.gen_bool(0.3) {
                tracker.associate(id, chunks[rng.gen_range(0..chunks.len())]);
            }
            ids.push(id);
        }

        for _ in 0..400 {
            let chunk = chunks[rng.gen_range(0..chunks.len())];
            let id = ids[rng.gen_range(0..ids.len())];
            match rng.gen_range(0..6) {
                0 | 1 => {
                    tracker.activate_chunk(chunk);
                }
                2 | 3 => {
                    tracker.deactivate_chunk(chunk);
                }
                4 => {
                    let jitter = Vec2::new(rng.gen_range(-20.0..20.0), rng.gen_range(-20.0..20.0));
                    let position = tracker.record(id).unwrap().transform.position + jitter;
                    tracker.migrate(id, position);
                }
                _ => {
                    // Unbalanced decrements must clamp, never wrap
                    let before = tracker.ref_count(id);
                    let after = tracker.decrement_activation_ref(id).unwrap();
                    assert_eq!(after, before.saturating_sub(1));
                }
            }
            assert_consistent(&tracker, &ids);
        }
    }
}

#[test]
fn test_generated_spawns_activate_with_their_chunk() {
    let generator = WorldGenerator::new(11);
    let mut store = ChunkStore::new();
    let mut tracker = EntityLifecycleTracker::new();

    // Walk the surface until a chunk proposes at least one entity
    let mut found = None;
    let surface_chunks = (0..64).flat_map(|x| [IVec2::new(x, 0), IVec2::new(x, -1)]);
    for coord in surface_chunks {
        let spawns = match store.ensure(coord, &generator).unwrap() {
            strata_core::world::Resolved::Generated(spawns) => spawns,
            strata_core::world::Resolved::Hit => Vec::new(),
        };
        for candidate in &spawns {
            tracker.register(
                candidate.entity_type,
                EntityTransform::from_candidate(candidate),
                coord,
            );
        }
        if !spawns.is_empty() {
            found = Some((coord, spawns.len()));
            break;
        }
    }

    let (coord, count) = found.expect("surface chunks should propose entities");
    assert_eq!(tracker.entities_in_chunk(coord).len(), count);
    assert_eq!(tracker.live_count(), 0);

    tracker.activate_chunk(coord);
    assert_eq!(tracker.live_count(), count);
    tracker.deactivate_chunk(coord);
    assert_eq!(tracker.live_count(), 0);
}
