//! Black-box tests for the shared-memory arena store.

use std::path::PathBuf;

use rungkv::{ArenaOptions, ArenaStore, Blob, RungError};
use tempfile::TempDir;

fn region(dir: &TempDir) -> PathBuf {
    dir.path().join("region")
}

fn options(capacity: u64) -> ArenaOptions {
    ArenaOptions {
        resume: true,
        level_capacity: 8,
        initial_capacity: capacity,
        level_seed: Some(21),
        delete_region_on_close: false,
    }
}

// =============================================================================
// Core Operations
// =============================================================================

#[test]
fn insert_lookup_delete_with_ranks() {
    let dir = TempDir::new().unwrap();
    let mut store: ArenaStore<u64, u64> =
        ArenaStore::attach(region(&dir), options(16)).unwrap();

    for key in [30u64, 10, 20] {
        store.insert(key, key * 100).unwrap();
    }
    assert_eq!(store.len(), 3);

    let found = store.lookup(&20).unwrap();
    assert_eq!(found.value, 2000);
    assert_eq!(found.rank, 2);
    assert_eq!(store.lookup(&10).unwrap().rank, 1);
    assert_eq!(store.lookup(&30).unwrap().rank, 3);

    store.delete(&10).unwrap();
    assert_eq!(store.lookup(&20).unwrap().rank, 1);
    assert!(matches!(store.lookup(&10), Err(RungError::KeyNotFound)));
}

#[test]
fn duplicate_insert_aborts_before_mutation() {
    let dir = TempDir::new().unwrap();
    let mut store: ArenaStore<u64, u64> =
        ArenaStore::attach(region(&dir), options(16)).unwrap();
    store.insert(1, 10).unwrap();

    let free_before = store.free_slots();
    assert!(matches!(store.insert(1, 99), Err(RungError::DuplicateKey)));
    assert_eq!(store.len(), 1);
    assert_eq!(store.free_slots(), free_before);
    assert_eq!(store.lookup(&1).unwrap().value, 10);
}

#[test]
fn empty_store_misses_everything() {
    let dir = TempDir::new().unwrap();
    let mut store: ArenaStore<u64, u64> =
        ArenaStore::attach(region(&dir), options(4)).unwrap();
    assert!(store.is_empty());
    assert!(matches!(store.lookup(&1), Err(RungError::KeyNotFound)));
    assert!(matches!(store.delete(&1), Err(RungError::KeyNotFound)));
}

#[test]
fn blob_keys_and_values() {
    let dir = TempDir::new().unwrap();
    let mut store: ArenaStore<Blob, Blob> =
        ArenaStore::attach(region(&dir), options(8)).unwrap();

    store
        .insert(
            Blob::new(b"answer").unwrap(),
            Blob::new(b"forty-two").unwrap(),
        )
        .unwrap();
    store
        .insert(Blob::new(b"alpha").unwrap(), Blob::new(b"a").unwrap())
        .unwrap();

    let found = store.lookup(&Blob::new(b"answer").unwrap()).unwrap();
    assert_eq!(found.value.payload(), b"forty-two");
    // Lexicographic order: "alpha" < "answer".
    assert_eq!(found.rank, 2);
}

// =============================================================================
// Slot Allocator
// =============================================================================

/// Deleting the middle of three keys and inserting a fourth reuses the
/// freed slot without growing the region.
#[test]
fn freed_slots_are_reused_before_growth() {
    let dir = TempDir::new().unwrap();
    let mut store: ArenaStore<u64, u64> =
        ArenaStore::attach(region(&dir), options(8)).unwrap();

    for key in [1u64, 2, 3] {
        store.insert(key, key).unwrap();
    }
    let capacity = store.capacity();
    let free_before = store.free_slots();

    store.delete(&2).unwrap();
    assert_eq!(store.free_slots(), free_before + 1);

    store.insert(4, 4).unwrap();
    assert_eq!(store.free_slots(), free_before);
    assert_eq!(store.capacity(), capacity);

    // The survivors kept their order.
    assert_eq!(store.lookup(&1).unwrap().rank, 1);
    assert_eq!(store.lookup(&3).unwrap().rank, 2);
    assert_eq!(store.lookup(&4).unwrap().rank, 3);
}

// =============================================================================
// Region Growth
// =============================================================================

/// Inserting past a capacity-1 region grows it (doubling each time) while
/// preserving every key and rank.
#[test]
fn growth_from_capacity_one_preserves_contents() {
    let dir = TempDir::new().unwrap();
    let mut store: ArenaStore<u64, u64> =
        ArenaStore::attach(region(&dir), options(1)).unwrap();
    assert_eq!(store.capacity(), 1);

    for key in 0..5u64 {
        store.insert(key, key + 1000).unwrap();
    }

    assert_eq!(store.len(), 5);
    assert_eq!(store.capacity(), 8); // 1 -> 2 -> 4 -> 8
    for key in 0..5u64 {
        let found = store.lookup(&key).unwrap();
        assert_eq!(found.value, key + 1000);
        assert_eq!(found.rank, key + 1);
    }
}

#[test]
fn growth_keeps_free_slot_accounting_consistent() {
    let dir = TempDir::new().unwrap();
    let mut store: ArenaStore<u64, u64> =
        ArenaStore::attach(region(&dir), options(2)).unwrap();

    for key in 0..3u64 {
        store.insert(key, key).unwrap();
    }
    assert_eq!(store.capacity(), 4);
    assert_eq!(store.free_slots(), 1);

    store.delete(&1).unwrap();
    store.delete(&2).unwrap();
    assert_eq!(store.free_slots(), 3);
    assert_eq!(store.lookup(&0).unwrap().rank, 1);
}

// =============================================================================
// Attach / Resume / Teardown
// =============================================================================

#[test]
fn resume_preserves_contents_and_ranks() {
    let dir = TempDir::new().unwrap();
    let path = region(&dir);

    {
        let mut store: ArenaStore<u64, u64> =
            ArenaStore::attach(&path, options(16)).unwrap();
        for key in [5u64, 1, 9] {
            store.insert(key, key * 7).unwrap();
        }
    }

    let store: ArenaStore<u64, u64> = ArenaStore::attach(&path, options(16)).unwrap();
    assert_eq!(store.len(), 3);
    assert_eq!(store.lookup(&5).unwrap().value, 35);
    assert_eq!(store.lookup(&5).unwrap().rank, 2);
    assert_eq!(store.lookup(&9).unwrap().rank, 3);
}

#[test]
fn resume_false_always_reformats() {
    let dir = TempDir::new().unwrap();
    let path = region(&dir);

    {
        let mut store: ArenaStore<u64, u64> =
            ArenaStore::attach(&path, options(16)).unwrap();
        store.insert(1, 1).unwrap();
    }

    let store: ArenaStore<u64, u64> = ArenaStore::attach(
        &path,
        ArenaOptions {
            resume: false,
            ..options(16)
        },
    )
    .unwrap();
    assert!(store.is_empty());
}

#[test]
fn corrupted_integrity_tag_reformats_on_attach() {
    let dir = TempDir::new().unwrap();
    let path = region(&dir);

    {
        let mut store: ArenaStore<u64, u64> =
            ArenaStore::attach(&path, options(16)).unwrap();
        store.insert(1, 1).unwrap();
    }

    // Foreign bytes where the magic should be.
    let mut raw = std::fs::read(&path).unwrap();
    raw[..8].copy_from_slice(b"BADMAGIC");
    std::fs::write(&path, &raw).unwrap();

    let store: ArenaStore<u64, u64> = ArenaStore::attach(&path, options(16)).unwrap();
    assert!(store.is_empty());
    assert_eq!(store.capacity(), 16);
}

#[test]
fn teardown_policy_controls_the_region_file() {
    let dir = TempDir::new().unwrap();

    let keep = region(&dir);
    {
        let _store: ArenaStore<u64, u64> = ArenaStore::attach(&keep, options(4)).unwrap();
    }
    assert!(keep.exists());

    let discard = dir.path().join("discard");
    {
        let mut store: ArenaStore<u64, u64> =
            ArenaStore::attach(&discard, options(4)).unwrap();
        store.set_teardown_policy(true);
    }
    assert!(!discard.exists());
}

#[test]
fn rejects_zero_capacity_and_zero_levels() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        ArenaStore::<u64, u64>::attach(
            region(&dir),
            ArenaOptions {
                initial_capacity: 0,
                ..options(1)
            }
        ),
        Err(RungError::Config(_))
    ));
    assert!(matches!(
        ArenaStore::<u64, u64>::attach(
            region(&dir),
            ArenaOptions {
                level_capacity: 0,
                ..options(1)
            }
        ),
        Err(RungError::Config(_))
    ));
}

// =============================================================================
// Model Check
// =============================================================================

#[test]
fn random_op_mix_matches_a_model() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeMap;

    let dir = TempDir::new().unwrap();
    let mut store: ArenaStore<u64, u64> =
        ArenaStore::attach(region(&dir), options(4)).unwrap();
    let mut model: BTreeMap<u64, u64> = BTreeMap::new();
    let mut rng = StdRng::seed_from_u64(0xBEEF);

    for _ in 0..1_000 {
        let key = rng.gen_range(0..200u64);
        if rng.gen_bool(0.65) {
            let value = rng.gen();
            match (store.insert(key, value), model.contains_key(&key)) {
                (Ok(()), false) => {
                    model.insert(key, value);
                }
                (Err(RungError::DuplicateKey), true) => {}
                (out, _) => panic!("insert disagrees with model: {out:?}"),
            }
        } else {
            assert_eq!(store.delete(&key).is_ok(), model.remove(&key).is_some());
        }
    }

    assert_eq!(store.len(), model.len() as u64);
    for (expected_rank, (key, value)) in model.iter().enumerate() {
        let found = store.lookup(key).unwrap();
        assert_eq!(found.value, *value);
        assert_eq!(found.rank, expected_rank as u64 + 1);
    }
}
