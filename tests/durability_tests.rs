//! Black-box tests for the durability layer: log mirroring, snapshots,
//! restore, and compaction.

use std::path::PathBuf;

use rungkv::wal::{BincodeCodec, BlobCodec, LogReader, LogRecord, SnapshotWriter};
use rungkv::{ArenaOptions, ArenaStore, DurableStore, LogFlushStrategy, RungError, SkipList};
use tempfile::TempDir;

type Store = DurableStore<SkipList<String, u64>, BincodeCodec>;

fn open(log: &PathBuf) -> Store {
    DurableStore::open(
        SkipList::with_seed(16, 7),
        BincodeCodec,
        log,
        LogFlushStrategy::EveryWrite,
    )
    .unwrap()
}

fn key_bytes(key: &str) -> Vec<u8> {
    BincodeCodec.encode(&key.to_string()).unwrap()
}

fn value_bytes(value: u64) -> Vec<u8> {
    BincodeCodec.encode(&value).unwrap()
}

fn contents(store: &Store) -> Vec<(String, u64)> {
    store
        .store()
        .iter()
        .map(|(k, v)| (k.clone(), *v))
        .collect()
}

// =============================================================================
// Snapshot Round-Trip
// =============================================================================

#[test]
fn snapshot_then_restore_reproduces_contents_and_ranks() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("ops.log");
    let dump = dir.path().join("dump");

    let mut store = open(&log);
    for (key, value) in [("citrus", 3u64), ("apple", 1), ("banana", 2)] {
        store.insert(key.to_string(), value).unwrap();
    }
    store.snapshot(&dump).unwrap();

    let fresh_log = dir.path().join("fresh.log");
    let mut restored = open(&fresh_log);
    let summary = restored.restore(Some(&dump)).unwrap();

    assert_eq!(summary.snapshot_entries, 3);
    assert_eq!(summary.replayed, 0);
    assert_eq!(contents(&restored), contents(&store));
    for key in ["apple", "banana", "citrus"] {
        let a = store.lookup(&key.to_string()).unwrap();
        let b = restored.lookup(&key.to_string()).unwrap();
        assert_eq!(a.rank, b.rank);
        assert_eq!(a.value, b.value);
    }
}

// =============================================================================
// Log Replay
// =============================================================================

/// Replaying the full log from empty reproduces the same final state as
/// the live sequence of calls.
#[test]
fn log_replay_matches_the_live_sequence() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("ops.log");

    let mut live = open(&log);
    live.insert("a".to_string(), 1).unwrap();
    live.insert("b".to_string(), 2).unwrap();
    live.delete(&"a".to_string()).unwrap();
    live.insert("c".to_string(), 3).unwrap();
    live.insert("a".to_string(), 4).unwrap();
    live.delete(&"c".to_string()).unwrap();
    live.flush_log().unwrap();
    let expected = contents(&live);
    drop(live);

    let mut replayed = open(&log);
    let summary = replayed.restore(None).unwrap();
    assert_eq!(summary.replayed, 6);
    assert_eq!(contents(&replayed), expected);
}

#[test]
fn only_applied_operations_reach_the_log() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("ops.log");

    let mut store = open(&log);
    store.insert("a".to_string(), 1).unwrap();
    assert!(matches!(
        store.insert("a".to_string(), 2),
        Err(RungError::DuplicateKey)
    ));
    assert!(matches!(
        store.delete(&"missing".to_string()),
        Err(RungError::KeyNotFound)
    ));
    store.flush_log().unwrap();
    drop(store);

    let mut reader = LogReader::open(&log).unwrap();
    let mut count = 0;
    while reader.next_record().unwrap().is_some() {
        count += 1;
    }
    assert_eq!(count, 1);
}

// =============================================================================
// Crash Boundary
// =============================================================================

/// Snapshot at T=100 holding {a: 1}; log holds a stale delete at t=50 and
/// live inserts at t=150 and t=200. Restore must ignore the stale delete.
#[test]
fn stale_records_before_the_snapshot_are_skipped() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("ops.log");
    let dump = dir.path().join("dump");

    let mut writer = SnapshotWriter::create(&dump, 100).unwrap();
    writer.append(&key_bytes("a"), &value_bytes(1)).unwrap();
    writer.finish(1).unwrap();

    let mut raw = Vec::new();
    for record in [
        LogRecord::Delete {
            timestamp: 50,
            key: key_bytes("a"),
        },
        LogRecord::Insert {
            timestamp: 150,
            key: key_bytes("b"),
            value: value_bytes(2),
        },
        LogRecord::Insert {
            timestamp: 200,
            key: key_bytes("c"),
            value: value_bytes(3),
        },
    ] {
        record.encode(&mut raw);
    }
    std::fs::write(&log, &raw).unwrap();

    let mut store = open(&log);
    let summary = store.restore(Some(&dump)).unwrap();

    assert_eq!(summary.snapshot_timestamp, 100);
    assert_eq!(summary.stale, 1);
    assert_eq!(summary.replayed, 2);
    assert_eq!(
        contents(&store),
        vec![
            ("a".to_string(), 1),
            ("b".to_string(), 2),
            ("c".to_string(), 3)
        ]
    );

    // Compaction dropped the provably-applied prefix: only the two live
    // records remain on disk.
    let mut reader = LogReader::open(&log).unwrap();
    let mut stamps = Vec::new();
    while let Some(record) = reader.next_record().unwrap() {
        stamps.push(record.timestamp());
    }
    assert_eq!(stamps, vec![150, 200]);
}

#[test]
fn restore_is_repeatable_after_compaction() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("ops.log");

    let mut raw = Vec::new();
    LogRecord::Insert {
        timestamp: 10,
        key: key_bytes("k"),
        value: value_bytes(5),
    }
    .encode(&mut raw);
    std::fs::write(&log, &raw).unwrap();

    let mut store = open(&log);
    store.restore(None).unwrap();
    let first = contents(&store);

    let summary = store.restore(None).unwrap();
    assert_eq!(summary.replayed, 1);
    assert_eq!(contents(&store), first);
}

// =============================================================================
// Compaction Bounds
// =============================================================================

#[test]
fn all_stale_log_is_truncated_to_empty() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("ops.log");
    let dump = dir.path().join("dump");

    let writer = SnapshotWriter::create(&dump, 500).unwrap();
    writer.finish(0).unwrap();

    let mut raw = Vec::new();
    LogRecord::Insert {
        timestamp: 100,
        key: key_bytes("old"),
        value: value_bytes(1),
    }
    .encode(&mut raw);
    std::fs::write(&log, &raw).unwrap();

    let mut store = open(&log);
    let summary = store.restore(Some(&dump)).unwrap();
    assert_eq!(summary.stale, 1);
    assert_eq!(summary.replayed, 0);
    assert!(store.is_empty());
    assert_eq!(std::fs::metadata(&log).unwrap().len(), 0);
}

#[test]
fn truncated_trailing_record_is_dropped_by_compaction() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("ops.log");

    let mut whole = Vec::new();
    LogRecord::Insert {
        timestamp: 10,
        key: key_bytes("a"),
        value: value_bytes(1),
    }
    .encode(&mut whole);
    let complete_len = whole.len() as u64;

    // A crashed append: timestamp and tag, then silence.
    whole.extend_from_slice(&20u64.to_le_bytes());
    whole.extend_from_slice(&2u32.to_le_bytes());
    std::fs::write(&log, &whole).unwrap();

    let mut store = open(&log);
    let summary = store.restore(None).unwrap();
    assert_eq!(summary.replayed, 1);
    assert_eq!(contents(&store), vec![("a".to_string(), 1)]);
    assert_eq!(std::fs::metadata(&log).unwrap().len(), complete_len);
}

#[test]
fn unknown_tag_aborts_restore_and_keeps_the_log() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("ops.log");

    let mut raw = Vec::new();
    LogRecord::Insert {
        timestamp: 10,
        key: key_bytes("a"),
        value: value_bytes(1),
    }
    .encode(&mut raw);
    raw.extend_from_slice(&20u64.to_le_bytes());
    raw.extend_from_slice(&99u32.to_le_bytes()); // not a valid tag
    raw.extend_from_slice(&[0u8; 16]);
    let full_len = raw.len() as u64;
    std::fs::write(&log, &raw).unwrap();

    let mut store = open(&log);
    assert!(matches!(store.restore(None), Err(RungError::Format(_))));
    // Everything before the bad record was replayed and nothing was
    // compacted away.
    assert_eq!(contents(&store), vec![("a".to_string(), 1)]);
    assert_eq!(std::fs::metadata(&log).unwrap().len(), full_len);
}

// =============================================================================
// Replay Mismatches
// =============================================================================

#[test]
fn replay_mismatches_warn_but_do_not_abort() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("ops.log");

    let mut raw = Vec::new();
    for record in [
        LogRecord::Delete {
            timestamp: 10,
            key: key_bytes("ghost"),
        },
        LogRecord::Insert {
            timestamp: 20,
            key: key_bytes("real"),
            value: value_bytes(7),
        },
        // Duplicate of a key the same replay already inserted.
        LogRecord::Insert {
            timestamp: 30,
            key: key_bytes("real"),
            value: value_bytes(8),
        },
    ] {
        record.encode(&mut raw);
    }
    std::fs::write(&log, &raw).unwrap();

    let mut store = open(&log);
    let summary = store.restore(None).unwrap();
    assert_eq!(summary.replayed, 3);
    assert_eq!(contents(&store), vec![("real".to_string(), 7)]);
}

// =============================================================================
// Arena Backing
// =============================================================================

/// The durability wrapper is generic over the backing store; run the whole
/// snapshot/restore cycle over a mapped arena, including an in-place clear
/// during restore and a region growth afterwards.
#[test]
fn arena_backed_store_survives_restore_and_keeps_growing() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("ops.log");
    let dump = dir.path().join("dump");

    let arena = ArenaStore::<u64, u64>::attach(
        dir.path().join("region"),
        ArenaOptions {
            initial_capacity: 8,
            level_capacity: 8,
            level_seed: Some(21),
            ..ArenaOptions::default()
        },
    )
    .unwrap();
    let mut store =
        DurableStore::open(arena, BincodeCodec, &log, LogFlushStrategy::EveryWrite).unwrap();

    for k in [40u64, 10, 30, 20, 50, 60] {
        store.insert(k, k * 100).unwrap();
    }
    store.delete(&30).unwrap();
    store.snapshot(&dump).unwrap();

    // Everything in the log predates the snapshot, so restore seeds the
    // cleared region from the snapshot alone.
    let summary = store.restore(Some(&dump)).unwrap();
    assert_eq!(summary.snapshot_entries, 5);
    assert_eq!(summary.stale, 7);
    assert_eq!(summary.replayed, 0);
    for (position, key) in [10u64, 20, 40, 50, 60].into_iter().enumerate() {
        let found = store.lookup(&key).unwrap();
        assert_eq!(found.value, key * 100);
        assert_eq!(found.rank, position as u64 + 1);
    }

    // Fill past the formatted capacity; the region doubles under the
    // wrapper without disturbing order.
    for k in [5u64, 15, 25, 35, 45, 55, 65, 75, 85] {
        store.insert(k, k * 100).unwrap();
    }
    assert_eq!(store.len(), 14);
    assert_eq!(store.store().capacity(), 16);
    assert_eq!(store.lookup(&5).unwrap().rank, 1);
    assert_eq!(store.lookup(&85).unwrap().rank, 14);
}

// =============================================================================
// Restore Baseline
// =============================================================================

#[test]
fn restore_clears_whatever_was_live_before() {
    let dir = TempDir::new().unwrap();
    let dump = dir.path().join("dump");

    let mut source = open(&dir.path().join("source.log"));
    source.insert("pre".to_string(), 1).unwrap();
    source.snapshot(&dump).unwrap();

    // A store with unrelated live contents and an empty log of its own.
    let mut target = open(&dir.path().join("target.log"));
    target.insert("junk".to_string(), 99).unwrap();
    std::fs::write(dir.path().join("target.log"), []).unwrap();

    let summary = target.restore(Some(&dump)).unwrap();
    assert_eq!(summary.snapshot_entries, 1);
    assert_eq!(summary.replayed, 0);
    assert_eq!(contents(&target), vec![("pre".to_string(), 1)]);
}
