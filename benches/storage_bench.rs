//! Benchmarks for the heap skip list and the shared-memory arena.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tempfile::TempDir;

use rungkv::arena::{ArenaOptions, ArenaStore};
use rungkv::blob::Blob;
use rungkv::skiplist::SkipList;

const N: u64 = 10_000;

fn shuffled_keys(n: u64) -> Vec<u64> {
    let mut keys: Vec<u64> = (0..n).collect();
    keys.shuffle(&mut StdRng::seed_from_u64(7));
    keys
}

fn skiplist_benchmarks(c: &mut Criterion) {
    let keys = shuffled_keys(N);

    let mut group = c.benchmark_group("skiplist");
    group.bench_function("insert_10k_random", |b| {
        b.iter_batched(
            || SkipList::<u64, u64>::with_seed(32, 21),
            |mut list| {
                for &k in &keys {
                    list.insert(k, k).unwrap();
                }
                list
            },
            BatchSize::LargeInput,
        );
    });

    let mut list = SkipList::<u64, u64>::with_seed(32, 21);
    for &k in &keys {
        list.insert(k, k).unwrap();
    }
    group.bench_function("lookup_10k_random", |b| {
        b.iter(|| {
            for &k in &keys {
                black_box(list.lookup(&k).unwrap().rank);
            }
        });
    });
    group.finish();
}

fn arena_benchmarks(c: &mut Criterion) {
    let keys = shuffled_keys(N);
    let blobs: Vec<Blob> = keys
        .iter()
        .map(|k| Blob::new(format!("{k:08}").as_bytes()).unwrap())
        .collect();
    let dir = TempDir::new().unwrap();
    let options = ArenaOptions {
        initial_capacity: N,
        level_seed: Some(21),
        delete_region_on_close: true,
        ..ArenaOptions::default()
    };

    let mut group = c.benchmark_group("arena");
    group.sample_size(10);
    group.bench_function("insert_10k_random", |b| {
        let mut run = 0u32;
        b.iter_batched(
            || {
                run += 1;
                let path = dir.path().join(format!("bench-{run}"));
                ArenaStore::<Blob, Blob>::attach(path, options.clone()).unwrap()
            },
            |mut store| {
                for blob in &blobs {
                    store.insert(blob.clone(), blob.clone()).unwrap();
                }
                store
            },
            BatchSize::PerIteration,
        );
    });

    let mut store =
        ArenaStore::<Blob, Blob>::attach(dir.path().join("bench-read"), options).unwrap();
    for blob in &blobs {
        store.insert(blob.clone(), blob.clone()).unwrap();
    }
    group.bench_function("lookup_10k_random", |b| {
        b.iter(|| {
            for blob in &blobs {
                black_box(store.lookup(blob).unwrap().rank);
            }
        });
    });
    group.finish();
}

criterion_group!(benches, skiplist_benchmarks, arena_benchmarks);
criterion_main!(benches);
