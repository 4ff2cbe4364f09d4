//! Lookup benchmarks for coldmap
//!
//! These measure the hot path a host application lives on: the stable
//! hash, point lookups that hit, and point lookups that miss.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box as hint_black_box;

use coldmap::{stable_hash, BucketLayout, ColdMap, ColdMapBuilder};

fn bench_stable_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("stable_hash");

    let keys: Vec<(&str, Vec<u8>)> = vec![
        ("empty", Vec::new()),
        ("short", b"word".to_vec()),
        ("medium", vec![b'k'; 64]),
        ("long", vec![b'k'; 1024]),
    ];

    for (name, key) in keys {
        group.bench_with_input(BenchmarkId::new("hash", name), &key, |b, key| {
            b.iter(|| hint_black_box(stable_hash(black_box(key))));
        });
    }

    group.finish();
}

fn build_map(dir: &tempfile::TempDir, layout: BucketLayout, entries: u32) -> ColdMap {
    let path = dir.path().join(format!("bench-{entries}.leda"));
    let mut builder = ColdMapBuilder::with_layout(layout);
    for i in 0..entries {
        builder.insert(format!("key-{i}"), format!("value-{i}"));
    }
    builder.write_to_path(&path).unwrap();
    let map = ColdMap::open_with_layout(&path, layout).unwrap();
    map.prefetch();
    map
}

fn bench_get_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_hit");
    let dir = tempfile::tempdir().unwrap();

    for entries in [100u32, 10_000, 100_000] {
        let map = build_map(&dir, BucketLayout::Combined, entries);
        let keys: Vec<Vec<u8>> = (0..entries)
            .step_by((entries / 100).max(1) as usize)
            .map(|i| format!("key-{i}").into_bytes())
            .collect();

        group.bench_with_input(BenchmarkId::new("entries", entries), &keys, |b, keys| {
            let mut i = 0;
            b.iter(|| {
                let key = &keys[i % keys.len()];
                i += 1;
                hint_black_box(map.get(black_box(key)).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_get_miss(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_miss");
    let dir = tempfile::tempdir().unwrap();
    let map = build_map(&dir, BucketLayout::Combined, 10_000);

    group.bench_function("absent_key", |b| {
        b.iter(|| hint_black_box(map.get(black_box(b"no-such-key")).unwrap()));
    });

    group.finish();
}

fn bench_layouts(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let dir = tempfile::tempdir().unwrap();

    for (name, layout) in [
        ("combined", BucketLayout::Combined),
        ("split", BucketLayout::Split),
    ] {
        let map = build_map(&dir, layout, 10_000);
        group.bench_function(BenchmarkId::new("get", name), |b| {
            b.iter(|| hint_black_box(map.get(black_box(b"key-5000")).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_stable_hash,
    bench_get_hit,
    bench_get_miss,
    bench_layouts
);
criterion_main!(benches);
