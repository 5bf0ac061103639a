//! Performance benchmarks for the collection store.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use prism::{Filter, Patch, Sort, Store};
use serde_json::{json, Value};

fn seeded_store(size: usize) -> Store<Value> {
    let items: Vec<Value> = (0..size)
        .map(|i| json!({"id": i.to_string(), "v": (i * 31) % 1000, "group": i % 10}))
        .collect();
    Store::memory_with(items).unwrap()
}

/// Benchmark add throughput
fn bench_add(c: &mut Criterion) {
    let store: Store<Value> = Store::memory();
    let mut i = 0u64;

    c.bench_function("add_one", |b| {
        b.iter(|| {
            i += 1;
            black_box(store.add_one(json!({"id": i.to_string(), "v": i})).unwrap());
        });
    });
}

/// Benchmark view recomputation with varying store sizes
fn bench_view_fetch(c: &mut Criterion) {
    let mut group = c.benchmark_group("view_fetch");

    for size in [100, 1000, 10000] {
        group.bench_with_input(BenchmarkId::new("store_size", size), &size, |b, &size| {
            let store = seeded_store(size);
            let view = store.filter(Filter::gt("v", 500)).sort(Sort::by("v"));

            b.iter(|| {
                // force a recomputation each round
                store.put_patch("0", Patch::new().set("v", 1)).unwrap();
                black_box(view.fetch().unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark incremental tracking against cold recomputation
fn bench_tracking_vs_cold(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracking_vs_cold");

    for size in [1000, 10000] {
        group.bench_with_input(BenchmarkId::new("tracked", size), &size, |b, &size| {
            let store = seeded_store(size);
            let view = store
                .filter(Filter::gt("v", 500))
                .sort(Sort::by("v"))
                .track()
                .unwrap();
            let mut i = size as u64;

            b.iter(|| {
                i += 1;
                store
                    .add_one(json!({"id": i.to_string(), "v": (i * 31) % 1000}))
                    .unwrap();
                black_box(view.fetch().unwrap());
            });
        });

        group.bench_with_input(BenchmarkId::new("cold", size), &size, |b, &size| {
            let store = seeded_store(size);
            let view = store.filter(Filter::gt("v", 500)).sort(Sort::by("v"));
            let mut i = size as u64;

            b.iter(|| {
                i += 1;
                store
                    .add_one(json!({"id": i.to_string(), "v": (i * 31) % 1000}))
                    .unwrap();
                black_box(view.fetch().unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark diff computation over nested items
fn bench_diff(c: &mut Criterion) {
    let old = json!({
        "id": "x",
        "title": "before",
        "meta": {"tags": ["a", "b", "c"], "score": 10, "flags": {"hot": false}},
        "history": [1, 2, 3, 4, 5],
    });
    let new = json!({
        "id": "x",
        "title": "after",
        "meta": {"tags": ["a", "b", "d"], "score": 11, "flags": {"hot": true}},
        "history": [1, 2, 3, 4, 6],
    });

    c.bench_function("diff_nested", |b| {
        b.iter(|| {
            black_box(Patch::diff(&old, &new));
        });
    });
}

/// Benchmark patch application
fn bench_patch_apply(c: &mut Criterion) {
    let item = json!({"id": "x", "v": 1, "meta": {"score": 10}});
    let patch = Patch::new().set("v", 2).set("meta.score", 11);

    c.bench_function("patch_apply", |b| {
        b.iter(|| {
            black_box(patch.apply_value(&item).unwrap());
        });
    });
}

criterion_group!(
    benches,
    bench_add,
    bench_view_fetch,
    bench_tracking_vs_cold,
    bench_diff,
    bench_patch_apply,
);

criterion_main!(benches);
