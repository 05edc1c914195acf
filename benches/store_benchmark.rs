use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use fragsort::protocol::Record;
use fragsort::store::MergeStore;

fn generate_records(n: u64, interleave: u64) -> Vec<Record> {
    // Indices arrive the way several workers interleave them: a stride per worker
    let mut out = Vec::with_capacity(n as usize);
    for lane in 0..interleave {
        let mut i = lane;
        while i < n {
            let mut payload = Vec::new();
            Record::encode(i, b"the quick brown fox jumps over the lazy dog", &mut payload);
            out.push(Record::new(i, payload));
            i += interleave;
        }
    }
    out
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_insert");
    for n in [10_000u64, 100_000, 1_000_000] {
        let records = generate_records(n, 4);
        group.bench_with_input(BenchmarkId::new("interleaved", n), &records, |b, records| {
            b.iter(|| {
                let mut store = MergeStore::new();
                for r in records.iter().cloned() {
                    let _ = store.insert(r);
                }
                black_box(store.len())
            })
        });
    }
    group.finish();
}

fn bench_drain(c: &mut Criterion) {
    let records = generate_records(100_000, 4);
    c.bench_function("store_drain_100k", |b| {
        b.iter_batched(
            || {
                let mut store = MergeStore::new();
                for r in records.iter().cloned() {
                    let _ = store.insert(r);
                }
                store
            },
            |mut store| black_box(store.drain().count()),
            criterion::BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_insert, bench_drain);
criterion_main!(benches);
