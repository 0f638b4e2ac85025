use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use blockindex::index::btree::{BPlusTree, Comparison, IndexDescriptor, Key, KeyType};
use blockindex::storage::MemoryBlockStore;

const KEYS: i32 = 10_000;

fn build(rank: usize, keys: i32) -> BPlusTree<MemoryBlockStore> {
    let descriptor = IndexDescriptor::new("bench", KeyType::Int, 4)
        .unwrap()
        .with_rank(rank)
        .unwrap();
    let mut tree = BPlusTree::new(descriptor, MemoryBlockStore::new()).unwrap();
    for k in 0..keys {
        // Spread keys so inserts do not only hit the rightmost leaf.
        let key = (k * 7919) % keys;
        tree.insert(&Key::int(key), (key / 1000) as u32, (key % 1000) as u32)
            .unwrap();
    }
    tree
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    for rank in [2usize, 16, 254] {
        group.bench_with_input(BenchmarkId::from_parameter(rank), &rank, |b, &rank| {
            b.iter(|| black_box(build(rank, KEYS)));
        });
    }
    group.finish();
}

fn bench_point_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("point_query");
    for rank in [2usize, 16, 254] {
        let mut tree = build(rank, KEYS);
        let mut k = 0;
        group.bench_with_input(BenchmarkId::from_parameter(rank), &rank, |b, _| {
            b.iter(|| {
                k = (k + 7) % KEYS;
                black_box(tree.point_query(&Key::int(k)).unwrap())
            });
        });
    }
    group.finish();
}

fn bench_range_scan(c: &mut Criterion) {
    let mut tree = build(16, KEYS);
    let mut group = c.benchmark_group("range_scan");
    for (name, op) in [("gt_tail", Comparison::Gt), ("lt_head", Comparison::Lt)] {
        group.bench_function(name, |b| {
            b.iter(|| black_box(tree.range_query(&Key::int(KEYS - 500), op).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_point_query, bench_range_scan);
criterion_main!(benches);
