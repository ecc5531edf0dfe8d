//! HNSW k-NN benchmarks
//!
//! Run with: cargo bench --bench hnsw_knn

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kivid_engine::{DistanceMetric, FlatIndex, HnswIndex, HnswParams, KernelFactory, VectorIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DIMENSION: usize = 128;

/// Generate random normalized vectors for benchmarking
fn generate_random_vectors(count: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let mut v: Vec<f32> = (0..DIMENSION).map(|_| rng.gen_range(-1.0..1.0)).collect();
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            v.iter_mut().for_each(|x| *x /= norm);
            v
        })
        .collect()
}

fn build_hnsw(vectors: &[Vec<f32>]) -> HnswIndex {
    let mut index = HnswIndex::new(
        KernelFactory::new(DistanceMetric::Cosine, DIMENSION),
        HnswParams::default(),
    );
    for (id, v) in vectors.iter().enumerate() {
        index.add(id as u64, v).unwrap();
    }
    index
}

/// Benchmark HNSW insertion throughput
fn bench_hnsw_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("hnsw_insert");

    for size in [1_000, 5_000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let vectors = generate_random_vectors(size, 7);

            b.iter(|| {
                let index = build_hnsw(&vectors);
                black_box(index);
            });
        });
    }

    group.finish();
}

/// Benchmark HNSW search latency against the flat baseline
fn bench_search_hnsw_vs_flat(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_k10");

    for size in [1_000, 10_000] {
        let vectors = generate_random_vectors(size, 11);
        let hnsw = build_hnsw(&vectors);

        let mut flat = FlatIndex::new(KernelFactory::new(DistanceMetric::Cosine, DIMENSION));
        for (id, v) in vectors.iter().enumerate() {
            flat.add(id as u64, v).unwrap();
        }

        let queries = generate_random_vectors(64, 13);

        let mut cursor = 0usize;
        group.bench_with_input(BenchmarkId::new("hnsw", size), &size, |b, _| {
            b.iter(|| {
                let query = &queries[cursor % queries.len()];
                cursor += 1;
                black_box(hnsw.search(query, 10).unwrap());
            });
        });

        let mut cursor = 0usize;
        group.bench_with_input(BenchmarkId::new("flat", size), &size, |b, _| {
            b.iter(|| {
                let query = &queries[cursor % queries.len()];
                cursor += 1;
                black_box(flat.search(query, 10).unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_hnsw_insert, bench_search_hnsw_vs_flat);
criterion_main!(benches);
