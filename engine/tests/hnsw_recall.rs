//! Recall and persistence tests for the HNSW index
//!
//! The flat index is the exact-search oracle: on uniform-random vectors the
//! HNSW top-5 must share at least 4 of 5 IDs with the flat top-5 for at
//! least 95% of queries. Persistence must round-trip search results
//! ID-for-ID.

use kivid_engine::{
    DistanceMetric, EmbeddingProvider, FlatIndex, HashEmbedding, HnswIndex, HnswParams,
    KernelFactory, VectorIndex,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DIMENSION: usize = 64;

fn random_unit_vector(rng: &mut StdRng) -> Vec<f32> {
    let mut v: Vec<f32> = (0..DIMENSION).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}

fn build_indexes(vectors: &[Vec<f32>]) -> (HnswIndex, FlatIndex) {
    let params = HnswParams {
        m: 16,
        ef_construction: 200,
        seed: 7,
        ..Default::default()
    };
    let mut hnsw = HnswIndex::new(KernelFactory::new(DistanceMetric::Cosine, DIMENSION), params);
    let mut flat = FlatIndex::new(KernelFactory::new(DistanceMetric::Cosine, DIMENSION));

    for (id, vector) in vectors.iter().enumerate() {
        hnsw.add(id as u64, vector).unwrap();
        flat.add(id as u64, vector).unwrap();
    }

    (hnsw, flat)
}

#[test]
fn test_recall_against_flat_oracle() {
    let mut rng = StdRng::seed_from_u64(1234);
    let vectors: Vec<Vec<f32>> = (0..500).map(|_| random_unit_vector(&mut rng)).collect();
    let (hnsw, flat) = build_indexes(&vectors);

    let k = 5;
    let query_count = 100;
    let mut good_queries = 0;

    for _ in 0..query_count {
        let query = random_unit_vector(&mut rng);

        let hnsw_ids: Vec<u64> = hnsw.search(&query, k).unwrap().iter().map(|r| r.id).collect();
        let flat_ids: Vec<u64> = flat.search(&query, k).unwrap().iter().map(|r| r.id).collect();

        assert_eq!(hnsw_ids.len(), k);
        assert_eq!(flat_ids.len(), k);

        let overlap = hnsw_ids.iter().filter(|id| flat_ids.contains(id)).count();
        if overlap >= 4 {
            good_queries += 1;
        }
    }

    let fraction = good_queries as f64 / query_count as f64;
    assert!(
        fraction >= 0.95,
        "only {}% of queries reached 4/5 overlap with the exact top-5",
        fraction * 100.0
    );
}

#[test]
fn test_results_sorted_by_descending_similarity() {
    let mut rng = StdRng::seed_from_u64(99);
    let vectors: Vec<Vec<f32>> = (0..200).map(|_| random_unit_vector(&mut rng)).collect();
    let (hnsw, _) = build_indexes(&vectors);

    let query = random_unit_vector(&mut rng);
    let results = hnsw.search(&query, 10).unwrap();

    assert!(results.len() <= 10);
    for pair in results.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity);
        assert!(pair[0].distance <= pair[1].distance);
    }
}

#[test]
fn test_self_query_returns_exact_document() {
    // 100 documents through the hash embedder; querying with document 0's
    // own embedding must return it with near-perfect similarity.
    let embedder = HashEmbedding::new(DIMENSION);
    let params = HnswParams::default();
    let mut index = HnswIndex::new(KernelFactory::new(DistanceMetric::Cosine, DIMENSION), params);

    for i in 0..100u64 {
        let embedding = embedder.embed(&format!("doc {}", i)).unwrap();
        index.add(i, &embedding).unwrap();
    }

    let query = embedder.embed("doc 0").unwrap();
    let results = index.search(&query, 1).unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, 0);
    assert!(results[0].similarity >= 0.9);
}

#[test]
fn test_flat_index_small_corpus_top_k() {
    let embedder = HashEmbedding::new(DIMENSION);
    let mut flat = FlatIndex::new(KernelFactory::new(DistanceMetric::Cosine, DIMENSION));

    for (id, text) in ["apple", "banana", "carrot", "dog"].iter().enumerate() {
        flat.add(id as u64, &embedder.embed(text).unwrap()).unwrap();
    }

    let query = embedder.embed("fruit").unwrap();
    let results = flat.search(&query, 2).unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.id <= 3));
    assert!(results[0].similarity >= results[1].similarity);
}

#[test]
fn test_save_load_preserves_search_results() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("index.hnsw");

    let mut rng = StdRng::seed_from_u64(4242);
    let vectors: Vec<Vec<f32>> = (0..100).map(|_| random_unit_vector(&mut rng)).collect();
    let (hnsw, _) = build_indexes(&vectors);

    hnsw.save(&path).unwrap();

    let mut restored = HnswIndex::new(
        KernelFactory::new(DistanceMetric::Cosine, DIMENSION),
        HnswParams::default(),
    );
    restored.load(&path).unwrap();

    assert_eq!(restored.len(), 100);
    assert_eq!(restored.entry_point(), hnsw.entry_point());

    for _ in 0..10 {
        let query = random_unit_vector(&mut rng);
        let before: Vec<u64> = hnsw.search(&query, 5).unwrap().iter().map(|r| r.id).collect();
        let after: Vec<u64> = restored.search(&query, 5).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(before, after, "search results changed across save/load");
    }
}

#[test]
fn test_wrong_dimension_leaves_size_unchanged() {
    let mut rng = StdRng::seed_from_u64(5);
    let vectors: Vec<Vec<f32>> = (0..10).map(|_| random_unit_vector(&mut rng)).collect();
    let (mut hnsw, mut flat) = build_indexes(&vectors);

    assert!(hnsw.add(999, &[0.5; 17]).is_err());
    assert!(flat.add(999, &[0.5; 17]).is_err());
    assert_eq!(hnsw.len(), 10);
    assert_eq!(flat.len(), 10);
}

#[test]
fn test_add_batch_matches_sequential_ascending_adds() {
    let mut rng = StdRng::seed_from_u64(88);
    let vectors: Vec<Vec<f32>> = (0..50).map(|_| random_unit_vector(&mut rng)).collect();

    let params = HnswParams {
        seed: 21,
        ..Default::default()
    };

    // Batch insertion with shuffled IDs must process in ascending-ID order,
    // matching a plain ascending sequence of adds.
    let mut batched = HnswIndex::new(
        KernelFactory::new(DistanceMetric::Cosine, DIMENSION),
        params.clone(),
    );
    let mut entries: Vec<(u64, Vec<f32>)> = vectors
        .iter()
        .enumerate()
        .map(|(id, v)| (id as u64, v.clone()))
        .collect();
    entries.reverse();
    batched.add_batch(entries).unwrap();

    let mut sequential = HnswIndex::new(
        KernelFactory::new(DistanceMetric::Cosine, DIMENSION),
        params,
    );
    for (id, vector) in vectors.iter().enumerate() {
        sequential.add(id as u64, vector).unwrap();
    }

    assert_eq!(batched.entry_point(), sequential.entry_point());
    let query = random_unit_vector(&mut rng);
    assert_eq!(
        batched.search(&query, 5).unwrap(),
        sequential.search(&query, 5).unwrap()
    );
}
