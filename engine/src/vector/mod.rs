//! Vector search: similarity kernels, dense storage, and the two indexes
//!
//! The HNSW index provides approximate k-NN in logarithmic time; the flat
//! index is the exhaustive-scan baseline sharing the same surface. Both own
//! their vectors outright and are single-threaded values with no interior
//! locking.

pub mod distance;
pub mod flat;
pub mod hnsw;
pub mod storage;

pub use distance::{KernelFactory, SimilarityKernel};
pub use flat::FlatIndex;
pub use hnsw::{HnswIndex, HnswParams};
pub use storage::VectorStorage;

use anyhow::Result;
use std::path::Path;

/// A scored search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Caller-assigned vector ID
    pub id: u64,
    /// Kernel similarity, higher is closer
    pub similarity: f32,
    /// Kernel distance, lower is closer
    pub distance: f32,
}

/// Index size and shape statistics.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IndexStats {
    /// Number of vectors indexed
    pub vector_count: usize,
    /// Vector dimension
    pub dimension: usize,
    /// Highest graph layer in use (HNSW only)
    pub max_layer: Option<usize>,
}

/// Common surface of the HNSW and flat indexes.
///
/// `add` is idempotent by last write: re-adding an existing ID overwrites the
/// stored vector, and `len` counts unique IDs.
pub trait VectorIndex {
    /// Insert one vector copy. Fails on dimension mismatch.
    fn add(&mut self, id: u64, vector: &[f32]) -> Result<()>;

    /// Insert a batch, processed in ascending-ID order.
    fn add_batch(&mut self, entries: Vec<(u64, Vec<f32>)>) -> Result<()> {
        let mut entries = entries;
        entries.sort_by_key(|(id, _)| *id);
        for (id, vector) in entries {
            self.add(id, &vector)?;
        }
        Ok(())
    }

    /// Up to `k` results sorted by descending similarity. An empty index or
    /// `k == 0` yields an empty list, not an error.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>>;

    /// Defensive copy of a stored vector, if present.
    fn get_vector(&self, id: u64) -> Option<Vec<f32>>;

    /// Number of unique IDs stored.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all vectors and graph state.
    fn clear(&mut self);

    /// Persist to `path` atomically (write-to-temp + rename).
    fn save(&self, path: &Path) -> Result<()>;

    /// Replace in-memory state wholesale from `path`. On failure the prior
    /// state is left untouched.
    fn load(&mut self, path: &Path) -> Result<()>;

    fn stats(&self) -> IndexStats;
}
