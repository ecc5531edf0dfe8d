//! Text embedding providers
//!
//! The indexes never compute embeddings themselves; they consume vectors
//! produced behind this trait. The shipped [`HashEmbedding`] is a fast,
//! deterministic placeholder for tests and demos. It is NOT semantic:
//! "dog" and "god" come out similar, "dog" and "cat" do not. Plug a real
//! model (ONNX, API-backed, ...) in behind the trait for production use.

use anyhow::Result;

/// Pluggable text-to-vector contract.
pub trait EmbeddingProvider {
    /// Produce an embedding for `text`.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Dimension of every vector this provider produces.
    fn dimension(&self) -> usize;
}

/// Hash-based embedding: folds bytes into the dimension and L2-normalizes.
#[derive(Debug, Clone)]
pub struct HashEmbedding {
    dimension: usize,
}

impl HashEmbedding {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl EmbeddingProvider for HashEmbedding {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embedding = vec![0.0f32; self.dimension];

        for (i, byte) in text.bytes().enumerate() {
            embedding[i % self.dimension] += byte as f32 / 255.0;
        }

        // Normalize
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
