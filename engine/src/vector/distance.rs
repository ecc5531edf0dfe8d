//! Similarity kernels for vector search
//!
//! A kernel bundles the similarity and distance functions with the vector
//! dimension they operate on. Kernels are runtime-dispatched so callers can
//! plug in their own scoring without touching the index internals.

use crate::config::DistanceMetric;
#[cfg(feature = "simd-optimized")]
use wide::f32x8;

/// Similarity + distance + dimension contract consumed by the indexes.
///
/// The cosine kernel satisfies `distance = 1 - similarity`; the other
/// built-ins document their own relation. The indexes traverse by distance
/// and rank final results by similarity, so any monotone pairing works.
pub trait SimilarityKernel: Send + Sync {
    /// Similarity score, higher is closer. Cosine yields [-1, 1].
    fn similarity(&self, a: &[f32], b: &[f32]) -> f32;

    /// Distance, lower is closer. Cosine yields [0, 2].
    fn distance(&self, a: &[f32], b: &[f32]) -> f32;

    /// Fixed vector dimension this kernel (and any index built on it) accepts.
    fn dimension(&self) -> usize;

    /// Whether this implementation uses SIMD
    fn is_simd(&self) -> bool {
        false
    }
}

/// Factory for creating optimized kernels
pub struct KernelFactory;

impl KernelFactory {
    /// Create the most optimized kernel for the given metric and dimension.
    pub fn new(metric: DistanceMetric, dimension: usize) -> Box<dyn SimilarityKernel> {
        #[cfg(all(
            feature = "simd-optimized",
            any(target_arch = "x86", target_arch = "x86_64")
        ))]
        {
            if is_x86_feature_detected!("avx2") {
                return Self::create_simd(metric, dimension);
            }
        }

        Self::create_scalar(metric, dimension)
    }

    #[cfg(feature = "simd-optimized")]
    fn create_simd(metric: DistanceMetric, dimension: usize) -> Box<dyn SimilarityKernel> {
        match metric {
            DistanceMetric::Cosine => Box::new(CosineSimd { dimension }),
            // Dot/Euclidean stay scalar; cosine dominates the hot path
            DistanceMetric::DotProduct => Box::new(DotProductScalar { dimension }),
            DistanceMetric::Euclidean => Box::new(EuclideanScalar { dimension }),
        }
    }

    fn create_scalar(metric: DistanceMetric, dimension: usize) -> Box<dyn SimilarityKernel> {
        match metric {
            DistanceMetric::Cosine => Box::new(CosineScalar { dimension }),
            DistanceMetric::DotProduct => Box::new(DotProductScalar { dimension }),
            DistanceMetric::Euclidean => Box::new(EuclideanScalar { dimension }),
        }
    }
}

fn cosine_similarity_scalar(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    let norm_product = norm_a * norm_b;
    if norm_product == 0.0 {
        return 0.0; // Zero vectors are similar to nothing
    }

    dot / norm_product
}

/// Cosine kernel: `distance = 1 - similarity`, similarity in [-1, 1].
pub struct CosineScalar {
    dimension: usize,
}

impl CosineScalar {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl SimilarityKernel for CosineScalar {
    fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        cosine_similarity_scalar(a, b)
    }

    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        1.0 - cosine_similarity_scalar(a, b)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Dot-product kernel: `distance = -similarity` (valid for ranking only).
///
/// Assumes L2-normalized inputs when used as a stand-in for cosine.
pub struct DotProductScalar {
    dimension: usize,
}

impl DotProductScalar {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl SimilarityKernel for DotProductScalar {
    fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");
        a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
    }

    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        -self.similarity(a, b)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Euclidean kernel: `similarity = 1 / (1 + distance)`, so similarity is in
/// (0, 1] and ordering matches ascending L2 distance.
pub struct EuclideanScalar {
    dimension: usize,
}

impl EuclideanScalar {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl SimilarityKernel for EuclideanScalar {
    fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        1.0 / (1.0 + self.distance(a, b))
    }

    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).powi(2))
            .sum::<f32>()
            .sqrt()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// =============================================================================
// SIMD Implementations (AVX2)
// =============================================================================

#[cfg(feature = "simd-optimized")]
pub struct CosineSimd {
    dimension: usize,
}

#[cfg(feature = "simd-optimized")]
impl SimilarityKernel for CosineSimd {
    fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

        let mut dot = f32x8::ZERO;
        let mut norm_a = f32x8::ZERO;
        let mut norm_b = f32x8::ZERO;

        let chunks = a.len() / 8;

        // Process 8 elements at a time
        for i in 0..chunks {
            let base = i * 8;
            let va = f32x8::new([
                a[base],
                a[base + 1],
                a[base + 2],
                a[base + 3],
                a[base + 4],
                a[base + 5],
                a[base + 6],
                a[base + 7],
            ]);
            let vb = f32x8::new([
                b[base],
                b[base + 1],
                b[base + 2],
                b[base + 3],
                b[base + 4],
                b[base + 5],
                b[base + 6],
                b[base + 7],
            ]);

            dot += va * vb;
            norm_a += va * va;
            norm_b += vb * vb;
        }

        // Handle remaining elements
        let mut dot_sum = dot.reduce_add();
        let mut norm_a_sum = norm_a.reduce_add();
        let mut norm_b_sum = norm_b.reduce_add();

        for i in (chunks * 8)..a.len() {
            dot_sum += a[i] * b[i];
            norm_a_sum += a[i] * a[i];
            norm_b_sum += b[i] * b[i];
        }

        let norm_product = (norm_a_sum * norm_b_sum).sqrt();
        if norm_product == 0.0 {
            return 0.0;
        }

        dot_sum / norm_product
    }

    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        1.0 - self.similarity(a, b)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn is_simd(&self) -> bool {
        true
    }
}
