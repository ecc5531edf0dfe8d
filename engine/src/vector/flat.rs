//! Exhaustive-scan vector index
//!
//! Exact top-k by brute force. Serves as the oracle the HNSW index is
//! measured against and as a sensible default for small collections, where
//! a full scan beats graph traversal anyway.

use super::distance::SimilarityKernel;
use super::storage::VectorStorage;
use super::{IndexStats, SearchResult, VectorIndex};
use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Exact k-NN index over dense storage.
pub struct FlatIndex {
    kernel: Box<dyn SimilarityKernel>,
    storage: VectorStorage,
}

impl FlatIndex {
    pub fn new(kernel: Box<dyn SimilarityKernel>) -> Self {
        let dimension = kernel.dimension();
        Self {
            kernel,
            storage: VectorStorage::new(dimension),
        }
    }

    pub fn dimension(&self) -> usize {
        self.kernel.dimension()
    }
}

impl VectorIndex for FlatIndex {
    fn add(&mut self, id: u64, vector: &[f32]) -> Result<()> {
        self.storage.insert(id, vector)?;
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if query.len() != self.kernel.dimension() {
            bail!(
                "Query dimension mismatch: expected {}, got {}",
                self.kernel.dimension(),
                query.len()
            );
        }

        if self.storage.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut results: Vec<SearchResult> = self
            .storage
            .iter()
            .map(|(id, vector)| SearchResult {
                id,
                similarity: self.kernel.similarity(query, vector),
                distance: self.kernel.distance(query, vector),
            })
            .collect();

        // Descending similarity, ties broken by lower ID for reproducibility
        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });

        results.truncate(k);
        Ok(results)
    }

    fn get_vector(&self, id: u64) -> Option<Vec<f32>> {
        self.storage.get_owned(id)
    }

    fn len(&self) -> usize {
        self.storage.len()
    }

    fn clear(&mut self) {
        self.storage.clear();
    }

    /// Flat index v1 format: dimension line, count line, then one
    /// `id,f0,f1,...` line per vector.
    fn save(&self, path: &Path) -> Result<()> {
        let temp_path = path.with_extension("tmp");

        {
            let file = File::create(&temp_path).context("Failed to create flat index temp file")?;
            let mut writer = BufWriter::new(file);

            writeln!(writer, "{}", self.kernel.dimension())?;
            writeln!(writer, "{}", self.storage.len())?;

            for (id, vector) in self.storage.iter() {
                write!(writer, "{}", id)?;
                for value in vector {
                    write!(writer, ",{}", value)?;
                }
                writeln!(writer)?;
            }

            writer.flush()?;
            writer.get_ref().sync_all()?;
        }

        std::fs::rename(&temp_path, path).context("Failed to rename flat index file")?;
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<()> {
        let file = File::open(path).context("Failed to open flat index file")?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let dimension: usize = lines
            .next()
            .context("Flat index file is empty")??
            .trim()
            .parse()
            .context("Invalid dimension line in flat index file")?;

        if dimension != self.kernel.dimension() {
            bail!(
                "Flat index dimension mismatch: file has {}, kernel expects {}",
                dimension,
                self.kernel.dimension()
            );
        }

        let count: usize = lines
            .next()
            .context("Flat index file truncated before vector count")??
            .trim()
            .parse()
            .context("Invalid vector count line in flat index file")?;

        // Stage into fresh storage so a parse failure cannot leave the index
        // half-populated.
        let mut staged = VectorStorage::with_capacity(dimension, count);

        for i in 0..count {
            let line = lines
                .next()
                .with_context(|| format!("Flat index file truncated at vector {}", i))??;
            let mut fields = line.trim().split(',');

            let id: u64 = fields
                .next()
                .with_context(|| format!("Missing ID on vector line {}", i))?
                .parse()
                .with_context(|| format!("Invalid ID on vector line {}", i))?;

            let vector: Vec<f32> = fields
                .map(|f| f.parse::<f32>())
                .collect::<Result<_, _>>()
                .with_context(|| format!("Invalid float on vector line {}", i))?;

            if vector.len() != dimension {
                bail!(
                    "Vector {} has {} components, expected {}",
                    id,
                    vector.len(),
                    dimension
                );
            }

            staged.insert(id, &vector)?;
        }

        // Unknown trailing lines are ignored
        self.storage = staged;
        Ok(())
    }

    fn stats(&self) -> IndexStats {
        IndexStats {
            vector_count: self.storage.len(),
            dimension: self.kernel.dimension(),
            max_layer: None,
        }
    }
}
