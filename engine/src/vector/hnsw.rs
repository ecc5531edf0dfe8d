//! Native HNSW (Hierarchical Navigable Small World) index
//!
//! Multi-layer proximity graph for approximate k-NN search with logarithmic
//! traversal cost. The graph is an arena: node records live in a dense vector
//! indexed by slot, adjacency lists hold slots, and a side map translates
//! caller IDs. Construction is seeded, so the same seed and insertion order
//! always reproduce the same graph.

use super::distance::SimilarityKernel;
use super::storage::VectorStorage;
use super::{IndexStats, SearchResult, VectorIndex};
use ahash::AHashSet;
use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Hard cap on layer assignment; bounds memory per node.
const MAX_LAYER: usize = 16;

/// File magic for the persisted graph format.
const HNSW_MAGIC: &str = "HNSW_v2";

/// Marker between the vector section and the adjacency section.
const GRAPH_MARKER: &str = "---GRAPH---";

/// HNSW construction parameters.
#[derive(Debug, Clone)]
pub struct HnswParams {
    /// Per-layer neighbor budget; layer 0 allows `2 * m`
    pub m: usize,
    /// Beam width during construction
    pub ef_construction: usize,
    /// Beam width during search; `None` falls back to `ef_construction`
    pub ef_search: Option<usize>,
    /// Layer-assignment multiplier
    pub ml: f64,
    /// RNG seed for layer assignment
    pub seed: u64,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 200,
            ef_search: None,
            ml: 1.0 / std::f64::consts::LN_2,
            seed: 42,
        }
    }
}

/// Graph node: one entry per slot in the arena, parallel to vector storage.
#[derive(Debug, Clone)]
struct HnswNode {
    /// Caller-assigned ID (duplicated here to avoid storage lookups on ties)
    id: u64,
    /// Highest layer this node participates in
    max_layer: usize,
    /// Neighbor slots per layer, `0..=max_layer`
    layers: Vec<SmallVec<[usize; 16]>>,
}

impl HnswNode {
    fn new(id: u64, max_layer: usize) -> Self {
        let mut layers = Vec::with_capacity(max_layer + 1);
        for _ in 0..=max_layer {
            layers.push(SmallVec::new());
        }
        Self {
            id,
            max_layer,
            layers,
        }
    }

    fn neighbors(&self, layer: usize) -> &[usize] {
        if layer <= self.max_layer {
            &self.layers[layer]
        } else {
            &[]
        }
    }
}

/// Traversal candidate ordered by (distance, external ID) ascending.
///
/// The ID component makes every comparison total, which is what keeps
/// search results and beam evictions reproducible across runs.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    slot: usize,
    id: u64,
    distance: f32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance && self.id == other.id
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Approximate k-NN index over a hierarchical proximity graph.
pub struct HnswIndex {
    kernel: Box<dyn SimilarityKernel>,
    params: HnswParams,
    storage: VectorStorage,
    /// Arena of graph nodes, parallel to storage slots
    nodes: Vec<HnswNode>,
    /// Slot of the highest-layer node; search always starts here
    entry_point: Option<usize>,
    rng: StdRng,
}

impl HnswIndex {
    pub fn new(kernel: Box<dyn SimilarityKernel>, params: HnswParams) -> Self {
        let dimension = kernel.dimension();
        let rng = StdRng::seed_from_u64(params.seed);
        Self {
            kernel,
            params,
            storage: VectorStorage::new(dimension),
            nodes: Vec::new(),
            entry_point: None,
            rng,
        }
    }

    pub fn params(&self) -> &HnswParams {
        &self.params
    }

    pub fn dimension(&self) -> usize {
        self.kernel.dimension()
    }

    /// ID of the current entry point, if the index is non-empty.
    pub fn entry_point(&self) -> Option<u64> {
        self.entry_point.map(|slot| self.nodes[slot].id)
    }

    /// Highest layer currently in use.
    pub fn max_layer(&self) -> usize {
        self.entry_point
            .map(|slot| self.nodes[slot].max_layer)
            .unwrap_or(0)
    }

    /// Neighbor IDs of `id` at `layer`, sorted ascending. Exposed for
    /// determinism checks and tooling; not part of the search surface.
    pub fn neighbors(&self, id: u64, layer: usize) -> Option<Vec<u64>> {
        let slot = self.storage.slot_of(id)?;
        let node = &self.nodes[slot];
        if layer > node.max_layer {
            return None;
        }
        let mut ids: Vec<u64> = node.layers[layer]
            .iter()
            .map(|&n| self.nodes[n].id)
            .collect();
        ids.sort_unstable();
        Some(ids)
    }

    fn neighbor_budget(&self, layer: usize) -> usize {
        if layer == 0 {
            self.params.m * 2
        } else {
            self.params.m
        }
    }

    /// Draw a layer for a new node: fresh uniform draw per step, stop when a
    /// draw lands at or above `ml` or the cap is reached.
    fn random_level(&mut self) -> usize {
        let mut level = 0;
        while level < MAX_LAYER && self.rng.gen::<f64>() < self.params.ml {
            level += 1;
        }
        level
    }

    fn candidate(&self, slot: usize, query: &[f32]) -> Candidate {
        Candidate {
            slot,
            id: self.nodes[slot].id,
            distance: self.kernel.distance(query, self.storage.slot_vector(slot)),
        }
    }

    /// Beam-style best-first traversal constrained to edges at `layer`.
    ///
    /// Returns up to `ef` candidates sorted ascending by (distance, ID).
    fn search_layer(&self, query: &[f32], entries: &[Candidate], ef: usize, layer: usize) -> Vec<Candidate> {
        let mut visited: AHashSet<usize> = AHashSet::new();
        // Min-heap of candidates still to expand
        let mut frontier: BinaryHeap<Reverse<Candidate>> = BinaryHeap::new();
        // Max-heap of the current best set; peek() is the farthest
        let mut working: BinaryHeap<Candidate> = BinaryHeap::new();

        for &entry in entries {
            if visited.insert(entry.slot) {
                frontier.push(Reverse(entry));
                working.push(entry);
            }
        }

        while let Some(Reverse(current)) = frontier.pop() {
            let farthest = working
                .peek()
                .map(|c| c.distance)
                .unwrap_or(f32::INFINITY);
            if current.distance > farthest && working.len() >= ef {
                break;
            }

            for &neighbor_slot in self.nodes[current.slot].neighbors(layer) {
                if !visited.insert(neighbor_slot) {
                    continue;
                }

                let neighbor = self.candidate(neighbor_slot, query);
                let farthest = working
                    .peek()
                    .map(|c| c.distance)
                    .unwrap_or(f32::INFINITY);

                if working.len() < ef || neighbor.distance < farthest {
                    frontier.push(Reverse(neighbor));
                    working.push(neighbor);
                    if working.len() > ef {
                        working.pop();
                    }
                }
            }
        }

        working.into_sorted_vec()
    }

    /// Wire a freshly stored node into the graph at layers `0..=level`.
    fn insert_into_graph(&mut self, slot: usize, level: usize, vector: &[f32]) {
        let entry_slot = match self.entry_point {
            Some(e) => e,
            None => {
                self.entry_point = Some(slot);
                return;
            }
        };

        let entry_layer = self.nodes[entry_slot].max_layer;
        let mut current = vec![self.candidate(entry_slot, vector)];

        // Greedy descent above the target level, carrying the single nearest
        for layer in ((level + 1)..=entry_layer).rev() {
            let found = self.search_layer(vector, &current, 1, layer);
            if let Some(&closest) = found.first() {
                current = vec![closest];
            }
        }

        // Link at each layer from min(level, entry_layer) down to 0
        for layer in (0..=level.min(entry_layer)).rev() {
            let candidates = self.search_layer(vector, &current, self.params.ef_construction, layer);
            let budget = self.neighbor_budget(layer);

            let chosen: Vec<Candidate> = candidates.iter().take(budget).copied().collect();
            self.nodes[slot].layers[layer] = chosen.iter().map(|c| c.slot).collect();

            // Back-links, pruning each neighbor to its budget
            for c in &chosen {
                if !self.nodes[c.slot].layers[layer].contains(&slot) {
                    self.nodes[c.slot].layers[layer].push(slot);
                }
                if self.nodes[c.slot].layers[layer].len() > budget {
                    self.prune_neighbors(c.slot, layer, budget);
                }
            }

            current = candidates;
        }

        if level > entry_layer {
            self.entry_point = Some(slot);
        }
    }

    /// Keep the `budget` neighbors closest to `slot`, ties to lower ID.
    fn prune_neighbors(&mut self, slot: usize, layer: usize, budget: usize) {
        let base = self.storage.slot_vector(slot).to_vec();
        let mut ranked: Vec<Candidate> = self.nodes[slot].layers[layer]
            .iter()
            .map(|&n| self.candidate(n, &base))
            .collect();
        ranked.sort_unstable();
        ranked.truncate(budget);
        self.nodes[slot].layers[layer] = ranked.iter().map(|c| c.slot).collect();
    }
}

impl VectorIndex for HnswIndex {
    /// Idempotent by last write: an existing ID gets its vector overwritten
    /// while the prior layer assignment and edges remain. Callers that need a
    /// clean replace should `clear` or pick a fresh ID.
    fn add(&mut self, id: u64, vector: &[f32]) -> Result<()> {
        if vector.len() != self.kernel.dimension() {
            bail!(
                "Vector dimension mismatch: expected {}, got {}",
                self.kernel.dimension(),
                vector.len()
            );
        }

        if self.storage.contains(id) {
            self.storage.insert(id, vector)?;
            return Ok(());
        }

        let slot = self.storage.insert(id, vector)?;
        let level = self.random_level();
        self.nodes.push(HnswNode::new(id, level));
        debug_assert_eq!(self.nodes.len(), self.storage.len());

        self.insert_into_graph(slot, level, vector);
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

        let entry_slot = match self.entry_point {
            Some(e) => e,
            None => return Ok(Vec::new()),
        };
        if k == 0 {
            return Ok(Vec::new());
        }

        let ef = self
            .params
            .ef_search
            .unwrap_or(self.params.ef_construction)
            .max(k);

        let entry_layer = self.nodes[entry_slot].max_layer;
        let mut current = vec![self.candidate(entry_slot, query)];

        // Greedy descent to layer 1
        for layer in (1..=entry_layer).rev() {
            let found = self.search_layer(query, &current, 1, layer);
            if let Some(&closest) = found.first() {
                current = vec![closest];
            }
        }

        // Full beam at layer 0
        let candidates = self.search_layer(query, &current, ef, 0);

        Ok(candidates
            .into_iter()
            .take(k)
            .map(|c| SearchResult {
                id: c.id,
                similarity: self
                    .kernel
                    .similarity(query, self.storage.slot_vector(c.slot)),
                distance: c.distance,
            })
            .collect())
    }

    fn get_vector(&self, id: u64) -> Option<Vec<f32>> {
        self.storage.get_owned(id)
    }

    fn len(&self) -> usize {
        self.storage.len()
    }

    fn clear(&mut self) {
        self.storage.clear();
        self.nodes.clear();
        self.entry_point = None;
        self.rng = StdRng::seed_from_u64(self.params.seed);
    }

    /// `HNSW_v2` format: magic, parameter line, vector count, entry point,
    /// one vector line per node, graph marker, one adjacency line per
    /// non-empty layer. Written to a temp file and renamed into place.
    fn save(&self, path: &Path) -> Result<()> {
        let temp_path = path.with_extension("tmp");

        {
            let file = File::create(&temp_path).context("Failed to create HNSW temp file")?;
            let mut writer = BufWriter::new(file);

            writeln!(writer, "{}", HNSW_MAGIC)?;
            writeln!(
                writer,
                "{},{},{},{}",
                self.params.m,
                self.params.ef_construction,
                self.params.ml,
                self.kernel.dimension()
            )?;
            writeln!(writer, "{}", self.storage.len())?;
            match self.entry_point() {
                Some(id) => writeln!(writer, "{}", id)?,
                None => writeln!(writer, "null")?,
            }

            for (slot, node) in self.nodes.iter().enumerate() {
                write!(writer, "{}|{}", node.id, node.max_layer)?;
                for value in self.storage.slot_vector(slot) {
                    write!(writer, ",{}", value)?;
                }
                writeln!(writer)?;
            }

            writeln!(writer, "{}", GRAPH_MARKER)?;

            for node in &self.nodes {
                for (layer, neighbors) in node.layers.iter().enumerate() {
                    if neighbors.is_empty() {
                        continue;
                    }
                    let joined: Vec<String> = neighbors
                        .iter()
                        .map(|&n| self.nodes[n].id.to_string())
                        .collect();
                    writeln!(writer, "{}|{}:{}", node.id, layer, joined.join(";"))?;
                }
            }

            writer.flush()?;
            writer.get_ref().sync_all()?;
        }

        std::fs::rename(&temp_path, path).context("Failed to rename HNSW index file")?;
        debug!(path = %path.display(), vectors = self.storage.len(), "saved HNSW index");
        Ok(())
    }

    /// Atomic load: everything is staged first and swapped in wholesale, so a
    /// malformed file leaves the prior state untouched. Neighbor references
    /// to IDs missing from the vector section are dropped as corrupt but
    /// recoverable; unknown trailing lines are ignored.
    fn load(&mut self, path: &Path) -> Result<()> {
        let file = File::open(path).context("Failed to open HNSW index file")?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let magic = lines.next().context("HNSW index file is empty")??;
        if magic.trim() != HNSW_MAGIC {
            bail!(
                "Invalid HNSW magic: expected {:?}, got {:?}",
                HNSW_MAGIC,
                magic.trim()
            );
        }

        let params_line = lines.next().context("HNSW file truncated at parameters")??;
        let parts: Vec<&str> = params_line.trim().split(',').collect();
        if parts.len() != 4 {
            bail!("Malformed HNSW parameter line: {:?}", params_line);
        }
        let m: usize = parts[0].parse().context("Invalid maxM")?;
        let ef_construction: usize = parts[1].parse().context("Invalid efConstruction")?;
        let ml: f64 = parts[2].parse().context("Invalid mL")?;
        let dimension: usize = parts[3].parse().context("Invalid dimension")?;

        if dimension != self.kernel.dimension() {
            bail!(
                "HNSW dimension mismatch: file has {}, kernel expects {}",
                dimension,
                self.kernel.dimension()
            );
        }

        let count: usize = lines
            .next()
            .context("HNSW file truncated at vector count")??
            .trim()
            .parse()
            .context("Invalid vector count")?;

        let entry_line = lines.next().context("HNSW file truncated at entry point")??;
        let entry_id: Option<u64> = match entry_line.trim() {
            "null" => None,
            other => Some(other.parse().context("Invalid entry point ID")?),
        };

        // Vectors first, then graph, per the format contract
        let mut staged_storage = VectorStorage::with_capacity(dimension, count);
        let mut staged_nodes: Vec<HnswNode> = Vec::with_capacity(count);

        for i in 0..count {
            let line = lines
                .next()
                .with_context(|| format!("HNSW file truncated at vector {}", i))??;
            let (head, floats) = line
                .trim()
                .split_once(',')
                .with_context(|| format!("Malformed vector line {}", i))?;
            let (id_str, layer_str) = head
                .split_once('|')
                .with_context(|| format!("Malformed vector header on line {}", i))?;

            let id: u64 = id_str
                .parse()
                .with_context(|| format!("Invalid ID on vector line {}", i))?;
            let max_layer: usize = layer_str
                .parse()
                .with_context(|| format!("Invalid maxLayer on vector line {}", i))?;

            let vector: Vec<f32> = floats
                .split(',')
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

            staged_storage.insert(id, &vector)?;
            staged_nodes.push(HnswNode::new(id, max_layer));
        }

        let marker = lines.next().context("HNSW file truncated before graph section")??;
        if marker.trim() != GRAPH_MARKER {
            bail!(
                "Expected graph marker {:?}, got {:?}",
                GRAPH_MARKER,
                marker.trim()
            );
        }

        let mut dropped_neighbors = 0usize;
        for line in lines {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            // Anything that does not parse as an adjacency line is treated as
            // an unknown trailing line and skipped.
            let Some((head, neighbor_list)) = line.split_once(':') else {
                continue;
            };
            let Some((id_str, layer_str)) = head.split_once('|') else {
                continue;
            };
            let (Ok(id), Ok(layer)) = (id_str.parse::<u64>(), layer_str.parse::<usize>()) else {
                continue;
            };

            let Some(slot) = staged_storage.slot_of(id) else {
                dropped_neighbors += 1;
                continue;
            };
            if layer > staged_nodes[slot].max_layer {
                dropped_neighbors += 1;
                continue;
            }

            for neighbor_str in neighbor_list.split(';').filter(|s| !s.is_empty()) {
                let Ok(neighbor_id) = neighbor_str.parse::<u64>() else {
                    dropped_neighbors += 1;
                    continue;
                };
                match staged_storage.slot_of(neighbor_id) {
                    Some(neighbor_slot) if layer <= staged_nodes[neighbor_slot].max_layer => {
                        staged_nodes[slot].layers[layer].push(neighbor_slot);
                    }
                    _ => dropped_neighbors += 1,
                }
            }
        }

        let staged_entry = match entry_id {
            None => {
                if !staged_nodes.is_empty() {
                    bail!("HNSW file has {} vectors but no entry point", staged_nodes.len());
                }
                None
            }
            Some(id) => Some(
                staged_storage
                    .slot_of(id)
                    .with_context(|| format!("Entry point {} not present in vector section", id))?,
            ),
        };

        if dropped_neighbors > 0 {
            debug!(dropped = dropped_neighbors, "dropped neighbor references to unknown IDs during load");
        }

        // Wholesale swap only once everything parsed
        self.params.m = m;
        self.params.ef_construction = ef_construction;
        self.params.ml = ml;
        self.storage = staged_storage;
        self.nodes = staged_nodes;
        self.entry_point = staged_entry;

        debug!(path = %path.display(), vectors = self.storage.len(), "loaded HNSW index");
        Ok(())
    }

    fn stats(&self) -> IndexStats {
        IndexStats {
            vector_count: self.storage.len(),
            dimension: self.kernel.dimension(),
            max_layer: self.entry_point.map(|slot| self.nodes[slot].max_layer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DistanceMetric;
    use crate::vector::distance::KernelFactory;
    use tempfile::TempDir;

    fn index_with_seed(dimension: usize, seed: u64) -> HnswIndex {
        let params = HnswParams {
            seed,
            ..Default::default()
        };
        HnswIndex::new(KernelFactory::new(DistanceMetric::Cosine, dimension), params)
    }

    #[test]
    fn test_empty_index_search() {
        let index = index_with_seed(4, 1);
        let results = index.search(&[1.0, 0.0, 0.0, 0.0], 5).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_basic_insert_and_search() {
        let mut index = index_with_seed(4, 1);

        index.add(1, &[1.0, 0.0, 0.0, 0.0]).unwrap();
        index.add(2, &[0.0, 1.0, 0.0, 0.0]).unwrap();
        index.add(3, &[0.0, 0.0, 1.0, 0.0]).unwrap();

        let results = index.search(&[0.9, 0.1, 0.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, 1);
        assert!(results[0].similarity >= results[1].similarity);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = index_with_seed(4, 1);

        assert!(index.add(1, &[1.0, 0.0]).is_err());
        assert_eq!(index.len(), 0);
        assert!(index.search(&[1.0, 0.0], 1).is_err());
    }

    #[test]
    fn test_zero_k_returns_empty() {
        let mut index = index_with_seed(2, 1);
        index.add(1, &[1.0, 0.0]).unwrap();
        assert!(index.search(&[1.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_readd_overwrites_vector_only() {
        let mut index = index_with_seed(2, 1);

        index.add(1, &[1.0, 0.0]).unwrap();
        index.add(1, &[0.0, 1.0]).unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.get_vector(1).unwrap(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_entry_point_tracks_max_layer() {
        let mut index = index_with_seed(2, 7);
        index.add(10, &[1.0, 0.0]).unwrap();

        assert_eq!(index.entry_point(), Some(10));
        let entry_layer = index.max_layer();

        for i in 0..20u64 {
            index.add(100 + i, &[i as f32 / 20.0, 1.0]).unwrap();
        }

        // Entry point is always of maximal layer
        assert!(index.max_layer() >= entry_layer);
        let entry = index.entry_point().unwrap();
        let stats = index.stats();
        assert_eq!(
            stats.max_layer.unwrap(),
            (0..=MAX_LAYER)
                .rev()
                .find(|&l| index.neighbors(entry, l).is_some())
                .unwrap()
        );
    }

    #[test]
    fn test_determinism_same_seed_same_graph() {
        let build = || {
            let mut index = index_with_seed(8, 99);
            for i in 0..60u64 {
                let v: Vec<f32> = (0..8).map(|d| ((i * 31 + d * 7) % 13) as f32 / 13.0).collect();
                index.add(i, &v).unwrap();
            }
            index
        };

        let a = build();
        let b = build();

        assert_eq!(a.entry_point(), b.entry_point());
        for id in 0..60u64 {
            for layer in 0..=MAX_LAYER {
                assert_eq!(a.neighbors(id, layer), b.neighbors(id, layer), "id {} layer {}", id, layer);
            }
        }
    }

    #[test]
    fn test_neighbor_budget_respected() {
        let mut index = HnswIndex::new(
            KernelFactory::new(DistanceMetric::Cosine, 4),
            HnswParams {
                m: 4,
                ef_construction: 32,
                seed: 3,
                ..Default::default()
            },
        );

        for i in 0..100u64 {
            let v = vec![
                (i % 10) as f32 / 10.0,
                (i % 7) as f32 / 7.0,
                (i % 3) as f32 / 3.0,
                1.0,
            ];
            index.add(i, &v).unwrap();
        }

        for id in 0..100u64 {
            if let Some(neighbors) = index.neighbors(id, 0) {
                assert!(neighbors.len() <= 8, "layer 0 budget is 2*m");
            }
            for layer in 1..=MAX_LAYER {
                if let Some(neighbors) = index.neighbors(id, layer) {
                    assert!(neighbors.len() <= 4, "layer {} budget is m", layer);
                }
            }
        }
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.hnsw");

        let mut index = index_with_seed(4, 11);
        for i in 0..30u64 {
            let v = vec![
                (i % 5) as f32 / 5.0,
                (i % 4) as f32 / 4.0,
                (i % 3) as f32 / 3.0,
                1.0,
            ];
            index.add(i, &v).unwrap();
        }
        index.save(&path).unwrap();

        let mut restored = index_with_seed(4, 11);
        restored.load(&path).unwrap();

        assert_eq!(restored.len(), index.len());
        assert_eq!(restored.entry_point(), index.entry_point());

        let query = [0.3, 0.6, 0.2, 1.0];
        let before: Vec<u64> = index.search(&query, 5).unwrap().iter().map(|r| r.id).collect();
        let after: Vec<u64> = restored.search(&query, 5).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_load_bad_magic_leaves_index_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.hnsw");
        std::fs::write(&path, "NOT_AN_INDEX\n1,2,3,4\n").unwrap();

        let mut index = index_with_seed(4, 1);
        index.add(1, &[1.0, 0.0, 0.0, 0.0]).unwrap();

        assert!(index.load(&path).is_err());
        assert_eq!(index.len(), 1);
        assert_eq!(index.entry_point(), Some(1));
    }

    #[test]
    fn test_load_drops_unknown_neighbor_ids() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.hnsw");

        // Hand-written file whose graph references ID 999, which has no vector
        let contents = "HNSW_v2\n\
                        16,200,1.4426950408889634,2\n\
                        2\n\
                        0\n\
                        0|0,1,0\n\
                        1|0,0,1\n\
                        ---GRAPH---\n\
                        0|0:1;999\n\
                        1|0:0\n";
        std::fs::write(&path, contents).unwrap();

        let mut index = index_with_seed(2, 1);
        index.load(&path).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.neighbors(0, 0).unwrap(), vec![1]);

        let results = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(results[0].id, 0);
    }

    #[test]
    fn test_load_ignores_unknown_trailing_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.hnsw");

        let contents = "HNSW_v2\n\
                        16,200,1.4426950408889634,2\n\
                        1\n\
                        7\n\
                        7|0,0.5,0.5\n\
                        ---GRAPH---\n\
                        some future extension line\n";
        std::fs::write(&path, contents).unwrap();

        let mut index = index_with_seed(2, 1);
        index.load(&path).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.entry_point(), Some(7));
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut index = index_with_seed(2, 5);
        index.add(1, &[1.0, 0.0]).unwrap();
        index.add(2, &[0.0, 1.0]).unwrap();

        index.clear();
        assert_eq!(index.len(), 0);
        assert_eq!(index.entry_point(), None);
        assert!(index.search(&[1.0, 0.0], 3).unwrap().is_empty());
    }
}
