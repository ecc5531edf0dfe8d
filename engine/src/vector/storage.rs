//! Dense vector storage
//!
//! Owned, dimension-checked storage backing both indexes. Vectors are stored
//! concatenated in one allocation with an ID-to-slot map on the side, so the
//! caller can mutate or drop its own copy without touching the index.

use ahash::AHashMap;
use anyhow::{bail, Result};

/// Dense owned storage mapping external `u64` IDs to vector copies.
pub struct VectorStorage {
    /// All vectors concatenated, `dimension` floats per slot
    vectors: Vec<f32>,
    /// Slot order of insertion, one external ID per slot
    ids: Vec<u64>,
    /// External ID to slot index
    id_to_slot: AHashMap<u64, usize>,
    dimension: usize,
}

impl VectorStorage {
    pub fn new(dimension: usize) -> Self {
        Self {
            vectors: Vec::new(),
            ids: Vec::new(),
            id_to_slot: AHashMap::new(),
            dimension,
        }
    }

    pub fn with_capacity(dimension: usize, capacity: usize) -> Self {
        Self {
            vectors: Vec::with_capacity(capacity * dimension),
            ids: Vec::with_capacity(capacity),
            id_to_slot: AHashMap::with_capacity(capacity),
            dimension,
        }
    }

    /// Insert a vector copy, overwriting in place when the ID already exists.
    ///
    /// Returns the slot index the vector landed in.
    pub fn insert(&mut self, id: u64, vector: &[f32]) -> Result<usize> {
        if vector.len() != self.dimension {
            bail!(
                "Vector dimension mismatch: expected {}, got {}",
                self.dimension,
                vector.len()
            );
        }

        if let Some(&slot) = self.id_to_slot.get(&id) {
            let start = slot * self.dimension;
            self.vectors[start..start + self.dimension].copy_from_slice(vector);
            Ok(slot)
        } else {
            let slot = self.ids.len();
            self.vectors.extend_from_slice(vector);
            self.ids.push(id);
            self.id_to_slot.insert(id, slot);
            Ok(slot)
        }
    }

    /// Borrow a stored vector by external ID.
    pub fn get(&self, id: u64) -> Option<&[f32]> {
        self.id_to_slot.get(&id).map(|&slot| self.slot_vector(slot))
    }

    /// Defensive copy of a stored vector.
    pub fn get_owned(&self, id: u64) -> Option<Vec<f32>> {
        self.get(id).map(|v| v.to_vec())
    }

    /// Borrow a stored vector by slot index (graph traversal hot path).
    pub fn slot_vector(&self, slot: usize) -> &[f32] {
        let start = slot * self.dimension;
        &self.vectors[start..start + self.dimension]
    }

    pub fn slot_id(&self, slot: usize) -> Option<u64> {
        self.ids.get(slot).copied()
    }

    pub fn slot_of(&self, id: u64) -> Option<usize> {
        self.id_to_slot.get(&id).copied()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.id_to_slot.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn clear(&mut self) {
        self.vectors.clear();
        self.ids.clear();
        self.id_to_slot.clear();
    }

    /// Iterate `(id, vector)` pairs in slot (insertion) order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &[f32])> {
        self.ids
            .iter()
            .enumerate()
            .map(move |(slot, &id)| (id, self.slot_vector(slot)))
    }
}
