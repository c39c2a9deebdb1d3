//! Exact (brute-force) vector index.
//!
//! Stores every chunk's unit-normalized vector and scores all of them on
//! each query. `O(1)` inserts, `O(N*d + N*log k)` queries via a bounded
//! min-heap. This is the only variant whose similarity metric is a runtime
//! choice rather than fixed to cosine.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

use vdb_core::{normalize_if_needed, Chunk, Cosine, Metadata, Result, SearchHit, SimilarityMetric, VdbError};

use crate::index::VectorIndex;

struct HeapEntry {
    /// Comparison key: the raw score when `higher_is_better`, its negation
    /// otherwise, so a plain min-heap always exposes the current worst of
    /// the retained top-k at its head.
    key: f32,
    chunk_id: String,
    raw: f32,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.total_cmp(&other.key)
    }
}

pub struct FlatIndex {
    dimension: usize,
    metric: Box<dyn SimilarityMetric>,
    vecs: HashMap<String, Vec<f32>>,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self::with_metric(dimension, Box::new(Cosine))
    }

    pub fn with_metric(dimension: usize, metric: Box<dyn SimilarityMetric>) -> Self {
        Self { dimension, metric, vecs: HashMap::new() }
    }

    fn normalize(&self, emb: &[f32]) -> Vec<f32> {
        normalize_if_needed(self.metric.as_ref(), emb)
    }
}

impl VectorIndex for FlatIndex {
    fn add_chunk(&mut self, chunk: &Chunk) -> Result<()> {
        if chunk.embedding.len() != self.dimension {
            return Err(VdbError::dimension_mismatch(self.dimension, chunk.embedding.len()));
        }
        self.vecs.insert(chunk.id.clone(), self.normalize(&chunk.embedding));
        Ok(())
    }

    fn update_chunk(&mut self, chunk_id: &str, new_chunk: &Chunk) -> Result<bool> {
        let existed = self.vecs.contains_key(chunk_id);
        if existed {
            if new_chunk.embedding.len() != self.dimension {
                return Err(VdbError::dimension_mismatch(self.dimension, new_chunk.embedding.len()));
            }
            self.vecs.insert(chunk_id.to_string(), self.normalize(&new_chunk.embedding));
        } else {
            self.add_chunk(new_chunk)?;
        }
        Ok(existed)
    }

    fn remove_chunk(&mut self, chunk_id: &str) -> bool {
        self.vecs.remove(chunk_id).is_some()
    }

    fn search(&self, query: &[f32], k: usize, _metadata_filters: Option<&Metadata>) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(VdbError::dimension_mismatch(self.dimension, query.len()));
        }
        if self.vecs.is_empty() {
            return Ok(Vec::new());
        }

        let q = self.normalize(query);
        let higher_is_better = self.metric.higher_is_better();
        let k_eff = k.min(self.vecs.len());

        let mut heap: BinaryHeap<Reverse<HeapEntry>> = BinaryHeap::with_capacity(k_eff);
        for (chunk_id, v) in &self.vecs {
            let raw = self.metric.compute(&q, v);
            let key = if higher_is_better { raw } else { -raw };
            if heap.len() < k_eff {
                heap.push(Reverse(HeapEntry { key, chunk_id: chunk_id.clone(), raw }));
            } else if let Some(Reverse(worst)) = heap.peek() {
                if key > worst.key {
                    heap.pop();
                    heap.push(Reverse(HeapEntry { key, chunk_id: chunk_id.clone(), raw }));
                }
            }
        }

        let mut entries: Vec<HeapEntry> = heap.into_iter().map(|Reverse(e)| e).collect();
        entries.sort_by(|a, b| b.key.total_cmp(&a.key));

        Ok(entries.into_iter().map(|e| SearchHit::new(e.chunk_id, e.raw)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn complexity(&self) -> (&'static str, &'static str) {
        ("O(N*d)", "Build: O(1) | Query: O(N*d) + O(N log k)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use vdb_core::Metadata as Meta;

    fn chunk(id: &str, emb: Vec<f32>) -> Chunk {
        Chunk { id: id.to_string(), library_id: "lib".into(), document_id: "doc".into(), text: "t".into(), embedding: emb, metadata: Meta::new() }
    }

    #[test]
    fn scenario_orthogonal_and_diagonal_chunks() {
        let mut idx = FlatIndex::new(4);
        idx.add_chunk(&chunk("c1", vec![1.0, 0.0, 0.0, 0.0])).unwrap();
        idx.add_chunk(&chunk("c2", vec![0.0, 1.0, 0.0, 0.0])).unwrap();
        idx.add_chunk(&chunk("c3", vec![1.0, 1.0, 0.0, 0.0])).unwrap();

        let hits = idx.search(&[1.0, 0.0, 0.0, 0.0], 2, None).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk_id, "c1");
        assert_relative_eq!(hits[0].similarity_score, 1.0, epsilon = 1e-5);
        assert_eq!(hits[1].chunk_id, "c3");
        assert_relative_eq!(hits[1].similarity_score, std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-5);
    }

    #[test]
    fn scenario_3_4_5_triangle_score() {
        let mut idx = FlatIndex::new(2);
        idx.add_chunk(&chunk("c", vec![3.0, 4.0])).unwrap();
        let hits = idx.search(&[1.0, 0.0], 1, None).unwrap();
        assert_relative_eq!(hits[0].similarity_score, 0.6, epsilon = 1e-5);
    }

    #[test]
    fn k_zero_returns_empty() {
        let mut idx = FlatIndex::new(2);
        idx.add_chunk(&chunk("c", vec![1.0, 0.0])).unwrap();
        assert!(idx.search(&[1.0, 0.0], 0, None).unwrap().is_empty());
    }

    #[test]
    fn empty_index_returns_empty() {
        let idx = FlatIndex::new(2);
        assert!(idx.search(&[1.0, 0.0], 5, None).unwrap().is_empty());
    }

    #[test]
    fn search_wrong_dimension_fails() {
        let mut idx = FlatIndex::new(4);
        idx.add_chunk(&chunk("c", vec![1.0, 0.0, 0.0, 0.0])).unwrap();
        let err = idx.search(&[1.0, 0.0], 1, None).unwrap_err();
        assert!(matches!(err, VdbError::DimensionMismatch { expected: 4, got: 2 }));
    }

    #[test]
    fn add_wrong_dimension_fails() {
        let mut idx = FlatIndex::new(4);
        let err = idx.add_chunk(&chunk("c", vec![1.0, 0.0])).unwrap_err();
        assert!(matches!(err, VdbError::DimensionMismatch { expected: 4, got: 2 }));
    }

    #[test]
    fn update_replaces_vector_and_reports_existed() {
        let mut idx = FlatIndex::new(2);
        idx.add_chunk(&chunk("c", vec![1.0, 0.0])).unwrap();

        let existed = idx.update_chunk("c", &chunk("c", vec![0.0, 1.0])).unwrap();
        assert!(existed);

        let hits = idx.search(&[0.0, 1.0], 1, None).unwrap();
        assert_relative_eq!(hits[0].similarity_score, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn update_of_unknown_id_inserts() {
        let mut idx = FlatIndex::new(2);
        let existed = idx.update_chunk("new", &chunk("new", vec![1.0, 0.0])).unwrap();
        assert!(!existed);
        assert_eq!(idx.search(&[1.0, 0.0], 1, None).unwrap().len(), 1);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut idx = FlatIndex::new(2);
        idx.add_chunk(&chunk("c", vec![1.0, 0.0])).unwrap();
        assert!(idx.remove_chunk("c"));
        assert!(!idx.remove_chunk("c"));
    }
}
