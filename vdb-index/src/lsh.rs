//! Multi-table SimHash LSH index (cosine, random-hyperplane hashing).
//!
//! Each table hashes a vector to an `n_bits`-wide bucket key via the sign of
//! its dot product against `n_bits` random unit hyperplanes. A query's
//! candidates are the union of the buckets its own keys land in across all
//! tables, exact-reranked by cosine.

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use vdb_core::{l2_norm, Chunk, Metadata, Result, SearchHit, VdbError};

use crate::config::LshConfig;
use crate::index::VectorIndex;

struct VecItem {
    vec: Vec<f32>,
    keys: Vec<u64>,
}

pub struct SimHashLSHIndex {
    dimension: usize,
    n_tables: usize,
    /// `hyperplanes[table][bit]` is a unit vector of length `dimension`.
    hyperplanes: Vec<Vec<Vec<f32>>>,
    bit_weights: Vec<u64>,
    tables: Vec<HashMap<u64, HashSet<String>>>,
    vec_items: HashMap<String, VecItem>,
}

impl SimHashLSHIndex {
    pub fn new(dimension: usize) -> Self {
        Self::with_config(dimension, LshConfig::default())
    }

    pub fn with_config(dimension: usize, cfg: LshConfig) -> Self {
        let cfg = cfg.normalized();
        let mut rng = StdRng::seed_from_u64(cfg.rng_seed);

        let hyperplanes: Vec<Vec<Vec<f32>>> = (0..cfg.n_tables)
            .map(|_| {
                (0..cfg.n_bits)
                    .map(|_| {
                        let raw: Vec<f32> =
                            (0..dimension).map(|_| StandardNormal.sample(&mut rng)).collect();
                        let norm = l2_norm(&raw) + 1e-12;
                        raw.iter().map(|x| x / norm).collect()
                    })
                    .collect()
            })
            .collect();

        let bit_weights: Vec<u64> = (0..cfg.n_bits).map(|i| 1u64 << i).collect();

        Self {
            dimension,
            n_tables: cfg.n_tables,
            hyperplanes,
            bit_weights,
            tables: (0..cfg.n_tables).map(|_| HashMap::new()).collect(),
            vec_items: HashMap::new(),
        }
    }

    fn normalize(&self, v: &[f32]) -> Vec<f32> {
        let norm = l2_norm(v);
        if norm > 0.0 {
            v.iter().map(|x| x / norm).collect()
        } else {
            v.to_vec()
        }
    }

    fn simhash_keys(&self, v: &[f32]) -> Vec<u64> {
        self.hyperplanes
            .iter()
            .map(|bits| {
                bits.iter()
                    .zip(&self.bit_weights)
                    .filter(|(plane, _)| dot(plane, v) >= 0.0)
                    .map(|(_, w)| w)
                    .sum()
            })
            .collect()
    }

    fn add_to_buckets(&mut self, chunk_id: &str, keys: &[u64]) {
        for (t, &key) in keys.iter().enumerate() {
            self.tables[t].entry(key).or_default().insert(chunk_id.to_string());
        }
    }

    fn remove_from_buckets(&mut self, chunk_id: &str, keys: &[u64]) {
        for (t, &key) in keys.iter().enumerate() {
            if let Some(bucket) = self.tables[t].get_mut(&key) {
                bucket.remove(chunk_id);
            }
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl VectorIndex for SimHashLSHIndex {
    fn add_chunk(&mut self, chunk: &Chunk) -> Result<()> {
        if chunk.embedding.len() != self.dimension {
            return Err(VdbError::dimension_mismatch(self.dimension, chunk.embedding.len()));
        }
        let vec = self.normalize(&chunk.embedding);
        let keys = self.simhash_keys(&vec);
        self.vec_items.insert(chunk.id.clone(), VecItem { vec, keys: keys.clone() });
        self.add_to_buckets(&chunk.id, &keys);
        Ok(())
    }

    fn update_chunk(&mut self, chunk_id: &str, new_chunk: &Chunk) -> Result<bool> {
        if new_chunk.embedding.len() != self.dimension {
            return Err(VdbError::dimension_mismatch(self.dimension, new_chunk.embedding.len()));
        }
        let existed = self.vec_items.contains_key(chunk_id);
        if let Some(old) = self.vec_items.get(chunk_id) {
            let old_keys = old.keys.clone();
            self.remove_from_buckets(chunk_id, &old_keys);
        }

        let vec = self.normalize(&new_chunk.embedding);
        let keys = self.simhash_keys(&vec);
        self.vec_items.insert(chunk_id.to_string(), VecItem { vec, keys: keys.clone() });
        self.add_to_buckets(chunk_id, &keys);

        Ok(existed)
    }

    fn remove_chunk(&mut self, chunk_id: &str) -> bool {
        match self.vec_items.remove(chunk_id) {
            Some(item) => {
                self.remove_from_buckets(chunk_id, &item.keys);
                true
            }
            None => false,
        }
    }

    fn search(&self, query: &[f32], k: usize, _metadata_filters: Option<&Metadata>) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(VdbError::dimension_mismatch(self.dimension, query.len()));
        }

        let q = self.normalize(query);
        let qkeys = self.simhash_keys(&q);

        let mut candidates: HashSet<&String> = HashSet::new();
        for (t, &key) in qkeys.iter().enumerate() {
            if let Some(bucket) = self.tables[t].get(&key) {
                candidates.extend(bucket.iter());
            }
        }
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(String, f32)> = candidates
            .into_iter()
            .map(|id| {
                let v = &self.vec_items[id].vec;
                (id.clone(), dot(&q, v))
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored.into_iter().map(|(id, score)| SearchHit::new(id, score)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn complexity(&self) -> (&'static str, &'static str) {
        (
            "O(n_tables*n) + O(n_tables*n_bits*d)",
            "Build: O(n_tables*n_bits*n*d) | Query: O(n_tables*n_bits*d) + O(C*d + C log C)",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vdb_core::Metadata as Meta;

    fn chunk(id: &str, emb: Vec<f32>) -> Chunk {
        Chunk { id: id.to_string(), library_id: "lib".into(), document_id: "doc".into(), text: "t".into(), embedding: emb, metadata: Meta::new() }
    }

    fn seeded() -> SimHashLSHIndex {
        SimHashLSHIndex::with_config(4, LshConfig { n_bits: 8, n_tables: 4, rng_seed: 123 })
    }

    #[test]
    fn identical_vector_is_always_a_candidate() {
        let mut idx = seeded();
        idx.add_chunk(&chunk("a", vec![1.0, 0.0, 0.0, 0.0])).unwrap();
        let hits = idx.search(&[1.0, 0.0, 0.0, 0.0], 1, None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, "a");
    }

    #[test]
    fn k_zero_returns_empty() {
        let mut idx = seeded();
        idx.add_chunk(&chunk("a", vec![1.0, 0.0, 0.0, 0.0])).unwrap();
        assert!(idx.search(&[1.0, 0.0, 0.0, 0.0], 0, None).unwrap().is_empty());
    }

    #[test]
    fn empty_index_returns_empty() {
        let idx = seeded();
        assert!(idx.search(&[1.0, 0.0, 0.0, 0.0], 1, None).unwrap().is_empty());
    }

    #[test]
    fn no_matching_bucket_returns_empty() {
        let mut idx = seeded();
        idx.add_chunk(&chunk("a", vec![1.0, 0.0, 0.0, 0.0])).unwrap();
        idx.remove_chunk("a");
        assert!(idx.search(&[1.0, 0.0, 0.0, 0.0], 1, None).unwrap().is_empty());
    }

    #[test]
    fn update_of_unknown_id_inserts() {
        let mut idx = seeded();
        let existed = idx.update_chunk("new", &chunk("new", vec![1.0, 0.0, 0.0, 0.0])).unwrap();
        assert!(!existed);
        assert_eq!(idx.search(&[1.0, 0.0, 0.0, 0.0], 1, None).unwrap().len(), 1);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut idx = seeded();
        idx.add_chunk(&chunk("a", vec![1.0, 0.0, 0.0, 0.0])).unwrap();
        assert!(idx.remove_chunk("a"));
        assert!(!idx.remove_chunk("a"));
    }

    #[test]
    fn dimension_mismatch_on_add_is_rejected() {
        let mut idx = seeded();
        let err = idx.add_chunk(&chunk("a", vec![1.0, 0.0])).unwrap_err();
        assert!(matches!(err, VdbError::DimensionMismatch { expected: 4, got: 2 }));
    }
}
