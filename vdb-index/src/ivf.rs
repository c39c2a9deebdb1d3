//! Inverted File (IVF) index: FAISS-style coarse quantization over cosine
//! k-means centroids. Must be trained before any add/update/search besides
//! the initial bulk-load window (`is_initializing`).

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use vdb_core::{l2_norm, Chunk, Metadata, Result, SearchHit, VdbError};

use crate::config::IvfConfig;
use crate::index::VectorIndex;

pub struct IVFIndex {
    dimension: usize,
    n_clusters: usize,
    n_probes: usize,
    train_iters: usize,
    rng: StdRng,

    /// Unit-norm cluster centers. `None` until the first successful `train`.
    centroids: Option<Vec<Vec<f32>>>,
    inverted_lists: HashMap<usize, HashSet<String>>,
    chunk_vectors: HashMap<String, Vec<f32>>,
    chunk_to_cluster: HashMap<String, usize>,

    /// Lets chunks accumulate before the first `train` call without erroring;
    /// flips to `false` permanently on the first successful `train`.
    is_initializing: bool,
}

impl IVFIndex {
    pub fn new(dimension: usize) -> Self {
        Self::with_config(dimension, IvfConfig::default())
    }

    pub fn with_config(dimension: usize, cfg: IvfConfig) -> Self {
        let cfg = cfg.normalized();
        Self {
            dimension,
            n_clusters: cfg.n_clusters,
            n_probes: cfg.n_probes,
            train_iters: cfg.train_iters,
            rng: StdRng::seed_from_u64(cfg.rng_seed),
            centroids: None,
            inverted_lists: (0..cfg.n_clusters).map(|i| (i, HashSet::new())).collect(),
            chunk_vectors: HashMap::new(),
            chunk_to_cluster: HashMap::new(),
            is_initializing: true,
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

    fn ensure_trained(&self) -> Result<()> {
        if self.centroids.is_none() {
            return Err(VdbError::NotTrained);
        }
        Ok(())
    }

    fn assign_cluster(&mut self, chunk_id: &str, vec: &[f32]) {
        let centroids = self.centroids.as_ref().expect("assign_cluster requires trained centroids");
        let cid = argmax_dot(centroids, vec);
        self.inverted_lists.entry(cid).or_default().insert(chunk_id.to_string());
        self.chunk_to_cluster.insert(chunk_id.to_string(), cid);
    }

    fn kmeans(&mut self, x: &[Vec<f32>], k: usize, iters: usize) -> Vec<Vec<f32>> {
        let n = x.len();
        let k = k.min(n).max(1);

        let xn: Vec<Vec<f32>> = x.iter().map(|v| self.normalize(v)).collect();

        let init = sample(&mut self.rng, n, k).into_vec();
        let mut centers: Vec<Vec<f32>> = init.iter().map(|&i| xn[i].clone()).collect();

        for _ in 0..iters {
            let labels: Vec<usize> = xn.iter().map(|v| argmax_dot(&centers, v)).collect();

            let dim = self.dimension;
            let mut sums = vec![vec![0.0f32; dim]; k];
            let mut counts = vec![0u32; k];
            for (v, &label) in xn.iter().zip(&labels) {
                counts[label] += 1;
                for (s, x) in sums[label].iter_mut().zip(v) {
                    *s += x;
                }
            }

            let mut empty_indices = Vec::new();
            let mut new_centers = centers.clone();
            for c in 0..k {
                if counts[c] == 0 {
                    empty_indices.push(c);
                    continue;
                }
                let mean: Vec<f32> = sums[c].iter().map(|s| s / counts[c] as f32).collect();
                let norm = l2_norm(&mean) + 1e-12;
                new_centers[c] = mean.iter().map(|x| x / norm).collect();
            }

            if !empty_indices.is_empty() {
                let reseed = sample(&mut self.rng, n, empty_indices.len()).into_vec();
                for (c, idx) in empty_indices.into_iter().zip(reseed) {
                    new_centers[c] = xn[idx].clone();
                }
            }

            let converged = new_centers.iter().zip(&centers).all(|(a, b)| {
                a.iter().zip(b).all(|(x, y)| (x - y).abs() <= 1e-7 + 1e-5 * y.abs())
            });
            centers = new_centers;
            if converged {
                break;
            }
        }

        centers
    }
}

fn argmax_dot(centroids: &[Vec<f32>], v: &[f32]) -> usize {
    centroids
        .iter()
        .enumerate()
        .map(|(i, c)| (i, dot(c, v)))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
        .expect("centroids must be non-empty")
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl VectorIndex for IVFIndex {
    fn add_chunk(&mut self, chunk: &Chunk) -> Result<()> {
        if chunk.embedding.len() != self.dimension {
            return Err(VdbError::dimension_mismatch(self.dimension, chunk.embedding.len()));
        }
        let v = self.normalize(&chunk.embedding);
        self.chunk_vectors.insert(chunk.id.clone(), v.clone());

        if !self.is_initializing {
            self.ensure_trained()?;
            self.assign_cluster(&chunk.id, &v);
        }
        Ok(())
    }

    fn update_chunk(&mut self, chunk_id: &str, new_chunk: &Chunk) -> Result<bool> {
        if !self.is_initializing {
            self.ensure_trained()?;
        }
        if new_chunk.embedding.len() != self.dimension {
            return Err(VdbError::dimension_mismatch(self.dimension, new_chunk.embedding.len()));
        }

        let existed = self.chunk_vectors.contains_key(chunk_id);
        let v = self.normalize(&new_chunk.embedding);
        self.chunk_vectors.insert(chunk_id.to_string(), v.clone());

        if !self.is_initializing {
            if let Some(old) = self.chunk_to_cluster.remove(chunk_id) {
                self.inverted_lists.entry(old).or_default().remove(chunk_id);
            }
            self.assign_cluster(chunk_id, &v);
        }
        Ok(existed)
    }

    fn remove_chunk(&mut self, chunk_id: &str) -> bool {
        let mut removed = self.chunk_vectors.remove(chunk_id).is_some();
        if let Some(cid) = self.chunk_to_cluster.remove(chunk_id) {
            self.inverted_lists.entry(cid).or_default().remove(chunk_id);
            removed = true;
        }
        removed
    }

    fn search(&self, query: &[f32], k: usize, _metadata_filters: Option<&Metadata>) -> Result<Vec<SearchHit>> {
        self.ensure_trained()?;
        if k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(VdbError::dimension_mismatch(self.dimension, query.len()));
        }

        let centroids = self.centroids.as_ref().expect("checked by ensure_trained");
        let q = self.normalize(query);
        let n_probe = self.n_probes.min(centroids.len());

        let mut ranked_clusters: Vec<(usize, f32)> =
            centroids.iter().enumerate().map(|(i, c)| (i, dot(c, &q))).collect();
        ranked_clusters.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut candidates: Vec<&String> = Vec::new();
        for &(cid, _) in ranked_clusters.iter().take(n_probe) {
            if let Some(list) = self.inverted_lists.get(&cid) {
                candidates.extend(list.iter());
            }
        }
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(String, f32)> = candidates
            .into_iter()
            .map(|cid| {
                let v = &self.chunk_vectors[cid];
                (cid.clone(), dot(&q, v))
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored.into_iter().map(|(id, score)| SearchHit::new(id, score)).collect())
    }

    fn train(&mut self, sample_vectors: Option<&[Vec<f32>]>) -> Result<()> {
        let owned;
        let x: &[Vec<f32>] = match sample_vectors {
            Some(v) => v,
            None => {
                owned = self.chunk_vectors.values().cloned().collect::<Vec<_>>();
                &owned
            }
        };
        if x.is_empty() {
            return Err(VdbError::NothingToTrain);
        }

        let centers = self.kmeans(x, self.n_clusters, self.train_iters);
        let k_actual = centers.len();
        self.centroids = Some(centers);

        self.inverted_lists = (0..k_actual).map(|i| (i, HashSet::new())).collect();
        self.chunk_to_cluster.clear();

        let ids_and_vecs: Vec<(String, Vec<f32>)> =
            self.chunk_vectors.iter().map(|(id, v)| (id.clone(), v.clone())).collect();
        for (id, v) in ids_and_vecs {
            self.assign_cluster(&id, &v);
        }

        self.is_initializing = false;
        Ok(())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn complexity(&self) -> (&'static str, &'static str) {
        ("O(n) + O(k*d)", "Build: O(n*k*iters) k-means | Query: O(n_probes*avg_list*d) + O(m log m)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vdb_core::Metadata as Meta;

    fn chunk(id: &str, emb: Vec<f32>) -> Chunk {
        Chunk { id: id.to_string(), library_id: "lib".into(), document_id: "doc".into(), text: "t".into(), embedding: emb, metadata: Meta::new() }
    }

    fn seeded(n_clusters: usize) -> IVFIndex {
        IVFIndex::with_config(2, IvfConfig { n_clusters, n_probes: 2, train_iters: 10, rng_seed: 7 })
    }

    #[test]
    fn search_before_train_fails_not_trained() {
        let idx = seeded(2);
        let err = idx.search(&[1.0, 0.0], 1, None).unwrap_err();
        assert!(matches!(err, VdbError::NotTrained));
    }

    #[test]
    fn add_before_train_is_allowed_during_initialization() {
        let mut idx = seeded(2);
        idx.add_chunk(&chunk("a", vec![1.0, 0.0])).unwrap();
        idx.add_chunk(&chunk("b", vec![0.0, 1.0])).unwrap();
    }

    #[test]
    fn train_on_empty_index_fails_nothing_to_train() {
        let mut idx = seeded(2);
        let err = idx.train(None).unwrap_err();
        assert!(matches!(err, VdbError::NothingToTrain));
    }

    #[test]
    fn train_then_search_finds_nearest_cluster_member() {
        let mut idx = seeded(2);
        idx.add_chunk(&chunk("a", vec![1.0, 0.0])).unwrap();
        idx.add_chunk(&chunk("b", vec![0.0, 1.0])).unwrap();
        idx.add_chunk(&chunk("c", vec![0.9, 0.1])).unwrap();
        idx.train(None).unwrap();

        let hits = idx.search(&[1.0, 0.0], 1, None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, "a");
    }

    #[test]
    fn post_train_add_assigns_cluster_immediately() {
        let mut idx = seeded(2);
        idx.add_chunk(&chunk("a", vec![1.0, 0.0])).unwrap();
        idx.add_chunk(&chunk("b", vec![0.0, 1.0])).unwrap();
        idx.train(None).unwrap();

        idx.add_chunk(&chunk("c", vec![0.95, 0.05])).unwrap();
        let hits = idx.search(&[1.0, 0.0], 2, None).unwrap();
        assert!(hits.iter().any(|h| h.chunk_id == "c"));
    }

    #[test]
    fn remove_then_search_excludes_removed_chunk() {
        let mut idx = seeded(1);
        idx.add_chunk(&chunk("a", vec![1.0, 0.0])).unwrap();
        idx.add_chunk(&chunk("b", vec![0.0, 1.0])).unwrap();
        idx.train(None).unwrap();

        assert!(idx.remove_chunk("a"));
        let hits = idx.search(&[1.0, 0.0], 2, None).unwrap();
        assert!(!hits.iter().any(|h| h.chunk_id == "a"));
    }

    #[test]
    fn k_zero_returns_empty_after_train() {
        let mut idx = seeded(1);
        idx.add_chunk(&chunk("a", vec![1.0, 0.0])).unwrap();
        idx.train(None).unwrap();
        assert!(idx.search(&[1.0, 0.0], 0, None).unwrap().is_empty());
    }
}
