//! The abstract vector index contract and its constructor registry.
//!
//! An index is a library-scoped, in-memory structure that accelerates top-k
//! similarity search over a set of chunk vectors. Mutation methods are
//! ordinary `&mut self` calls rather than `async fn`: they are pure CPU work
//! with no I/O, and the service layer is what serializes access to them
//! under the per-library write lock (see `vdb-service`).

use std::collections::HashMap;

use vdb_core::{Chunk, Metadata, Result, SearchHit};

/// Polymorphic vector index. One instance lives per library.
pub trait VectorIndex: Send + Sync {
    /// Insert a chunk's embedding. Fails with `DimensionMismatch` if
    /// `chunk.embedding.len()` doesn't match the index's dimension.
    fn add_chunk(&mut self, chunk: &Chunk) -> Result<()>;

    /// Replace the vector stored for `chunk_id`, or insert it as new if
    /// absent. Returns whether it already existed.
    fn update_chunk(&mut self, chunk_id: &str, new_chunk: &Chunk) -> Result<bool>;

    /// Drop a chunk from the index. Returns whether it was present.
    fn remove_chunk(&mut self, chunk_id: &str) -> bool;

    /// Search for the `k` nearest chunks to `query` by the index's metric.
    ///
    /// Returns an empty list when `k == 0` or the index holds no vectors.
    /// `metadata_filters` is accepted for interface symmetry with the
    /// public API but has no semantic effect in this core.
    fn search(&self, query: &[f32], k: usize, metadata_filters: Option<&Metadata>) -> Result<Vec<SearchHit>>;

    /// Train the index on `sample_vectors`, or on its cached vectors if
    /// `None`. A no-op for variants that don't require training (the
    /// default implementation).
    fn train(&mut self, sample_vectors: Option<&[Vec<f32>]>) -> Result<()> {
        let _ = sample_vectors;
        Ok(())
    }

    /// The dimension this index was constructed with.
    fn dimension(&self) -> usize;

    /// `(space_complexity, time_complexity)` as human-readable strings, for
    /// diagnostics (`GET /libraries/{id}/stats` surfaces this).
    fn complexity(&self) -> (&'static str, &'static str);
}

/// Builds a fresh, empty index instance for a given dimension.
pub type IndexConstructor = fn(usize) -> Box<dyn VectorIndex>;

/// Maps a lowercased index type name (`"flat"`, `"ivf"`, `"lsh_simhash"`) to
/// the constructor that builds that variant.
///
/// `resolve` is the only way the service looks up a constructor: unknown
/// names fall back to `default_index_type`, matching the create_library
/// contract in the spec.
pub struct IndexRegistry {
    constructors: HashMap<String, IndexConstructor>,
    default_index_type: String,
}

impl IndexRegistry {
    pub fn new(default_index_type: impl Into<String>) -> Self {
        Self { constructors: HashMap::new(), default_index_type: default_index_type.into() }
    }

    pub fn register(&mut self, name: impl Into<String>, ctor: IndexConstructor) -> &mut Self {
        self.constructors.insert(name.into(), ctor);
        self
    }

    pub fn contains(&self, index_type: &str) -> bool {
        self.constructors.contains_key(&index_type.to_lowercase())
    }

    pub fn default_index_type(&self) -> &str {
        &self.default_index_type
    }

    /// Overrides the fallback type `resolve` uses for `None`/unregistered
    /// names. Used at startup to apply the configured `default_index_type`
    /// to the stock registry built by `default_registry`.
    pub fn set_default_index_type(&mut self, index_type: impl Into<String>) {
        self.default_index_type = index_type.into();
    }

    /// Resolve `index_type` (case-insensitively) to a constructor, falling
    /// back to the default type when the name is absent or unregistered.
    pub fn resolve(&self, index_type: Option<&str>) -> IndexConstructor {
        let name = index_type.map(str::to_lowercase).unwrap_or_else(|| self.default_index_type.clone());
        *self
            .constructors
            .get(&name)
            .unwrap_or_else(|| self.constructors.get(&self.default_index_type)
                .expect("default_index_type must be registered"))
    }

    pub fn build(&self, index_type: Option<&str>, dimension: usize) -> Box<dyn VectorIndex> {
        (self.resolve(index_type))(dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flat::FlatIndex;

    #[test]
    fn unregistered_type_falls_back_to_default() {
        let mut reg = IndexRegistry::new("flat");
        reg.register("flat", |d| Box::new(FlatIndex::new(d)));

        let idx = reg.build(Some("nonexistent"), 4);
        assert_eq!(idx.dimension(), 4);
    }

    #[test]
    fn contains_is_case_insensitive() {
        let mut reg = IndexRegistry::new("flat");
        reg.register("flat", |d| Box::new(FlatIndex::new(d)));
        assert!(reg.contains("FLAT"));
        assert!(!reg.contains("ivf"));
    }
}
