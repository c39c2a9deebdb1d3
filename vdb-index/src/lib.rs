//! In-memory vector index variants for the vector database service.
//!
//! Each library owns exactly one index instance, built by [`IndexRegistry`]
//! from its declared `index_type`. All three variants implement
//! [`VectorIndex`]:
//!
//! - [`flat::FlatIndex`] — exact scan, any [`vdb_core::SimilarityMetric`].
//! - [`ivf::IVFIndex`] — cosine-only, requires `train` before search.
//! - [`lsh::SimHashLSHIndex`] — cosine-only, approximate, no training step.

pub mod config;
pub mod flat;
pub mod index;
pub mod ivf;
pub mod lsh;

pub use index::{IndexConstructor, IndexRegistry, VectorIndex};

/// Builds an [`IndexRegistry`] with `"flat"`, `"ivf"` and `"lsh_simhash"`
/// registered against their zero-config constructors, defaulting to `"flat"`
/// when a library doesn't name a type.
pub fn default_registry() -> IndexRegistry {
    let mut registry = IndexRegistry::new("flat");
    registry
        .register("flat", |d| Box::new(flat::FlatIndex::new(d)))
        .register("ivf", |d| Box::new(ivf::IVFIndex::new(d)))
        .register("lsh_simhash", |d| Box::new(lsh::SimHashLSHIndex::new(d)));
    registry
}

pub mod prelude {
    pub use crate::config::{IvfConfig, LshConfig};
    pub use crate::flat::FlatIndex;
    pub use crate::index::{IndexConstructor, IndexRegistry, VectorIndex};
    pub use crate::ivf::IVFIndex;
    pub use crate::lsh::SimHashLSHIndex;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_resolves_all_three_variants() {
        let registry = default_registry();
        assert!(registry.contains("flat"));
        assert!(registry.contains("ivf"));
        assert!(registry.contains("lsh_simhash"));
        assert_eq!(registry.default_index_type(), "flat");

        let idx = registry.build(Some("ivf"), 8);
        assert_eq!(idx.dimension(), 8);
    }
}
