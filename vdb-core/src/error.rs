//! Error types for the vector database service.

/// Result type alias for vector database operations.
pub type Result<T> = std::result::Result<T, VdbError>;

/// Main error type shared by the index, storage and service layers.
///
/// Variant names line up with the error kinds a caller needs to branch on
/// (dimension checks, missing parents, index lifecycle); everything else
/// collapses into `Storage`/`Internal`.
#[derive(Debug, thiserror::Error)]
pub enum VdbError {
    /// A library or document referenced by a create/search call does not exist.
    #[error("parent {resource} {id} does not exist")]
    ParentMissing { resource: &'static str, id: String },

    /// The target id does not exist for an update/delete.
    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },

    /// A vector's length does not match the library's declared dimension.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Caller attempted to change an immutable field (`dims`, `library_id`).
    #[error("invalid update: {0}")]
    InvalidUpdate(String),

    /// `index_type` is not present in the service's registry.
    #[error("unsupported index type: {0}")]
    UnsupportedIndex(String),

    /// An IVF search or post-init mutation was attempted before the first
    /// successful `train`.
    #[error("index is not trained yet")]
    NotTrained,

    /// `train_index` was called but no index is materialized for the library.
    #[error("no index materialized for this library")]
    NoIndex,

    /// `train_index` was called with neither explicit samples nor cached vectors.
    #[error("nothing to train on: no samples and no cached vectors")]
    NothingToTrain,

    /// Persistence-layer failure (connection, query, (de)serialization).
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration errors raised at startup or from bad registry lookups.
    #[error("configuration error: {0}")]
    Config(String),

    /// Catch-all for invariant violations that don't fit a typed kind above.
    #[error("internal error: {0}")]
    Internal(String),
}

impl VdbError {
    pub fn parent_missing(resource: &'static str, id: impl Into<String>) -> Self {
        Self::ParentMissing { resource, id: id.into() }
    }

    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { resource, id: id.into() }
    }

    pub fn dimension_mismatch(expected: usize, got: usize) -> Self {
        Self::DimensionMismatch { expected, got }
    }

    pub fn invalid_update(msg: impl Into<String>) -> Self {
        Self::InvalidUpdate(msg.into())
    }

    pub fn unsupported_index(index_type: impl Into<String>) -> Self {
        Self::UnsupportedIndex(index_type.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::ParentMissing { .. })
    }
}
