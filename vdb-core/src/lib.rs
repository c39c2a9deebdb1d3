//! Core types and abstractions for the vector database service.
//!
//! This crate provides the data model (libraries, documents, chunks), the
//! similarity metric abstraction, error handling and configuration shared by
//! the index, storage, service and server crates.

pub mod config;
pub mod error;
pub mod models;
pub mod similarity;

pub use config::CoreConfig;
pub use error::{Result, VdbError};
pub use models::*;
pub use similarity::{Cosine, L2Distance, Manhattan, SimilarityMetric};

/// Re-export of the commonly used types.
pub mod prelude {
    pub use crate::config::CoreConfig;
    pub use crate::error::{Result, VdbError};
    pub use crate::models::*;
    pub use crate::similarity::{Cosine, L2Distance, Manhattan, SimilarityMetric};
}
