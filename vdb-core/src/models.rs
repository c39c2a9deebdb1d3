//! Data model for libraries, documents and chunks.
//!
//! These are the entities the service persists and the shapes the in-memory
//! indexes are built from. All three carry a server-assigned UUID `id` and a
//! free-form `metadata` string map.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type Metadata = HashMap<String, String>;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// A container of documents and chunks sharing a common dimension and index type.
///
/// `dims` is immutable after creation: the in-memory index is keyed on it,
/// and letting it drift would desync the index from the chunks collection it
/// projects. `index_type` can change via [`LibraryUpdate`]; the in-memory
/// index itself only picks up the new type once the index is rebuilt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Library {
    pub id: String,
    pub name: String,
    pub dims: usize,
    pub index_type: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Library {
    pub fn new(name: impl Into<String>, dims: usize, index_type: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            dims,
            index_type: index_type.into(),
            metadata,
        }
    }
}

/// A logical grouping of chunks within a library.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub library_id: String,
    pub title: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    pub fn new(library_id: impl Into<String>, title: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            id: new_id(),
            library_id: library_id.into(),
            title: title.into(),
            metadata,
        }
    }
}

/// The indexed unit: a piece of text together with its embedding vector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub library_id: String,
    pub document_id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Chunk {
    pub fn new(
        library_id: impl Into<String>,
        document_id: impl Into<String>,
        text: impl Into<String>,
        embedding: Vec<f32>,
        metadata: Metadata,
    ) -> Self {
        Self {
            id: new_id(),
            library_id: library_id.into(),
            document_id: document_id.into(),
            text: text.into(),
            embedding,
            metadata,
        }
    }
}

/// Shallow-field patch for `Library::update`. `dims` is intentionally absent
/// from this type: the server layer rejects a request that names it with
/// `InvalidUpdate` before ever constructing one of these.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibraryUpdate {
    pub name: Option<String>,
    pub index_type: Option<String>,
    pub metadata: Option<Metadata>,
}

/// Shallow-field patch for `Document::update`. `library_id` is absent for the
/// same reason `dims` is absent from `LibraryUpdate` — see there.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentUpdate {
    pub title: Option<String>,
    pub metadata: Option<Metadata>,
}

/// Shallow-field patch for `Chunk::update`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkUpdate {
    pub text: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub metadata: Option<Metadata>,
}

impl ChunkUpdate {
    pub fn changes_embedding(&self) -> bool {
        self.embedding.is_some()
    }
}

/// One hit returned from an index search, optionally hydrated with its chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk_id: String,
    pub similarity_score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk: Option<Chunk>,
}

impl SearchHit {
    pub fn new(chunk_id: impl Into<String>, similarity_score: f32) -> Self {
        Self { chunk_id: chunk_id.into(), similarity_score, chunk: None }
    }
}

/// A similarity search request against a library's index.
///
/// `metadata_filters` is accepted on the wire but has no semantic effect in
/// this core — see `VectorIndex::search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub embedding: Vec<f32>,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default)]
    pub metadata_filters: Option<Metadata>,
}

fn default_k() -> usize {
    10
}
