//! The persistence contract the vector database service consumes.
//!
//! Three collections — libraries, documents, chunks — each keyed by a
//! server-assigned string id. The service holds no assumptions about the
//! backing store beyond this trait's shapes: it never issues raw queries.

use async_trait::async_trait;
use vdb_core::{Chunk, ChunkUpdate, Document, DocumentUpdate, Library, LibraryUpdate, Result};

#[async_trait]
pub trait Storage: Send + Sync {
    // ---------------- libraries ----------------
    async fn save_library(&self, library: &Library) -> Result<()>;
    async fn load_library(&self, id: &str) -> Result<Option<Library>>;
    async fn load_all_libraries(&self) -> Result<Vec<Library>>;
    /// Applies `patch`'s present fields. Rejects attempts to change `dims`
    /// with `InvalidUpdate` rather than silently ignoring them.
    async fn update_library(&self, id: &str, patch: LibraryUpdate) -> Result<Option<Library>>;
    async fn delete_library(&self, id: &str) -> Result<bool>;

    // ---------------- documents ----------------
    async fn save_document(&self, document: &Document) -> Result<()>;
    async fn load_document(&self, id: &str) -> Result<Option<Document>>;
    async fn load_documents_for_library(&self, library_id: &str) -> Result<Vec<Document>>;
    async fn update_document(&self, id: &str, patch: DocumentUpdate) -> Result<Option<Document>>;
    async fn delete_document(&self, id: &str) -> Result<bool>;
    async fn delete_documents_for_library(&self, library_id: &str) -> Result<usize>;

    // ---------------- chunks ----------------
    async fn save_chunk(&self, chunk: &Chunk) -> Result<()>;
    async fn load_chunk(&self, id: &str) -> Result<Option<Chunk>>;
    async fn load_chunks_for_library(&self, library_id: &str) -> Result<Vec<Chunk>>;
    async fn load_chunks_for_document(&self, document_id: &str) -> Result<Vec<Chunk>>;
    async fn update_chunk(&self, id: &str, patch: ChunkUpdate) -> Result<Option<Chunk>>;
    async fn delete_chunk(&self, id: &str) -> Result<bool>;
    async fn delete_chunks_for_document(&self, document_id: &str) -> Result<usize>;
    async fn delete_chunks_for_library(&self, library_id: &str) -> Result<usize>;
}
