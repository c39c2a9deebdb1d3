//! In-memory `Storage` implementation. Useful for tests and as the default
//! backing when no persistent store is configured.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use vdb_core::{Chunk, ChunkUpdate, Document, DocumentUpdate, Library, LibraryUpdate, Result};

use crate::traits::Storage;

#[derive(Default)]
pub struct MemoryStorage {
    libraries: RwLock<HashMap<String, Library>>,
    documents: RwLock<HashMap<String, Document>>,
    chunks: RwLock<HashMap<String, Chunk>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn save_library(&self, library: &Library) -> Result<()> {
        self.libraries.write().insert(library.id.clone(), library.clone());
        Ok(())
    }

    async fn load_library(&self, id: &str) -> Result<Option<Library>> {
        Ok(self.libraries.read().get(id).cloned())
    }

    async fn load_all_libraries(&self) -> Result<Vec<Library>> {
        Ok(self.libraries.read().values().cloned().collect())
    }

    async fn update_library(&self, id: &str, patch: LibraryUpdate) -> Result<Option<Library>> {
        let mut libraries = self.libraries.write();
        let Some(lib) = libraries.get_mut(id) else { return Ok(None) };
        if let Some(name) = patch.name {
            lib.name = name;
        }
        if let Some(index_type) = patch.index_type {
            lib.index_type = index_type;
        }
        if let Some(metadata) = patch.metadata {
            lib.metadata = metadata;
        }
        Ok(Some(lib.clone()))
    }

    async fn delete_library(&self, id: &str) -> Result<bool> {
        Ok(self.libraries.write().remove(id).is_some())
    }

    async fn save_document(&self, document: &Document) -> Result<()> {
        self.documents.write().insert(document.id.clone(), document.clone());
        Ok(())
    }

    async fn load_document(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.documents.read().get(id).cloned())
    }

    async fn load_documents_for_library(&self, library_id: &str) -> Result<Vec<Document>> {
        Ok(self.documents.read().values().filter(|d| d.library_id == library_id).cloned().collect())
    }

    async fn update_document(&self, id: &str, patch: DocumentUpdate) -> Result<Option<Document>> {
        let mut documents = self.documents.write();
        let Some(doc) = documents.get_mut(id) else { return Ok(None) };
        if let Some(title) = patch.title {
            doc.title = title;
        }
        if let Some(metadata) = patch.metadata {
            doc.metadata = metadata;
        }
        Ok(Some(doc.clone()))
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        Ok(self.documents.write().remove(id).is_some())
    }

    async fn delete_documents_for_library(&self, library_id: &str) -> Result<usize> {
        let mut documents = self.documents.write();
        let before = documents.len();
        documents.retain(|_, d| d.library_id != library_id);
        Ok(before - documents.len())
    }

    async fn save_chunk(&self, chunk: &Chunk) -> Result<()> {
        self.chunks.write().insert(chunk.id.clone(), chunk.clone());
        Ok(())
    }

    async fn load_chunk(&self, id: &str) -> Result<Option<Chunk>> {
        Ok(self.chunks.read().get(id).cloned())
    }

    async fn load_chunks_for_library(&self, library_id: &str) -> Result<Vec<Chunk>> {
        Ok(self.chunks.read().values().filter(|c| c.library_id == library_id).cloned().collect())
    }

    async fn load_chunks_for_document(&self, document_id: &str) -> Result<Vec<Chunk>> {
        Ok(self.chunks.read().values().filter(|c| c.document_id == document_id).cloned().collect())
    }

    async fn update_chunk(&self, id: &str, patch: ChunkUpdate) -> Result<Option<Chunk>> {
        let mut chunks = self.chunks.write();
        let Some(chunk) = chunks.get_mut(id) else { return Ok(None) };
        if let Some(text) = patch.text {
            chunk.text = text;
        }
        if let Some(embedding) = patch.embedding {
            chunk.embedding = embedding;
        }
        if let Some(metadata) = patch.metadata {
            chunk.metadata = metadata;
        }
        Ok(Some(chunk.clone()))
    }

    async fn delete_chunk(&self, id: &str) -> Result<bool> {
        Ok(self.chunks.write().remove(id).is_some())
    }

    async fn delete_chunks_for_document(&self, document_id: &str) -> Result<usize> {
        let mut chunks = self.chunks.write();
        let before = chunks.len();
        chunks.retain(|_, c| c.document_id != document_id);
        Ok(before - chunks.len())
    }

    async fn delete_chunks_for_library(&self, library_id: &str) -> Result<usize> {
        let mut chunks = self.chunks.write();
        let before = chunks.len();
        chunks.retain(|_, c| c.library_id != library_id);
        Ok(before - chunks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vdb_core::Metadata;

    #[tokio::test]
    async fn library_crud_round_trips() {
        let storage = MemoryStorage::new();
        let lib = Library::new("docs", 3, "flat", Metadata::new());
        storage.save_library(&lib).await.unwrap();

        assert_eq!(storage.load_library(&lib.id).await.unwrap(), Some(lib.clone()));
        assert_eq!(storage.load_all_libraries().await.unwrap().len(), 1);

        let updated = storage
            .update_library(&lib.id, LibraryUpdate { name: Some("renamed".into()), ..Default::default() })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "renamed");

        assert!(storage.delete_library(&lib.id).await.unwrap());
        assert!(storage.load_library(&lib.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cascade_delete_counts_match_scope() {
        let storage = MemoryStorage::new();
        let lib = Library::new("docs", 2, "flat", Metadata::new());
        let doc = Document::new(lib.id.clone(), "doc1", Metadata::new());
        storage.save_library(&lib).await.unwrap();
        storage.save_document(&doc).await.unwrap();

        for i in 0..3 {
            let chunk = Chunk::new(lib.id.clone(), doc.id.clone(), format!("chunk {i}"), vec![0.0; 2], Metadata::new());
            storage.save_chunk(&chunk).await.unwrap();
        }

        assert_eq!(storage.delete_chunks_for_document(&doc.id).await.unwrap(), 3);
        assert!(storage.load_chunks_for_library(&lib.id).await.unwrap().is_empty());
    }
}
