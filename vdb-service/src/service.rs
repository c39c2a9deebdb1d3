//! The vector database service: orchestrates persistence and the in-memory
//! index per library under the two-tier lock discipline described at the
//! crate root.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::RwLock as IndexLock;
use vdb_core::{Chunk, ChunkUpdate, Document, DocumentUpdate, Library, LibraryUpdate, Metadata, Result, SearchHit, VdbError};
use vdb_index::{IndexRegistry, VectorIndex};
use vdb_storage::Storage;

use crate::rwlock::AsyncRwLock;

/// A library's index, behind its own lock so the process-wide `maps` mutex
/// only ever guards the bookkeeping maps themselves, never the index
/// operation that follows.
type IndexHandle = Arc<IndexLock<Box<dyn VectorIndex>>>;

#[derive(Default)]
struct ServiceMaps {
    indexes: HashMap<String, IndexHandle>,
    locks: HashMap<String, Arc<AsyncRwLock>>,
    lib_index_type: HashMap<String, String>,
}

/// Manages per-library vector indexes on top of a [`Storage`] backend.
///
/// Owns the process-wide `maps` mutex (service lock) guarding `indexes`,
/// `locks` and `lib_index_type`; held only for the map lookup/insert itself,
/// never across a persistence call or an index mutation/search — those run
/// after `maps` is released, against the per-library `AsyncRwLock` turnstile
/// and the index's own `IndexHandle` lock.
pub struct VectorDbService {
    storage: Arc<dyn Storage>,
    registry: IndexRegistry,
    maps: AsyncMutex<ServiceMaps>,
}

impl VectorDbService {
    pub fn new(storage: Arc<dyn Storage>, registry: IndexRegistry) -> Result<Self> {
        if !registry.contains(registry.default_index_type()) {
            return Err(VdbError::config(format!(
                "default_index_type '{}' is not registered",
                registry.default_index_type()
            )));
        }
        Ok(Self { storage, registry, maps: AsyncMutex::new(ServiceMaps::default()) })
    }

    async fn idx_lock(&self, lib_id: &str) -> Arc<AsyncRwLock> {
        let mut maps = self.maps.lock().await;
        maps.locks.entry(lib_id.to_string()).or_insert_with(|| Arc::new(AsyncRwLock::new())).clone()
    }

    /// Builds (if absent) and returns a handle to the index for `lib_id`.
    /// Callers must already hold the library's write lock. Only holds `maps`
    /// for the map lookup/insert itself — the returned handle is locked and
    /// operated on after `maps` is released.
    fn ensure_index_locked(
        &self,
        maps: &mut ServiceMaps,
        lib_id: &str,
        dims: usize,
        index_type: Option<&str>,
    ) -> IndexHandle {
        if !maps.indexes.contains_key(lib_id) {
            let resolved = index_type.map(str::to_string).or_else(|| maps.lib_index_type.get(lib_id).cloned());
            let idx = self.registry.build(resolved.as_deref(), dims);
            maps.indexes.insert(lib_id.to_string(), Arc::new(IndexLock::new(idx)));
            if let Some(t) = resolved {
                maps.lib_index_type.insert(lib_id.to_string(), t.to_lowercase());
            }
        }
        maps.indexes.get(lib_id).expect("just ensured present").clone()
    }

    /// Self-heals the in-memory index from persistence if it isn't already
    /// materialized. Safe to call without holding the library lock.
    async fn ensure_index(&self, lib_id: &str, dims: usize, index_type: Option<&str>) -> Result<()> {
        {
            let maps = self.maps.lock().await;
            if maps.indexes.contains_key(lib_id) {
                return Ok(());
            }
        }

        let lock = self.idx_lock(lib_id).await;
        let _write = lock.write().await;
        {
            let maps = self.maps.lock().await;
            if maps.indexes.contains_key(lib_id) {
                return Ok(());
            }
        }

        let chunks = self.storage.load_chunks_for_library(lib_id).await?;
        let handle = {
            let mut maps = self.maps.lock().await;
            self.ensure_index_locked(&mut maps, lib_id, dims, index_type)
        };
        let mut idx = handle.write().await;
        for chunk in &chunks {
            idx.add_chunk(chunk)?;
        }
        Ok(())
    }

    // ---------------- libraries ----------------

    pub async fn create_library(
        &self,
        name: impl Into<String>,
        dims: usize,
        index_type: impl Into<String>,
        metadata: Metadata,
    ) -> Result<Library> {
        let lib = Library::new(name, dims, index_type, metadata);
        self.storage.save_library(&lib).await?;

        let idx = self.registry.build(Some(&lib.index_type), lib.dims);
        let mut maps = self.maps.lock().await;
        maps.indexes.insert(lib.id.clone(), Arc::new(IndexLock::new(idx)));
        maps.locks.entry(lib.id.clone()).or_insert_with(|| Arc::new(AsyncRwLock::new()));
        maps.lib_index_type.insert(lib.id.clone(), lib.index_type.to_lowercase());
        Ok(lib)
    }

    pub async fn get_library(&self, lib_id: &str) -> Result<Option<Library>> {
        self.storage.load_library(lib_id).await
    }

    pub async fn list_libraries(&self) -> Result<Vec<Library>> {
        self.storage.load_all_libraries().await
    }

    /// `patch` cannot name `dims` — it has no such field. A caller-visible
    /// attempt to change it is rejected before it ever reaches here.
    pub async fn update_library(&self, lib_id: &str, patch: LibraryUpdate) -> Result<Option<Library>> {
        let new_index_type = patch.index_type.clone();
        let updated = self.storage.update_library(lib_id, patch).await?;
        if updated.is_some() {
            if let Some(new_type) = new_index_type {
                let mut maps = self.maps.lock().await;
                maps.lib_index_type.insert(lib_id.to_string(), new_type.to_lowercase());
            }
        }
        Ok(updated)
    }

    pub async fn delete_library(&self, lib_id: &str) -> Result<bool> {
        let lock = self.idx_lock(lib_id).await;
        let deleted = {
            let _write = lock.write().await;
            if self.storage.load_library(lib_id).await?.is_none() {
                return Ok(false);
            }
            self.storage.delete_chunks_for_library(lib_id).await?;
            self.storage.delete_documents_for_library(lib_id).await?;
            self.storage.delete_library(lib_id).await?
        };

        let mut maps = self.maps.lock().await;
        maps.indexes.remove(lib_id);
        maps.locks.remove(lib_id);
        maps.lib_index_type.remove(lib_id);
        Ok(deleted)
    }

    // ---------------- documents ----------------

    pub async fn create_document(
        &self,
        lib_id: &str,
        title: impl Into<String>,
        metadata: Metadata,
    ) -> Result<Document> {
        if self.storage.load_library(lib_id).await?.is_none() {
            return Err(VdbError::parent_missing("library", lib_id));
        }
        let doc = Document::new(lib_id, title, metadata);
        self.storage.save_document(&doc).await?;
        Ok(doc)
    }

    pub async fn get_document(&self, doc_id: &str) -> Result<Option<Document>> {
        self.storage.load_document(doc_id).await
    }

    pub async fn list_documents(&self, lib_id: &str) -> Result<Vec<Document>> {
        if self.storage.load_library(lib_id).await?.is_none() {
            return Err(VdbError::parent_missing("library", lib_id));
        }
        self.storage.load_documents_for_library(lib_id).await
    }

    /// `patch` cannot name `library_id` for the same reason `dims` is
    /// absent from `LibraryUpdate`.
    pub async fn update_document(&self, doc_id: &str, patch: DocumentUpdate) -> Result<Option<Document>> {
        self.storage.update_document(doc_id, patch).await
    }

    pub async fn delete_document(&self, lib_id: &str, doc_id: &str) -> Result<bool> {
        match self.storage.load_document(doc_id).await? {
            Some(doc) if doc.library_id == lib_id => {}
            _ => return Ok(false),
        }

        let lock = self.idx_lock(lib_id).await;
        {
            let _write = lock.write().await;
            let chunks = self.storage.load_chunks_for_document(doc_id).await?;
            let handle = {
                let maps = self.maps.lock().await;
                maps.indexes.get(lib_id).cloned()
            };
            if let Some(handle) = handle {
                let mut idx = handle.write().await;
                for chunk in &chunks {
                    idx.remove_chunk(&chunk.id);
                }
            }
        }

        self.storage.delete_chunks_for_document(doc_id).await?;
        self.storage.delete_document(doc_id).await?;
        Ok(true)
    }

    // ---------------- chunks ----------------

    pub async fn create_chunk(
        &self,
        lib_id: &str,
        doc_id: &str,
        text: impl Into<String>,
        embedding: Vec<f32>,
        metadata: Metadata,
    ) -> Result<Chunk> {
        let lib =
            self.storage.load_library(lib_id).await?.ok_or_else(|| VdbError::parent_missing("library", lib_id))?;
        match self.storage.load_document(doc_id).await? {
            Some(doc) if doc.library_id == lib_id => {}
            _ => return Err(VdbError::parent_missing("document", doc_id)),
        }
        if embedding.len() != lib.dims {
            return Err(VdbError::dimension_mismatch(lib.dims, embedding.len()));
        }

        let chunk = Chunk::new(lib_id, doc_id, text, embedding, metadata);
        self.storage.save_chunk(&chunk).await?;

        let lock = self.idx_lock(lib_id).await;
        let _write = lock.write().await;
        let handle = {
            let mut maps = self.maps.lock().await;
            self.ensure_index_locked(&mut maps, lib_id, lib.dims, Some(&lib.index_type))
        };
        let mut idx = handle.write().await;
        idx.add_chunk(&chunk)?;
        Ok(chunk)
    }

    pub async fn get_chunk(&self, chunk_id: &str) -> Result<Option<Chunk>> {
        self.storage.load_chunk(chunk_id).await
    }

    pub async fn list_chunks(&self, lib_id: &str) -> Result<Vec<Chunk>> {
        if self.storage.load_library(lib_id).await?.is_none() {
            return Err(VdbError::parent_missing("library", lib_id));
        }
        self.storage.load_chunks_for_library(lib_id).await
    }

    pub async fn update_chunk(&self, lib_id: &str, chunk_id: &str, patch: ChunkUpdate) -> Result<Option<Chunk>> {
        match self.storage.load_chunk(chunk_id).await? {
            Some(chunk) if chunk.library_id == lib_id => {}
            _ => return Ok(None),
        }

        if let Some(embedding) = &patch.embedding {
            let lib =
                self.storage.load_library(lib_id).await?.ok_or_else(|| VdbError::parent_missing("library", lib_id))?;
            if embedding.len() != lib.dims {
                return Err(VdbError::dimension_mismatch(lib.dims, embedding.len()));
            }
        }

        let changes_embedding = patch.changes_embedding();
        let updated = self.storage.update_chunk(chunk_id, patch).await?;

        if let (Some(updated_chunk), true) = (&updated, changes_embedding) {
            let lib =
                self.storage.load_library(lib_id).await?.ok_or_else(|| VdbError::parent_missing("library", lib_id))?;
            let lock = self.idx_lock(lib_id).await;
            let _write = lock.write().await;
            let handle = {
                let mut maps = self.maps.lock().await;
                self.ensure_index_locked(&mut maps, lib_id, lib.dims, Some(&lib.index_type))
            };
            let mut idx = handle.write().await;
            idx.update_chunk(chunk_id, updated_chunk)?;
        }

        Ok(updated)
    }

    pub async fn delete_chunk(&self, lib_id: &str, chunk_id: &str) -> Result<bool> {
        let deleted = self.storage.delete_chunk(chunk_id).await?;
        if deleted {
            let lock = self.idx_lock(lib_id).await;
            let _write = lock.write().await;
            let handle = {
                let maps = self.maps.lock().await;
                maps.indexes.get(lib_id).cloned()
            };
            if let Some(handle) = handle {
                let mut idx = handle.write().await;
                idx.remove_chunk(chunk_id);
            }
        }
        Ok(deleted)
    }

    // ---------------- search and index operations ----------------

    pub async fn search(&self, lib_id: &str, query: &[f32], k: usize, include_chunk: bool) -> Result<Vec<SearchHit>> {
        let lib =
            self.storage.load_library(lib_id).await?.ok_or_else(|| VdbError::parent_missing("library", lib_id))?;
        if query.len() != lib.dims {
            return Err(VdbError::dimension_mismatch(lib.dims, query.len()));
        }

        self.ensure_index(lib_id, lib.dims, Some(&lib.index_type)).await?;

        let lock = self.idx_lock(lib_id).await;
        let mut hits = {
            let _read = lock.read().await;
            let handle = {
                let maps = self.maps.lock().await;
                maps.indexes.get(lib_id).cloned().ok_or(VdbError::NoIndex)?
            };
            let idx = handle.read().await;
            idx.search(query, k, None)?
        };

        if include_chunk {
            for hit in &mut hits {
                hit.chunk = self.storage.load_chunk(&hit.chunk_id).await?;
            }
        }
        Ok(hits)
    }

    pub async fn rebuild_index(&self, lib_id: &str) -> Result<()> {
        let lib =
            self.storage.load_library(lib_id).await?.ok_or_else(|| VdbError::parent_missing("library", lib_id))?;
        if !self.registry.contains(&lib.index_type) {
            return Err(VdbError::unsupported_index(lib.index_type.clone()));
        }

        let mut new_idx = self.registry.build(Some(&lib.index_type), lib.dims);
        for chunk in self.storage.load_chunks_for_library(lib_id).await? {
            new_idx.add_chunk(&chunk)?;
        }

        let lock = self.idx_lock(lib_id).await;
        let _write = lock.write().await;
        let mut maps = self.maps.lock().await;
        maps.indexes.insert(lib_id.to_string(), Arc::new(IndexLock::new(new_idx)));
        maps.lib_index_type.insert(lib_id.to_string(), lib.index_type.to_lowercase());
        Ok(())
    }

    pub async fn train_index(&self, lib_id: &str, sample_vectors: Option<Vec<Vec<f32>>>) -> Result<()> {
        let lib =
            self.storage.load_library(lib_id).await?.ok_or_else(|| VdbError::parent_missing("library", lib_id))?;
        if !self.registry.contains(&lib.index_type) {
            return Err(VdbError::unsupported_index(lib.index_type.clone()));
        }

        let lock = self.idx_lock(lib_id).await;
        let _write = lock.write().await;
        let handle = {
            let maps = self.maps.lock().await;
            maps.indexes.get(lib_id).cloned().ok_or(VdbError::NoIndex)?
        };
        let mut idx = handle.write().await;
        idx.train(sample_vectors.as_deref())
    }

    /// Diagnostics for `GET /libraries/{id}/stats`: the materialized index's
    /// dimension and `(space, time)` complexity strings, plus a persistence
    /// count of the library's chunks. Materializes the index first (same
    /// self-healing path `search` uses) so a process-restart doesn't report
    /// a spuriously absent index.
    pub async fn index_stats(&self, lib_id: &str) -> Result<(usize, &'static str, &'static str, usize)> {
        let lib =
            self.storage.load_library(lib_id).await?.ok_or_else(|| VdbError::parent_missing("library", lib_id))?;
        self.ensure_index(lib_id, lib.dims, Some(&lib.index_type)).await?;

        let chunk_count = self.storage.load_chunks_for_library(lib_id).await?.len();
        let handle = {
            let maps = self.maps.lock().await;
            maps.indexes.get(lib_id).cloned().ok_or(VdbError::NoIndex)?
        };
        let idx = handle.read().await;
        let (space, time) = idx.complexity();
        Ok((idx.dimension(), space, time, chunk_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vdb_storage::MemoryStorage;

    fn service() -> VectorDbService {
        VectorDbService::new(Arc::new(MemoryStorage::new()), vdb_index::default_registry()).unwrap()
    }

    #[tokio::test]
    async fn create_library_materializes_empty_index() {
        let svc = service();
        let lib = svc.create_library("docs", 2, "flat", Metadata::new()).await.unwrap();
        let hits = svc.search(&lib.id, &[1.0, 0.0], 5, false).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn create_document_fails_when_library_missing() {
        let svc = service();
        let err = svc.create_document("nope", "title", Metadata::new()).await.unwrap_err();
        assert!(matches!(err, VdbError::ParentMissing { .. }));
    }

    #[tokio::test]
    async fn create_chunk_validates_dimension() {
        let svc = service();
        let lib = svc.create_library("docs", 3, "flat", Metadata::new()).await.unwrap();
        let doc = svc.create_document(&lib.id, "doc", Metadata::new()).await.unwrap();

        let err = svc.create_chunk(&lib.id, &doc.id, "hi", vec![1.0, 0.0], Metadata::new()).await.unwrap_err();
        assert!(matches!(err, VdbError::DimensionMismatch { expected: 3, got: 2 }));
    }

    #[tokio::test]
    async fn create_chunk_and_search_round_trips() {
        let svc = service();
        let lib = svc.create_library("docs", 2, "flat", Metadata::new()).await.unwrap();
        let doc = svc.create_document(&lib.id, "doc", Metadata::new()).await.unwrap();
        svc.create_chunk(&lib.id, &doc.id, "hello", vec![1.0, 0.0], Metadata::new()).await.unwrap();

        let hits = svc.search(&lib.id, &[1.0, 0.0], 1, true).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].chunk.is_some());
    }

    #[tokio::test]
    async fn index_stats_reports_dimension_and_chunk_count() {
        let svc = service();
        let lib = svc.create_library("docs", 2, "flat", Metadata::new()).await.unwrap();
        let doc = svc.create_document(&lib.id, "doc", Metadata::new()).await.unwrap();
        svc.create_chunk(&lib.id, &doc.id, "a", vec![1.0, 0.0], Metadata::new()).await.unwrap();
        svc.create_chunk(&lib.id, &doc.id, "b", vec![0.0, 1.0], Metadata::new()).await.unwrap();

        let (dim, _space, _time, count) = svc.index_stats(&lib.id).await.unwrap();
        assert_eq!(dim, 2);
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn delete_document_cascades_chunks_out_of_index() {
        let svc = service();
        let lib = svc.create_library("docs", 2, "flat", Metadata::new()).await.unwrap();
        let doc = svc.create_document(&lib.id, "doc", Metadata::new()).await.unwrap();
        svc.create_chunk(&lib.id, &doc.id, "hello", vec![1.0, 0.0], Metadata::new()).await.unwrap();

        assert!(svc.delete_document(&lib.id, &doc.id).await.unwrap());
        let hits = svc.search(&lib.id, &[1.0, 0.0], 5, false).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn delete_library_removes_state_and_delete_is_idempotent() {
        let svc = service();
        let lib = svc.create_library("docs", 2, "flat", Metadata::new()).await.unwrap();

        assert!(svc.delete_library(&lib.id).await.unwrap());
        assert!(!svc.delete_library(&lib.id).await.unwrap());
        assert!(svc.get_library(&lib.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn search_on_ivf_before_train_fails_not_trained() {
        let svc = service();
        let lib = svc.create_library("docs", 2, "ivf", Metadata::new()).await.unwrap();
        let doc = svc.create_document(&lib.id, "doc", Metadata::new()).await.unwrap();
        svc.create_chunk(&lib.id, &doc.id, "hello", vec![1.0, 0.0], Metadata::new()).await.unwrap();

        let err = svc.search(&lib.id, &[1.0, 0.0], 1, false).await.unwrap_err();
        assert!(matches!(err, VdbError::NotTrained));
    }

    #[tokio::test]
    async fn train_then_search_ivf_succeeds() {
        let svc = service();
        let lib = svc.create_library("docs", 2, "ivf", Metadata::new()).await.unwrap();
        let doc = svc.create_document(&lib.id, "doc", Metadata::new()).await.unwrap();
        svc.create_chunk(&lib.id, &doc.id, "a", vec![1.0, 0.0], Metadata::new()).await.unwrap();
        svc.create_chunk(&lib.id, &doc.id, "b", vec![0.0, 1.0], Metadata::new()).await.unwrap();

        svc.train_index(&lib.id, None).await.unwrap();
        let hits = svc.search(&lib.id, &[1.0, 0.0], 1, false).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn rebuild_index_rejects_unsupported_type_by_bypassing_registry() {
        let svc = service();
        let lib = svc.create_library("docs", 2, "flat", Metadata::new()).await.unwrap();
        svc.storage
            .update_library(&lib.id, LibraryUpdate { index_type: Some("nonexistent".into()), ..Default::default() })
            .await
            .unwrap();

        let err = svc.rebuild_index(&lib.id).await.unwrap_err();
        assert!(matches!(err, VdbError::UnsupportedIndex(_)));
    }
}
