//! SurrealDB-backed storage implementation.

use std::sync::Arc;

use async_trait::async_trait;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use vdb_core::{Chunk, ChunkUpdate, Document, DocumentUpdate, Library, LibraryUpdate, Result, VdbError};

use crate::connection::ConnectionConfig;
use crate::traits::Storage;

/// Storage backed by an embedded or remote SurrealDB instance.
///
/// The client handle is a cheap, internally thread-safe multiplexer per the
/// `surrealdb` crate's own contract — there is no connection pool here, a
/// single shared `Arc<Surreal<Any>>` is the process-wide connection the
/// concurrency model calls for.
pub struct SurrealStorage {
    db: Arc<Surreal<Any>>,
}

impl SurrealStorage {
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        config.validate()?;
        let conn_str = config.connection_string()?;

        tracing::debug!(%conn_str, "connecting to surrealdb");
        let db = surrealdb::engine::any::connect(conn_str)
            .await
            .map_err(|e| VdbError::storage(format!("failed to connect: {e}")))?;

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .map_err(|e| VdbError::storage(format!("failed to select namespace/database: {e}")))?;

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            db.signin(surrealdb::opt::auth::Root { username, password })
                .await
                .map_err(|e| VdbError::storage(format!("authentication failed: {e}")))?;
        }

        Ok(Self { db: Arc::new(db) })
    }

    pub async fn with_schema(config: &ConnectionConfig) -> Result<Self> {
        let storage = Self::connect(config).await?;
        crate::schema::init_schema(&storage.db).await?;
        Ok(storage)
    }

    /// Strips `id` from a serialized content body: SurrealDB assigns the
    /// record id from the `(table, key)` tuple passed to `upsert`, and a
    /// duplicate `id` field in the body conflicts with it.
    fn content_without_id<T: serde::Serialize>(value: &T) -> Result<serde_json::Value> {
        let mut content =
            serde_json::to_value(value).map_err(|e| VdbError::storage(format!("failed to serialize: {e}")))?;
        if let Some(obj) = content.as_object_mut() {
            obj.remove("id");
        }
        Ok(content)
    }
}

#[async_trait]
impl Storage for SurrealStorage {
    async fn save_library(&self, library: &Library) -> Result<()> {
        let content = Self::content_without_id(library)?;
        let _: Option<serde_json::Value> = self
            .db
            .upsert(("libraries", library.id.clone()))
            .content(content)
            .await
            .map_err(|e| VdbError::storage(format!("failed to save library: {e}")))?;
        Ok(())
    }

    async fn load_library(&self, id: &str) -> Result<Option<Library>> {
        self.db
            .select(("libraries", id))
            .await
            .map_err(|e| VdbError::storage(format!("failed to load library: {e}")))
    }

    async fn load_all_libraries(&self) -> Result<Vec<Library>> {
        self.db
            .select("libraries")
            .await
            .map_err(|e| VdbError::storage(format!("failed to list libraries: {e}")))
    }

    async fn update_library(&self, id: &str, patch: LibraryUpdate) -> Result<Option<Library>> {
        let Some(mut lib) = self.load_library(id).await? else { return Ok(None) };
        if let Some(name) = patch.name {
            lib.name = name;
        }
        if let Some(index_type) = patch.index_type {
            lib.index_type = index_type;
        }
        if let Some(metadata) = patch.metadata {
            lib.metadata = metadata;
        }
        self.save_library(&lib).await?;
        Ok(Some(lib))
    }

    async fn delete_library(&self, id: &str) -> Result<bool> {
        let deleted: Option<serde_json::Value> = self
            .db
            .delete(("libraries", id))
            .await
            .map_err(|e| VdbError::storage(format!("failed to delete library: {e}")))?;
        Ok(deleted.is_some())
    }

    async fn save_document(&self, document: &Document) -> Result<()> {
        let content = Self::content_without_id(document)?;
        let _: Option<serde_json::Value> = self
            .db
            .upsert(("documents", document.id.clone()))
            .content(content)
            .await
            .map_err(|e| VdbError::storage(format!("failed to save document: {e}")))?;
        Ok(())
    }

    async fn load_document(&self, id: &str) -> Result<Option<Document>> {
        self.db
            .select(("documents", id))
            .await
            .map_err(|e| VdbError::storage(format!("failed to load document: {e}")))
    }

    async fn load_documents_for_library(&self, library_id: &str) -> Result<Vec<Document>> {
        let mut result = self
            .db
            .query("SELECT * FROM documents WHERE library_id = $library_id")
            .bind(("library_id", library_id.to_string()))
            .await
            .map_err(|e| VdbError::storage(format!("failed to load documents for library: {e}")))?;
        result.take(0).map_err(|e| VdbError::storage(format!("failed to parse documents: {e}")))
    }

    async fn update_document(&self, id: &str, patch: DocumentUpdate) -> Result<Option<Document>> {
        let Some(mut doc) = self.load_document(id).await? else { return Ok(None) };
        if let Some(title) = patch.title {
            doc.title = title;
        }
        if let Some(metadata) = patch.metadata {
            doc.metadata = metadata;
        }
        self.save_document(&doc).await?;
        Ok(Some(doc))
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        let deleted: Option<serde_json::Value> = self
            .db
            .delete(("documents", id))
            .await
            .map_err(|e| VdbError::storage(format!("failed to delete document: {e}")))?;
        Ok(deleted.is_some())
    }

    async fn delete_documents_for_library(&self, library_id: &str) -> Result<usize> {
        let mut result = self
            .db
            .query("DELETE documents WHERE library_id = $library_id RETURN BEFORE")
            .bind(("library_id", library_id.to_string()))
            .await
            .map_err(|e| VdbError::storage(format!("failed to delete documents for library: {e}")))?;
        let deleted: Vec<serde_json::Value> =
            result.take(0).map_err(|e| VdbError::storage(format!("failed to parse delete result: {e}")))?;
        Ok(deleted.len())
    }

    async fn save_chunk(&self, chunk: &Chunk) -> Result<()> {
        let content = Self::content_without_id(chunk)?;
        let _: Option<serde_json::Value> = self
            .db
            .upsert(("chunks", chunk.id.clone()))
            .content(content)
            .await
            .map_err(|e| VdbError::storage(format!("failed to save chunk: {e}")))?;
        Ok(())
    }

    async fn load_chunk(&self, id: &str) -> Result<Option<Chunk>> {
        self.db
            .select(("chunks", id))
            .await
            .map_err(|e| VdbError::storage(format!("failed to load chunk: {e}")))
    }

    async fn load_chunks_for_library(&self, library_id: &str) -> Result<Vec<Chunk>> {
        let mut result = self
            .db
            .query("SELECT * FROM chunks WHERE library_id = $library_id")
            .bind(("library_id", library_id.to_string()))
            .await
            .map_err(|e| VdbError::storage(format!("failed to load chunks for library: {e}")))?;
        result.take(0).map_err(|e| VdbError::storage(format!("failed to parse chunks: {e}")))
    }

    async fn load_chunks_for_document(&self, document_id: &str) -> Result<Vec<Chunk>> {
        let mut result = self
            .db
            .query("SELECT * FROM chunks WHERE document_id = $document_id")
            .bind(("document_id", document_id.to_string()))
            .await
            .map_err(|e| VdbError::storage(format!("failed to load chunks for document: {e}")))?;
        result.take(0).map_err(|e| VdbError::storage(format!("failed to parse chunks: {e}")))
    }

    async fn update_chunk(&self, id: &str, patch: ChunkUpdate) -> Result<Option<Chunk>> {
        let Some(mut chunk) = self.load_chunk(id).await? else { return Ok(None) };
        if let Some(text) = patch.text {
            chunk.text = text;
        }
        if let Some(embedding) = patch.embedding {
            chunk.embedding = embedding;
        }
        if let Some(metadata) = patch.metadata {
            chunk.metadata = metadata;
        }
        self.save_chunk(&chunk).await?;
        Ok(Some(chunk))
    }

    async fn delete_chunk(&self, id: &str) -> Result<bool> {
        let deleted: Option<serde_json::Value> = self
            .db
            .delete(("chunks", id))
            .await
            .map_err(|e| VdbError::storage(format!("failed to delete chunk: {e}")))?;
        Ok(deleted.is_some())
    }

    async fn delete_chunks_for_document(&self, document_id: &str) -> Result<usize> {
        let mut result = self
            .db
            .query("DELETE chunks WHERE document_id = $document_id RETURN BEFORE")
            .bind(("document_id", document_id.to_string()))
            .await
            .map_err(|e| VdbError::storage(format!("failed to delete chunks for document: {e}")))?;
        let deleted: Vec<serde_json::Value> =
            result.take(0).map_err(|e| VdbError::storage(format!("failed to parse delete result: {e}")))?;
        Ok(deleted.len())
    }

    async fn delete_chunks_for_library(&self, library_id: &str) -> Result<usize> {
        let mut result = self
            .db
            .query("DELETE chunks WHERE library_id = $library_id RETURN BEFORE")
            .bind(("library_id", library_id.to_string()))
            .await
            .map_err(|e| VdbError::storage(format!("failed to delete chunks for library: {e}")))?;
        let deleted: Vec<serde_json::Value> =
            result.take(0).map_err(|e| VdbError::storage(format!("failed to parse delete result: {e}")))?;
        Ok(deleted.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vdb_core::Metadata;

    #[tokio::test]
    async fn library_crud_round_trips() {
        let storage = SurrealStorage::with_schema(&ConnectionConfig::memory()).await.unwrap();
        let lib = Library::new("docs", 3, "flat", Metadata::new());
        storage.save_library(&lib).await.unwrap();

        let loaded = storage.load_library(&lib.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "docs");

        assert!(storage.delete_library(&lib.id).await.unwrap());
        assert!(storage.load_library(&lib.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn documents_filtered_by_library() {
        let storage = SurrealStorage::with_schema(&ConnectionConfig::memory()).await.unwrap();
        let lib_a = Library::new("a", 2, "flat", Metadata::new());
        let lib_b = Library::new("b", 2, "flat", Metadata::new());
        storage.save_library(&lib_a).await.unwrap();
        storage.save_library(&lib_b).await.unwrap();

        let doc_a = Document::new(lib_a.id.clone(), "doc-a", Metadata::new());
        let doc_b = Document::new(lib_b.id.clone(), "doc-b", Metadata::new());
        storage.save_document(&doc_a).await.unwrap();
        storage.save_document(&doc_b).await.unwrap();

        let docs = storage.load_documents_for_library(&lib_a.id).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, doc_a.id);
    }

    #[tokio::test]
    async fn cascade_delete_removes_chunks_for_library() {
        let storage = SurrealStorage::with_schema(&ConnectionConfig::memory()).await.unwrap();
        let lib = Library::new("docs", 2, "flat", Metadata::new());
        storage.save_library(&lib).await.unwrap();
        let doc = Document::new(lib.id.clone(), "doc", Metadata::new());
        storage.save_document(&doc).await.unwrap();

        for i in 0..4 {
            let chunk =
                Chunk::new(lib.id.clone(), doc.id.clone(), format!("chunk {i}"), vec![0.0, 0.0], Metadata::new());
            storage.save_chunk(&chunk).await.unwrap();
        }

        let deleted = storage.delete_chunks_for_library(&lib.id).await.unwrap();
        assert_eq!(deleted, 4);
        assert!(storage.load_chunks_for_library(&lib.id).await.unwrap().is_empty());
    }
}
