//! Database schema for the vector database service.

/// SurrealQL schema: libraries, documents and chunks, each schemaless on
/// `metadata` (a free-form string map) but schemafull otherwise.
pub const SCHEMA: &str = r#"
DEFINE TABLE libraries SCHEMAFULL;
DEFINE TABLE documents SCHEMAFULL;
DEFINE TABLE chunks SCHEMAFULL;

DEFINE FIELD name ON libraries TYPE string;
DEFINE FIELD dims ON libraries TYPE int;
DEFINE FIELD index_type ON libraries TYPE string;
DEFINE FIELD metadata ON libraries TYPE object;

DEFINE FIELD library_id ON documents TYPE string;
DEFINE FIELD title ON documents TYPE string;
DEFINE FIELD metadata ON documents TYPE object;

DEFINE INDEX documents_library ON documents FIELDS library_id;

DEFINE FIELD library_id ON chunks TYPE string;
DEFINE FIELD document_id ON chunks TYPE string;
DEFINE FIELD text ON chunks TYPE string;
DEFINE FIELD embedding ON chunks TYPE array<float>;
DEFINE FIELD metadata ON chunks TYPE object;

DEFINE INDEX chunks_library ON chunks FIELDS library_id;
DEFINE INDEX chunks_document ON chunks FIELDS document_id;
"#;

/// Applies [`SCHEMA`] to a connected database. Idempotent: `DEFINE TABLE`
/// and `DEFINE FIELD` overwrite their prior definitions rather than erroring.
pub async fn init_schema(db: &surrealdb::Surreal<impl surrealdb::Connection>) -> vdb_core::Result<()> {
    tracing::info!("initializing vector database schema");
    db.query(SCHEMA)
        .await
        .map_err(|e| vdb_core::VdbError::storage(format!("failed to initialize schema: {e}")))?
        .check()
        .map_err(|e| vdb_core::VdbError::storage(format!("schema initialization rejected: {e}")))?;
    Ok(())
}
