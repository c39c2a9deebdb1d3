//! Request/response envelope shared by every route handler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Standard API response wrapper. Errors are reported through [`super::error::ApiError`]
/// instead of this type's `error` field — a response that reaches the client
/// successfully serialized always has `success: true`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub metadata: ApiMetadata,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data, metadata: ApiMetadata { timestamp: Utc::now(), version: "v1".to_string() } }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiMetadata {
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateLibraryRequest {
    pub name: String,
    pub dims: usize,
    #[serde(default = "default_index_type")]
    pub index_type: String,
    #[serde(default)]
    pub metadata: vdb_core::Metadata,
}

fn default_index_type() -> String {
    "flat".to_string()
}

#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub title: String,
    #[serde(default)]
    pub metadata: vdb_core::Metadata,
}

#[derive(Debug, Deserialize)]
pub struct CreateChunkRequest {
    pub document_id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: vdb_core::Metadata,
}

#[derive(Debug, Deserialize)]
pub struct BatchCreateChunksRequest {
    pub chunks: Vec<CreateChunkRequest>,
}

#[derive(Debug, Deserialize)]
pub struct BatchDeleteChunksRequest {
    pub chunk_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchDeleteChunksResponse {
    pub deleted: usize,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub embedding: Vec<f32>,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default)]
    pub include_chunk: bool,
    #[serde(default)]
    pub metadata_filters: Option<vdb_core::Metadata>,
}

fn default_k() -> usize {
    10
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<vdb_core::SearchHit>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub library_id: String,
    pub index_type: String,
    pub dimension: usize,
    pub space_complexity: &'static str,
    pub time_complexity: &'static str,
    pub chunk_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct TrainIndexRequest {
    #[serde(default)]
    pub sample_vectors: Option<Vec<Vec<f32>>>,
}

#[derive(Debug, Serialize)]
pub struct OperationAccepted {
    pub library_id: String,
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct EmbedRequest {
    pub texts: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct EmbedResponse {
    pub embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateLibraryRequest {
    pub name: Option<String>,
    pub index_type: Option<String>,
    pub metadata: Option<vdb_core::Metadata>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateDocumentRequest {
    pub title: Option<String>,
    pub metadata: Option<vdb_core::Metadata>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateChunkRequest {
    pub text: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub metadata: Option<vdb_core::Metadata>,
}
