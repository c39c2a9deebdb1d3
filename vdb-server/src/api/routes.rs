//! Route handlers. Each handler decodes its request, calls exactly one
//! `VectorDbService` method, and maps the result to a response — no business
//! logic lives here, per `SPEC_FULL.md` §9's "outer shell" design note.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use vdb_core::{ChunkUpdate, DocumentUpdate, LibraryUpdate};

use super::error::{ApiError, ApiResult};
use super::state::AppState;
use super::types::*;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/v1/embed", post(embed))
        .route("/v1/libraries", post(create_library).get(list_libraries))
        .route("/v1/libraries/{id}", get(get_library).patch(update_library).delete(delete_library))
        .route("/v1/libraries/{id}/stats", get(stats))
        .route("/v1/libraries/{id}/index/rebuild", post(rebuild_index))
        .route("/v1/libraries/{id}/index/train", post(train_index))
        .route("/v1/libraries/{id}/search", post(search))
        .route("/v1/libraries/{id}/documents", post(create_document).get(list_documents))
        .route("/v1/documents/{id}", get(get_document).patch(update_document))
        .route("/v1/libraries/{lib_id}/documents/{doc_id}", delete(delete_document))
        .route("/v1/libraries/{id}/chunks", post(create_chunk).get(list_chunks))
        .route("/v1/libraries/{id}/chunks/batch", post(batch_create_chunks))
        .route("/v1/libraries/{id}/chunks/batch/delete", post(batch_delete_chunks))
        .route("/v1/chunks/{id}", get(get_chunk))
        .route("/v1/libraries/{lib_id}/chunks/{chunk_id}", patch(update_chunk).delete(delete_chunk))
        .with_state(Arc::new(state))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy", version: env!("CARGO_PKG_VERSION") })
}

async fn embed(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EmbedRequest>,
) -> ApiResult<Json<EmbedResponse>> {
    if req.texts.is_empty() {
        return Err(ApiError::bad_request("texts must not be empty"));
    }
    let embeddings = state.embedding.embed_batch(&req.texts).await?;
    Ok(Json(EmbedResponse { embeddings }))
}

// ---------------- libraries ----------------

async fn create_library(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateLibraryRequest>,
) -> ApiResult<Json<ApiResponse<vdb_core::Library>>> {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("name must not be empty"));
    }
    if req.dims == 0 {
        return Err(ApiError::bad_request("dims must be greater than zero"));
    }
    let lib = state.service.create_library(req.name, req.dims, req.index_type, req.metadata).await?;
    Ok(Json(ApiResponse::ok(lib)))
}

async fn list_libraries(State(state): State<Arc<AppState>>) -> ApiResult<Json<ApiResponse<Vec<vdb_core::Library>>>> {
    let libs = state.service.list_libraries().await?;
    Ok(Json(ApiResponse::ok(libs)))
}

async fn get_library(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<vdb_core::Library>>> {
    let lib = state.service.get_library(&id).await?.ok_or_else(|| vdb_core::VdbError::not_found("library", id.as_str()))?;
    Ok(Json(ApiResponse::ok(lib)))
}

async fn update_library(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateLibraryRequest>,
) -> ApiResult<Json<ApiResponse<vdb_core::Library>>> {
    let patch = LibraryUpdate { name: req.name, index_type: req.index_type, metadata: req.metadata };
    let lib = state.service.update_library(&id, patch).await?.ok_or_else(|| vdb_core::VdbError::not_found("library", id.as_str()))?;
    Ok(Json(ApiResponse::ok(lib)))
}

async fn delete_library(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Json<ApiResponse<bool>>> {
    let deleted = state.service.delete_library(&id).await?;
    Ok(Json(ApiResponse::ok(deleted)))
}

async fn stats(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Json<ApiResponse<StatsResponse>>> {
    let lib = state.service.get_library(&id).await?.ok_or_else(|| vdb_core::VdbError::not_found("library", id.as_str()))?;
    let (dimension, space_complexity, time_complexity, chunk_count) = state.service.index_stats(&id).await?;
    Ok(Json(ApiResponse::ok(StatsResponse {
        library_id: id,
        index_type: lib.index_type,
        dimension,
        space_complexity,
        time_complexity,
        chunk_count,
    })))
}

async fn rebuild_index(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<OperationAccepted>>> {
    state.service.rebuild_index(&id).await?;
    Ok(Json(ApiResponse::ok(OperationAccepted { library_id: id, status: "accepted" })))
}

async fn train_index(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<TrainIndexRequest>,
) -> ApiResult<Json<ApiResponse<OperationAccepted>>> {
    state.service.train_index(&id, req.sample_vectors).await?;
    Ok(Json(ApiResponse::ok(OperationAccepted { library_id: id, status: "accepted" })))
}

async fn search(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SearchRequest>,
) -> ApiResult<Json<ApiResponse<SearchResponse>>> {
    let results = state.service.search(&id, &req.embedding, req.k, req.include_chunk).await?;
    Ok(Json(ApiResponse::ok(SearchResponse { results })))
}

// ---------------- documents ----------------

async fn create_document(
    State(state): State<Arc<AppState>>,
    Path(lib_id): Path<String>,
    Json(req): Json<CreateDocumentRequest>,
) -> ApiResult<Json<ApiResponse<vdb_core::Document>>> {
    if req.title.trim().is_empty() {
        return Err(ApiError::bad_request("title must not be empty"));
    }
    let doc = state.service.create_document(&lib_id, req.title, req.metadata).await?;
    Ok(Json(ApiResponse::ok(doc)))
}

async fn list_documents(
    State(state): State<Arc<AppState>>,
    Path(lib_id): Path<String>,
) -> ApiResult<Json<ApiResponse<Vec<vdb_core::Document>>>> {
    let docs = state.service.list_documents(&lib_id).await?;
    Ok(Json(ApiResponse::ok(docs)))
}

async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<vdb_core::Document>>> {
    let doc = state.service.get_document(&id).await?.ok_or_else(|| vdb_core::VdbError::not_found("document", id.as_str()))?;
    Ok(Json(ApiResponse::ok(doc)))
}

async fn update_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateDocumentRequest>,
) -> ApiResult<Json<ApiResponse<vdb_core::Document>>> {
    let patch = DocumentUpdate { title: req.title, metadata: req.metadata };
    let doc = state.service.update_document(&id, patch).await?.ok_or_else(|| vdb_core::VdbError::not_found("document", id.as_str()))?;
    Ok(Json(ApiResponse::ok(doc)))
}

async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path((lib_id, doc_id)): Path<(String, String)>,
) -> ApiResult<Json<ApiResponse<bool>>> {
    let deleted = state.service.delete_document(&lib_id, &doc_id).await?;
    Ok(Json(ApiResponse::ok(deleted)))
}

// ---------------- chunks ----------------

async fn create_chunk(
    State(state): State<Arc<AppState>>,
    Path(lib_id): Path<String>,
    Json(req): Json<CreateChunkRequest>,
) -> ApiResult<Json<ApiResponse<vdb_core::Chunk>>> {
    if req.text.trim().is_empty() {
        return Err(ApiError::bad_request("text must not be empty"));
    }
    let chunk = state.service.create_chunk(&lib_id, &req.document_id, req.text, req.embedding, req.metadata).await?;
    Ok(Json(ApiResponse::ok(chunk)))
}

async fn batch_create_chunks(
    State(state): State<Arc<AppState>>,
    Path(lib_id): Path<String>,
    Json(req): Json<BatchCreateChunksRequest>,
) -> ApiResult<Json<ApiResponse<Vec<vdb_core::Chunk>>>> {
    if req.chunks.is_empty() {
        return Err(ApiError::bad_request("chunks batch must not be empty"));
    }
    let mut created = Vec::with_capacity(req.chunks.len());
    for item in req.chunks {
        let chunk = state.service.create_chunk(&lib_id, &item.document_id, item.text, item.embedding, item.metadata).await?;
        created.push(chunk);
    }
    Ok(Json(ApiResponse::ok(created)))
}

async fn batch_delete_chunks(
    State(state): State<Arc<AppState>>,
    Path(lib_id): Path<String>,
    Json(req): Json<BatchDeleteChunksRequest>,
) -> ApiResult<Json<ApiResponse<BatchDeleteChunksResponse>>> {
    // Best-effort atomic with respect to membership at validation time: every
    // id is checked against `lib_id` before any delete is issued, but no lock
    // is held across the two passes (see SPEC_FULL.md / spec.md §9).
    for chunk_id in &req.chunk_ids {
        match state.service.get_chunk(chunk_id).await? {
            Some(chunk) if chunk.library_id == lib_id => {}
            _ => return Err(ApiError::bad_request(format!("chunk {chunk_id} does not belong to library {lib_id}"))),
        }
    }

    let mut deleted = 0usize;
    for chunk_id in &req.chunk_ids {
        if state.service.delete_chunk(&lib_id, chunk_id).await? {
            deleted += 1;
        }
    }
    Ok(Json(ApiResponse::ok(BatchDeleteChunksResponse { deleted })))
}

async fn list_chunks(
    State(state): State<Arc<AppState>>,
    Path(lib_id): Path<String>,
) -> ApiResult<Json<ApiResponse<Vec<vdb_core::Chunk>>>> {
    let chunks = state.service.list_chunks(&lib_id).await?;
    Ok(Json(ApiResponse::ok(chunks)))
}

async fn get_chunk(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<vdb_core::Chunk>>> {
    let chunk = state.service.get_chunk(&id).await?.ok_or_else(|| vdb_core::VdbError::not_found("chunk", id.as_str()))?;
    Ok(Json(ApiResponse::ok(chunk)))
}

async fn update_chunk(
    State(state): State<Arc<AppState>>,
    Path((lib_id, chunk_id)): Path<(String, String)>,
    Json(req): Json<UpdateChunkRequest>,
) -> ApiResult<Json<ApiResponse<vdb_core::Chunk>>> {
    let patch = ChunkUpdate { text: req.text, embedding: req.embedding, metadata: req.metadata };
    let chunk = state
        .service
        .update_chunk(&lib_id, &chunk_id, patch)
        .await?
        .ok_or_else(|| vdb_core::VdbError::not_found("chunk", chunk_id.as_str()))?;
    Ok(Json(ApiResponse::ok(chunk)))
}

async fn delete_chunk(
    State(state): State<Arc<AppState>>,
    Path((lib_id, chunk_id)): Path<(String, String)>,
) -> ApiResult<Json<ApiResponse<bool>>> {
    let deleted = state.service.delete_chunk(&lib_id, &chunk_id).await?;
    Ok(Json(ApiResponse::ok(deleted)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use vdb_core::Metadata;
    use vdb_service::VectorDbService;
    use vdb_storage::MemoryStorage;

    use super::*;
    use crate::config::EmbeddingConfig;
    use crate::embedding::EmbeddingClient;

    fn test_app() -> Router {
        let service = Arc::new(VectorDbService::new(Arc::new(MemoryStorage::new()), vdb_index::default_registry()).unwrap());
        let embedding = Arc::new(EmbeddingClient::new(EmbeddingConfig::default()).unwrap());
        router(AppState { service, embedding, start_time: std::time::Instant::now() })
    }

    #[tokio::test]
    async fn health_endpoint_reports_healthy() {
        let app = test_app();
        let response = app.oneshot(Request::get("/healthz").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn create_library_with_empty_name_is_rejected() {
        let app = test_app();
        let body = serde_json::to_string(&serde_json::json!({ "name": "", "dims": 3 })).unwrap();
        let response = app
            .oneshot(Request::post("/v1/libraries").header("content-type", "application/json").body(Body::from(body)).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn get_unknown_library_is_404() {
        let app = test_app();
        let response = app.oneshot(Request::get("/v1/libraries/nonexistent").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_library_then_search_round_trips() {
        let service = Arc::new(VectorDbService::new(Arc::new(MemoryStorage::new()), vdb_index::default_registry()).unwrap());
        let embedding = Arc::new(EmbeddingClient::new(EmbeddingConfig::default()).unwrap());
        let lib = service.create_library("docs", 2, "flat", Metadata::new()).await.unwrap();
        let app = router(AppState { service, embedding, start_time: std::time::Instant::now() });

        let body = serde_json::to_string(&serde_json::json!({ "embedding": [1.0, 0.0], "k": 5 })).unwrap();
        let response = app
            .oneshot(
                Request::post(format!("/v1/libraries/{}/search", lib.id))
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
