//! Shared application state handed to every axum handler.

use std::sync::Arc;
use std::time::Instant;

use vdb_service::VectorDbService;

use crate::embedding::EmbeddingClient;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<VectorDbService>,
    pub embedding: Arc<EmbeddingClient>,
    pub start_time: Instant,
}
