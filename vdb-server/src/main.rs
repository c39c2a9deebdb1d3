//! Vector database service — HTTP bootstrap.
//!
//! Loads configuration, connects to the configured persistence backend,
//! builds the index registry and [`vdb_service::VectorDbService`], then
//! serves the HTTP API described in `SPEC_FULL.md` §4.7.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vdb_server::api::{router, AppState};
use vdb_server::config::AppConfig;
use vdb_server::embedding::EmbeddingClient;
use vdb_service::VectorDbService;
use vdb_storage::{ConnectionConfig, MemoryStorage, Storage, SurrealStorage};

#[derive(Parser)]
#[command(name = "vdb-server")]
#[command(about = "Vector database service", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overridden by `RUST_LOG`.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::info!(bind = %config.bind_addr(), backend = %config.database.backend, "starting vector database service");

    let mut registry = vdb_index::default_registry();
    if !registry.contains(&config.default_index_type) {
        anyhow::bail!("default_index_type '{}' is not registered", config.default_index_type);
    }
    registry.set_default_index_type(&config.default_index_type);

    let storage = build_storage(&config).await.context("failed to initialize storage backend")?;
    let service = Arc::new(VectorDbService::new(storage, registry).context("failed to construct vector database service")?);
    let embedding = Arc::new(EmbeddingClient::new(config.embedding.clone()).context("failed to construct embedding client")?);

    let state = AppState { service, embedding, start_time: Instant::now() };
    let app = router(state).layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await.context("failed to bind listener")?;
    tracing::info!("listening on http://{}", config.bind_addr());
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

async fn build_storage(config: &AppConfig) -> Result<Arc<dyn Storage>> {
    match config.database.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryStorage::new())),
        _ => {
            let conn_config: ConnectionConfig = config.connection_config()?;
            let storage = SurrealStorage::with_schema(&conn_config).await?;
            Ok(Arc::new(storage))
        }
    }
}

fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::registry().with(filter).with(tracing_subscriber::fmt::layer()).init();
}
