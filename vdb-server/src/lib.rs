//! HTTP bootstrap for the vector database service.
//!
//! This crate is the external collaborator the core spec treats as out of
//! scope: it wires [`vdb_service::VectorDbService`] to an axum router, an
//! external embedding provider, and process configuration. See
//! `SPEC_FULL.md` §4.7-4.8 for what it is and is not responsible for.

pub mod api;
pub mod config;
pub mod embedding;

pub use config::AppConfig;
