//! HTTP surface: request/response types, error mapping, shared state and
//! route handlers. This module is the thin adapter `SPEC_FULL.md` §4.7
//! describes — it decodes requests, calls `vdb-service`, and maps results
//! back to responses. No invariant enforcement lives here.

pub mod error;
pub mod routes;
pub mod state;
pub mod types;

pub use routes::router;
pub use state::AppState;
