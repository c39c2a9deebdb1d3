//! Persistence layer for the vector database service.
//!
//! [`traits::Storage`] is the contract the service depends on; [`memory`]
//! and [`surreal`] are its two implementations — an in-process map for
//! tests and light deployments, and an embedded/remote SurrealDB backing
//! for anything that must survive a restart.

pub mod connection;
pub mod memory;
pub mod schema;
pub mod surreal;
pub mod traits;

pub use connection::{ConnectionConfig, ConnectionMode};
pub use memory::MemoryStorage;
pub use surreal::SurrealStorage;
pub use traits::Storage;

pub mod prelude {
    pub use crate::connection::{ConnectionConfig, ConnectionMode};
    pub use crate::memory::MemoryStorage;
    pub use crate::surreal::SurrealStorage;
    pub use crate::traits::Storage;
}
