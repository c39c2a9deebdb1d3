//! Orchestration layer for the vector database: a writer-preferring
//! per-library lock ([`rwlock::AsyncRwLock`]) and the [`service::VectorDbService`]
//! that uses it to keep each library's in-memory index consistent with its
//! persisted chunks.

pub mod rwlock;
pub mod service;

pub use rwlock::AsyncRwLock;
pub use service::VectorDbService;

pub mod prelude {
    pub use crate::rwlock::AsyncRwLock;
    pub use crate::service::VectorDbService;
}
