//! Database repositories for data access layer
//
// Repository contract shared by every backend
pub mod repository;
//
// Postgres-backed document repository
pub mod document;
//
// In-memory document repository
pub mod memory;

pub use document::PgDocumentRepository;
pub use memory::InMemoryDocumentRepository;
pub use repository::{DocumentChange, DocumentRepository, VersionWrite};
