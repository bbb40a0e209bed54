//! Docvault DB Library
//!
//! The document record store: the [`DocumentRepository`] trait, a Postgres
//! implementation built on sqlx and an in-memory implementation for tests and
//! database-less deployments.

pub mod db;

pub use db::{
    DocumentChange, DocumentRepository, InMemoryDocumentRepository, PgDocumentRepository,
    VersionWrite,
};
