pub mod document;
pub mod version;

pub use document::{DocumentRecord, DocumentState, NewDocument, PresignedUpload};
pub use version::DocumentVersion;
