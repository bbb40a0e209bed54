pub mod documents;
pub mod download;
