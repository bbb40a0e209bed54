//! Validation modules

pub mod document_name;
pub mod injection;

pub use document_name::{
    get_extension, mime_type_for_extension, normalize_extension, validate_file_and_document_name,
    MAX_DOCUMENT_NAME_LENGTH,
};
pub use injection::{contains_injection, ensure_safe_input};
