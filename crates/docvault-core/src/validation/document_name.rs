//! Document name and file type validation.
//!
//! Pure functions. Everything here runs before any storage or database I/O.

use crate::AppError;

pub const MAX_DOCUMENT_NAME_LENGTH: usize = 255;

/// Resolve a lower-case extension (no leading dot) to its MIME type.
pub fn mime_type_for_extension(extension: &str) -> Option<&'static str> {
    let mime = match extension {
        // Documents
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "odt" => "application/vnd.oasis.opendocument.text",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        "odp" => "application/vnd.oasis.opendocument.presentation",
        "rtf" => "application/rtf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "tsv" => "text/tab-separated-values",
        "json" => "application/json",
        "xml" => "application/xml",
        "html" | "htm" => "text/html",
        // Images
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        // Audio / video
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        // Archives
        "zip" => "application/zip",
        "tar" => "application/x-tar",
        "gz" => "application/gzip",
        "7z" => "application/x-7z-compressed",
        _ => return None,
    };
    Some(mime)
}

/// Normalize a caller-supplied extension: trims whitespace and one leading dot,
/// lower-cases the rest.
pub fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim();
    trimmed
        .strip_prefix('.')
        .unwrap_or(trimmed)
        .to_ascii_lowercase()
}

/// Substring after the last `.` of `name`.
///
/// Returns an empty string when there is no dot, when the dot is the last
/// character, or when the only dot is the leading one (hidden files).
pub fn get_extension(name: &str) -> &str {
    match name.rfind('.') {
        None | Some(0) => "",
        Some(idx) => {
            let ext = &name[idx + 1..];
            if ext.contains(&['/', '\\'][..]) {
                ""
            } else {
                ext
            }
        }
    }
}

/// Validate an extension / document name pair.
///
/// The MIME check runs first so an unsupported type is reported even when the
/// name is also malformed.
pub fn validate_file_and_document_name(
    extension: &str,
    document_name: &str,
    display_name_for_errors: &str,
) -> Result<(), AppError> {
    let extension = normalize_extension(extension);
    if extension.is_empty() || mime_type_for_extension(&extension).is_none() {
        return Err(AppError::UnsupportedFileType(format!(
            "File type of '{}' is not supported",
            display_name_for_errors
        )));
    }

    if document_name.trim().is_empty() {
        return Err(AppError::InvalidDocumentName(
            "Document name must not be empty".to_string(),
        ));
    }
    if document_name.chars().count() > MAX_DOCUMENT_NAME_LENGTH {
        return Err(AppError::InvalidDocumentName(format!(
            "Document name must be at most {} characters",
            MAX_DOCUMENT_NAME_LENGTH
        )));
    }
    if document_name.contains(&['/', '\\', '\0'][..]) {
        return Err(AppError::InvalidDocumentName(format!(
            "Document name '{}' must not contain path separators",
            display_name_for_errors
        )));
    }

    let embedded = get_extension(document_name).to_ascii_lowercase();
    if !embedded.is_empty() && mime_type_for_extension(&embedded).is_some() {
        return Err(AppError::InvalidDocumentName(format!(
            "Document name '{}' must not include a file extension",
            display_name_for_errors
        )));
    }

    Ok(())
}
