//! SHA-256 content fingerprints, lowercase hex.

use docvault_storage::{ByteStream, StorageError};
use futures::StreamExt;
use sha2::{Digest, Sha256};

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Hash a stored object chunk by chunk without buffering it.
pub async fn sha256_stream(mut stream: ByteStream) -> Result<String, StorageError> {
    let mut hasher = Sha256::new();
    while let Some(chunk) = stream.next().await {
        hasher.update(&chunk?);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Case-insensitive hex comparison, ignoring surrounding whitespace.
pub fn fingerprints_match(stored: &str, supplied: &str) -> bool {
    stored.trim().eq_ignore_ascii_case(supplied.trim())
}
