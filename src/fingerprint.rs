//! Source file fingerprints and index staleness.
//!
//! The persisted index is valid only while the SHA-256 of the source
//! workbook matches the fingerprint stored in `hash.txt` next to it.

use sha2::{Digest, Sha256};
use std::path::Path;

/// Hex SHA-256 of a byte slice.
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Fingerprint the raw bytes of the file at `path`.
pub fn compute_hash(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(fingerprint_bytes(&bytes))
}

/// True when the index has to be rebuilt.
pub fn is_stale(current: &str, stored: Option<&str>, index_exists: bool) -> bool {
    if !index_exists {
        return true;
    }
    stored != Some(current)
}

/// Read a previously stored fingerprint, `None` if there is none.
pub fn read_stored_hash(path: &Path) -> std::io::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Overwrite the stored fingerprint.
pub fn write_stored_hash(path: &Path, hash: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, hash)
}
