//! SHA-256 content digests
//!
//! Provides the single canonical digest format (`sha256:<hex>`) used for
//! drift detection and the optimistic concurrency check in the orchestrator.

use sha2::{Digest, Sha256};
use std::path::Path;

use crate::{Error, Result};

/// Prefix for all digests produced by this module
const PREFIX: &str = "sha256:";

/// Compute the digest of in-memory content.
///
/// Returns a string in the canonical format `"sha256:<hex>"`.
pub fn content_digest(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{}{:x}", PREFIX, hasher.finalize())
}

/// Compute the digest of a file's current on-disk bytes.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn file_digest(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    Ok(content_digest(&bytes))
}
