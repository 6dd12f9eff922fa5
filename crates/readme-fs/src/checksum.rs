//! SHA-256 content digests
//!
//! One canonical format (`sha256:<hex>`) is used for every fingerprint stored in
//! the identity store, so digests computed by different code paths compare equal.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, copy};
use std::path::Path;

use crate::{Error, Result};

const PREFIX: &str = "sha256:";

/// Digest of zero bytes. Every empty file shares it, so it never identifies
/// a file on its own.
pub const EMPTY_DIGEST: &str =
    "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Compute the digest of in-memory content.
pub fn content_digest(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{}{:x}", PREFIX, hasher.finalize())
}

/// Compute the digest of a file, streaming its contents.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be opened or read.
pub fn file_digest(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    copy(&mut reader, &mut hasher).map_err(|e| Error::io(path, e))?;
    Ok(format!("{}{:x}", PREFIX, hasher.finalize()))
}

/// Whether a digest may be used to recognise a file by content alone.
pub fn is_identifying(digest: &str) -> bool {
    digest != EMPTY_DIGEST
}
