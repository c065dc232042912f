use std::fs;
use std::path::Path;
use sha2::{Digest, Sha256};

use crate::error::{ErrorContext, NobusError, Result};

/// Compute the SHA-256 digest of a file's full contents as lowercase hex.
///
/// Fails with `NotFound` when `path` is not an existing regular file
/// (symlinks are followed).
pub fn hash_file(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(NobusError::not_found("file", path.display()));
    }

    let bytes = fs::read(path)
        .with_io_context(|| format!("reading file {}", path.display()))?;

    Ok(compute_content_hash(&bytes))
}

/// Hash the concatenation of already computed digests, in the given order.
pub fn hash_concat<I, S>(hashes: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = Sha256::new();
    for hash in hashes {
        hasher.update(hash.as_ref().as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Compute hash for arbitrary content
pub fn compute_content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let digest = hasher.finalize();
    format!("{:x}", digest)
}

/// Generate a short hash (first 12 characters) for display purposes
pub fn short_hash(full_hash: &str) -> String {
    full_hash.chars().take(12).collect()
}
