//! Content hashing and cache-key construction
//!
//! Hashes are change-detection keys, not security primitives: SHA-256
//! truncated to 16 hex characters (64 bits) is plenty for telling two
//! versions of a script or block apart.

use mdvet_core::HASH_LEN;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Compute the truncated content hash of arbitrary text
///
/// Deterministic across platforms and process restarts: the digest is
/// taken over the exact UTF-8 bytes of `text`.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..HASH_LEN].to_string()
}

/// Hash a code block together with its language tag
///
/// Changing either the code or the tag forces a cache miss.
pub fn block_hash(code: &str, language_tag: &str) -> String {
    content_hash(&format!("{}{}", code, language_tag))
}

/// Cache key for a whole-script run
pub fn script_key(path: &Path) -> String {
    format!("script:{}", path.display())
}

/// Cache key for one markdown code block
pub fn block_key(file: &str, line: usize, hash: &str) -> String {
    format!("block:{}:{}:{}", file, line, hash)
}
