//! # mdvet-cache
//!
//! Content hashing and the versioned on-disk result cache.
//!
//! Two cache-key namespaces share one store: `script:<path>` for
//! whole-script runs and `block:<file>:<line>:<hash>` for individual
//! markdown code blocks.

mod hash;
mod store;

pub use hash::{block_hash, block_key, content_hash, script_key};
pub use store::{Cache, CacheEntry, CacheStats, CacheStore};
