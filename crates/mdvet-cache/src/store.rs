//! Versioned on-disk result cache
//!
//! A single JSON file maps cache keys to result records. Two record
//! shapes share the map, distinguished by a serde tag so deserialization
//! validates the fields expected per kind. A missing, corrupt, or
//! version-mismatched file degrades to an empty cache: a broken cache
//! must never block validation, only slow it down.

use chrono::{DateTime, Utc};
use mdvet_core::{Result, CACHE_VERSION};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One cached result record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CacheEntry {
    /// Whole-script run (stdout retained for replay)
    Script {
        hash: String,
        last_run: DateTime<Utc>,
        exit_code: i32,
        stdout: String,
        stderr: String,
        duration_ms: u64,
    },
    /// One markdown code block (stdout deliberately not retained)
    Block {
        hash: String,
        success: bool,
        exit_code: i32,
        stderr: String,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

impl CacheEntry {
    /// Content hash recorded for this entry
    pub fn hash(&self) -> &str {
        match self {
            Self::Script { hash, .. } | Self::Block { hash, .. } => hash,
        }
    }

    /// A cache hit requires exact hash equality, never a stale match
    pub fn matches_hash(&self, hash: &str) -> bool {
        self.hash() == hash
    }

    /// Whether the recorded run counts as a success
    pub fn succeeded(&self) -> bool {
        match self {
            Self::Script { exit_code, .. } => *exit_code == 0,
            Self::Block { success, .. } => *success,
        }
    }

    /// Recorded execution duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        match self {
            Self::Script { duration_ms, .. } | Self::Block { duration_ms, .. } => *duration_ms,
        }
    }
}

/// The persisted cache structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cache {
    /// Schema version, gated by strict equality on load
    pub version: String,
    /// Cache key -> result record
    pub entries: BTreeMap<String, CacheEntry>,
}

impl Cache {
    fn empty() -> Self {
        Self {
            version: CACHE_VERSION.to_string(),
            entries: BTreeMap::new(),
        }
    }
}

/// Read-only aggregation over the in-memory map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub script_count: usize,
    pub block_count: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub total_duration_ms: u64,
}

/// Owner of the on-disk cache file
///
/// The store is an explicit value constructed by the CLI entry point and
/// passed into the orchestrator and runner; there is no ambient cache.
/// Mutations accumulate in memory and the file is rewritten wholesale at
/// a single commit point per invocation.
pub struct CacheStore {
    path: PathBuf,
    cache: Cache,
}

impl CacheStore {
    /// Open the store at `path`, loading any persisted entries
    ///
    /// Never fails for cache-health reasons: absence, corruption, and
    /// version mismatch all fall back to a cold cache.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cache = Self::load(&path);
        Self { path, cache }
    }

    fn load(path: &Path) -> Cache {
        if !path.exists() {
            debug!("No cache file at {:?}, starting cold", path);
            return Cache::empty();
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read cache file {:?}: {}", path, e);
                return Cache::empty();
            }
        };

        let cache: Cache = match serde_json::from_str(&content) {
            Ok(cache) => cache,
            Err(e) => {
                warn!("Cache file {:?} is unreadable, starting cold: {}", path, e);
                return Cache::empty();
            }
        };

        if cache.version != CACHE_VERSION {
            warn!(
                "Cache version {} does not match expected {}, starting cold",
                cache.version, CACHE_VERSION
            );
            return Cache::empty();
        }

        cache
    }

    /// Path of the persisted file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up an entry by key
    pub fn lookup(&self, key: &str) -> Option<&CacheEntry> {
        self.cache.entries.get(key)
    }

    /// Insert or overwrite an entry (in memory only; call `save` to persist)
    pub fn insert(&mut self, key: impl Into<String>, entry: CacheEntry) {
        self.cache.entries.insert(key.into(), entry);
    }

    /// Serialize the whole structure back to disk, overwriting the file
    pub fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.cache)?;
        std::fs::write(&self.path, content)?;
        debug!("Saved {} cache entries to {:?}", self.cache.entries.len(), self.path);
        Ok(())
    }

    /// Empty the entries map (keeping the version), persist, and report
    /// how many entries were removed
    pub fn clear(&mut self) -> Result<usize> {
        let removed = self.cache.entries.len();
        self.cache.entries.clear();
        self.save()?;
        Ok(removed)
    }

    /// Aggregate counts over the in-memory map
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            total_entries: self.cache.entries.len(),
            ..Default::default()
        };

        for entry in self.cache.entries.values() {
            match entry {
                CacheEntry::Script { .. } => stats.script_count += 1,
                CacheEntry::Block { .. } => stats.block_count += 1,
            }
            if entry.succeeded() {
                stats.success_count += 1;
            } else {
                stats.failure_count += 1;
            }
            stats.total_duration_ms += entry.duration_ms();
        }

        stats
    }
}
