//! Configuration management for mdvet
//!
//! Settings are loaded from `.mdvet.toml` in the working directory when
//! present, otherwise defaults apply.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::DEFAULT_TIMEOUT_MS;
use crate::Result;

/// Tool-level configuration
///
/// Loaded from `.mdvet.toml` via [`MdvetConfig::load_or_default`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MdvetConfig {
    /// Per-execution timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Path of the persisted cache file
    #[serde(default = "default_cache_file")]
    pub cache_file: String,

    /// Glob expanded by `validate --all`
    #[serde(default = "default_chapters_glob")]
    pub chapters_glob: String,

    /// Retain per-block temp files after execution (for debugging)
    #[serde(default)]
    pub keep_temp_files: bool,

    /// Treat non-empty stderr as acceptable when classifying block success
    #[serde(default)]
    pub allow_stderr: bool,
}

// Default value providers
fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_cache_file() -> String {
    ".mdvet-cache.json".to_string()
}

fn default_chapters_glob() -> String {
    "chapters/**/*.md".to_string()
}

impl MdvetConfig {
    /// Load configuration from `.mdvet.toml` in `dir`, or use defaults
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let config_path = dir.join(".mdvet.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)
                .map_err(|e| crate::MdvetError::Config(format!("Failed to parse {}: {}", config_path.display(), e)))
        } else {
            Ok(Self::default())
        }
    }
}

impl Default for MdvetConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            cache_file: default_cache_file(),
            chapters_glob: default_chapters_glob(),
            keep_temp_files: false,
            allow_stderr: false,
        }
    }
}
