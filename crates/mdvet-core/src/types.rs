//! Core type definitions for mdvet validation

use serde::{Deserialize, Serialize};

/// Cache schema version. A persisted cache with any other version is
/// treated as empty (strict equality, never a range check).
pub const CACHE_VERSION: &str = "1.0.0";

/// Truncation length for content hashes, in hex characters (64 bits).
pub const HASH_LEN: usize = 16;

/// Byte cap for captured stdout/stderr.
pub const MAX_OUTPUT_BYTES: usize = 10 * 1024;

/// Default per-execution timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Sentinel exit code reported when a subprocess is killed on timeout.
pub const TIMEOUT_EXIT_CODE: i32 = -1;

/// Executable language classification for fenced code blocks and scripts
///
/// The allow-list is closed: anything outside it maps to `Unsupported`
/// and is never executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Shell,
    TypeScript,
    JavaScript,
    Unsupported,
}

impl Language {
    /// Classify a raw fence language tag
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "sh" | "bash" | "shell" | "zsh" => Self::Shell,
            "ts" | "typescript" => Self::TypeScript,
            "js" | "javascript" => Self::JavaScript,
            _ => Self::Unsupported,
        }
    }

    /// Classify a script file by its extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "sh" | "bash" => Self::Shell,
            "ts" => Self::TypeScript,
            "js" => Self::JavaScript,
            _ => Self::Unsupported,
        }
    }

    /// File extension used when materializing a block as a temp file
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            Self::Shell => Some("sh"),
            Self::TypeScript => Some("ts"),
            Self::JavaScript => Some("js"),
            Self::Unsupported => None,
        }
    }

    /// Interpreter command and leading arguments for this language
    pub fn interpreter(&self) -> Option<(&'static str, &'static [&'static str])> {
        match self {
            Self::Shell => Some(("bash", &[])),
            Self::TypeScript => Some(("npx", &["tsx"])),
            Self::JavaScript => Some(("node", &[])),
            Self::Unsupported => None,
        }
    }

    /// Whether blocks of this language are executed at all
    pub fn is_executable(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shell => write!(f, "shell"),
            Self::TypeScript => write!(f, "typescript"),
            Self::JavaScript => write!(f, "javascript"),
            Self::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// A fenced code block extracted from a markdown file
///
/// Transient: never persisted directly, only its execution result is
/// (as a block cache entry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Classified language of the fence tag
    pub language: Language,
    /// Raw fence tag as written (empty for bare fences)
    pub tag: String,
    /// Block body, exactly as it appears between the fences
    pub code: String,
    /// 1-based line number of the opening fence
    pub start_line: usize,
    /// Optional filename annotation after the language tag
    pub filename: Option<String>,
    /// Whether the block carries a skip-validation marker
    pub skip: bool,
    /// Human-readable reason when `skip` is set
    pub skip_reason: Option<String>,
}

/// Outcome of validating one code block
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Markdown file the block came from
    pub source_file: String,
    /// The block that was validated
    pub block: CodeBlock,
    /// Content hash of the block
    pub hash: String,
    /// Exit 0, empty stderr, no timeout
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub timed_out: bool,
    pub skipped: bool,
    pub skip_reason: Option<String>,
    /// Whether this result was replayed from the cache
    pub cached: bool,
}

impl ValidationResult {
    /// Build a skipped result with zero execution cost
    pub fn skipped(source_file: &str, block: &CodeBlock, hash: &str, reason: &str) -> Self {
        Self {
            source_file: source_file.to_string(),
            block: block.clone(),
            hash: hash.to_string(),
            success: false,
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            duration_ms: 0,
            timed_out: false,
            skipped: true,
            skip_reason: Some(reason.to_string()),
            cached: false,
        }
    }
}
