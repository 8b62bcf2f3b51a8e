//! Unified error types for mdvet

use thiserror::Error;

/// Unified error type for all mdvet operations
#[derive(Error, Debug)]
pub enum MdvetError {
    // User input errors
    #[error("Script not found: {0}")]
    ScriptNotFound(String),

    #[error("Unsupported script extension: {0}")]
    UnsupportedExtension(String),

    #[error("No files match: {0}")]
    NoFilesMatched(String),

    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(String),

    // Execution errors
    #[error("Failed to spawn process: {0}")]
    Spawn(String),

    #[error("Script timed out after {0}ms")]
    Timeout(u64),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

/// Result type alias using MdvetError
pub type Result<T> = std::result::Result<T, MdvetError>;
