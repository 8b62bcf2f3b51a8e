//! # mdvet-core
//!
//! Shared types for mdvet, a validation tool for executable code blocks
//! in markdown chapters and for standalone scripts.
//!
//! ## Core paradigm
//!
//! - Every cacheable unit of work is identified by a content hash
//! - Caching is an optimization, never a correctness dependency
//! - A non-zero exit code is data, not an error; only spawn failures are errors
//! - Blocks and files are processed strictly sequentially for reproducibility

mod config;
mod error;
mod types;

pub use config::MdvetConfig;
pub use error::{MdvetError, Result};
pub use types::*;
