//! # mdvet-markdown
//!
//! Parsing of markdown chapters into ordered sequences of fenced code
//! blocks, with skip-marker and language classification.

mod extract;

pub use extract::extract_blocks;
