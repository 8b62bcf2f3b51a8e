//! # mdvet-validate
//!
//! The validation orchestrator (markdown batch pipeline) and the cached
//! `run` replay flow. Both take an explicit executor and cache store;
//! nothing here touches global state.

mod orchestrator;
mod replay;

pub use orchestrator::{resolve_targets, CheckStatus, ValidationRunner, ValidationSummary};
pub use replay::{run_with_cache, RunOutcome};
