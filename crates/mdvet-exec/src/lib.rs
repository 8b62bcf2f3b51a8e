//! # mdvet-exec
//!
//! Subprocess execution for mdvet: the `ProcessExecutor` seam (real and
//! mock), whole-script running, and per-block execution with temp-file
//! materialization.
//!
//! Scheduling is deliberately sequential: one subprocess at a time, with
//! only that subprocess's stdout and stderr pumped concurrently. Example
//! code often has side effects, so throughput is traded for
//! reproducibility.

mod block;
mod process;
mod runner;

pub use block::{execute_block, BlockOptions};
pub use process::{truncate_output, MockExecutor, ProcessExecutor, ProcessOutput, SystemExecutor};
pub use runner::run_script;
