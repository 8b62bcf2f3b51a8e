//! Code-block execution
//!
//! Materializes one extracted block as a temporary file in its language
//! slot, runs it through the executor, and classifies the outcome.
//! Success is a conjunction: exit code zero AND empty stderr AND no
//! timeout. Warnings on stderr fail a block; example code is expected
//! to run clean.

use crate::process::ProcessExecutor;
use mdvet_core::{CodeBlock, Result, ValidationResult};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Policy knobs for block execution
#[derive(Debug, Clone)]
pub struct BlockOptions {
    pub timeout_ms: u64,
    /// Retain temp files after execution instead of removing them
    pub keep_temp_files: bool,
    /// Accept non-empty stderr when classifying success
    pub allow_stderr: bool,
}

impl BlockOptions {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            keep_temp_files: false,
            allow_stderr: false,
        }
    }
}

/// Execute one code block and classify the result
///
/// Skipped blocks and unsupported languages short-circuit with zero
/// cost; nothing is spawned for them. `hash` is the block's content
/// hash, which also names the temp file so identical blocks land on
/// identical paths.
pub async fn execute_block<E: ProcessExecutor>(
    executor: &E,
    block: &CodeBlock,
    source_file: &str,
    hash: &str,
    options: &BlockOptions,
) -> Result<ValidationResult> {
    if block.skip {
        let reason = block
            .skip_reason
            .as_deref()
            .unwrap_or("skip-validation marker present");
        return Ok(ValidationResult::skipped(source_file, block, hash, reason));
    }

    let Some((extension, (program, lead_args))) = block
        .language
        .extension()
        .zip(block.language.interpreter())
    else {
        return Ok(ValidationResult::skipped(
            source_file,
            block,
            hash,
            "unsupported language",
        ));
    };

    let temp_path = materialize(block, hash, extension)?;

    let mut args: Vec<String> = lead_args.iter().map(|s| s.to_string()).collect();
    args.push(temp_path.display().to_string());

    let output = executor.run(program, &args, options.timeout_ms).await;

    if !options.keep_temp_files {
        if let Err(e) = std::fs::remove_file(&temp_path) {
            debug!("Could not remove temp file {:?}: {}", temp_path, e);
        }
    }

    let output = output?;

    let success = !output.timed_out
        && output.exit_code == 0
        && (options.allow_stderr || output.stderr.is_empty());

    if !success {
        warn!(
            "Block at {}:{} failed (exit {}, timed_out: {})",
            source_file, block.start_line, output.exit_code, output.timed_out
        );
    }

    Ok(ValidationResult {
        source_file: source_file.to_string(),
        block: block.clone(),
        hash: hash.to_string(),
        success,
        exit_code: output.exit_code,
        stdout: output.stdout,
        stderr: output.stderr,
        duration_ms: output.duration_ms,
        timed_out: output.timed_out,
        skipped: false,
        skip_reason: None,
        cached: false,
    })
}

/// Write the block body to a temp file named by its content hash
fn materialize(block: &CodeBlock, hash: &str, extension: &str) -> Result<PathBuf> {
    let dir = std::env::temp_dir().join("mdvet-blocks");
    std::fs::create_dir_all(&dir)?;

    let path = dir.join(format!("block-{}.{}", hash, extension));
    std::fs::write(&path, &block.code)?;
    Ok(path)
}
