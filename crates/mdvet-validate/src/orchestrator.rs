//! Validation orchestrator
//!
//! Drives the extract -> cache lookup -> execute pipeline per markdown
//! file, strictly sequentially, and aggregates the tallies that decide
//! the process exit code. The cache store is mutated in memory across
//! the loop and persisted exactly once at the end of the pass.

use chrono::Utc;
use glob::glob;
use mdvet_cache::{block_hash, block_key, CacheEntry, CacheStore};
use mdvet_core::{MdvetConfig, MdvetError, Result, ValidationResult};
use mdvet_exec::{execute_block, BlockOptions, ProcessExecutor};
use mdvet_markdown::extract_blocks;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Aggregated outcome of one validation pass
#[derive(Debug, Default)]
pub struct ValidationSummary {
    /// Per-block results across all files, in processing order
    pub results: Vec<ValidationResult>,
    /// Number of markdown files processed
    pub files: usize,
}

impl ValidationSummary {
    /// Executable blocks considered (passed + failed + skipped)
    pub fn total_blocks(&self) -> usize {
        self.results.len()
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.success && !r.skipped).count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.success && !r.skipped).count()
    }

    pub fn skipped(&self) -> usize {
        self.results.iter().filter(|r| r.skipped).count()
    }

    pub fn cached(&self) -> usize {
        self.results.iter().filter(|r| r.cached).count()
    }

    /// Percentage of tested (non-skipped) blocks that passed
    ///
    /// Vacuously perfect when nothing was tested.
    pub fn score(&self) -> u32 {
        let tested = self.passed() + self.failed();
        if tested == 0 {
            return 100;
        }
        ((self.passed() as f64 / tested as f64) * 100.0).round() as u32
    }

    pub fn is_perfect(&self) -> bool {
        self.failed() == 0
    }

    /// The binary signal downstream automation polls
    pub fn exit_code(&self) -> i32 {
        if self.is_perfect() {
            0
        } else {
            1
        }
    }

    /// Failures only, for the per-failure report listing
    pub fn failures(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| !r.success && !r.skipped)
    }
}

/// Cache hit/miss status for one block, reported by `--check` mode
#[derive(Debug, Clone)]
pub struct CheckStatus {
    pub source_file: String,
    pub start_line: usize,
    pub hash: String,
    pub skipped: bool,
    pub cached: bool,
}

/// Resolve a validate target (path or glob) or the `--all` directive
/// into a concrete file list
///
/// Zero matching files is fatal: there is nothing to validate and a
/// vacuous pass would be misleading.
pub fn resolve_targets(
    target: Option<&str>,
    all: bool,
    config: &MdvetConfig,
) -> Result<Vec<PathBuf>> {
    let pattern = if all {
        config.chapters_glob.clone()
    } else {
        let target = target.ok_or_else(|| {
            MdvetError::Other("validate requires a file, a glob, or --all".to_string())
        })?;
        target.to_string()
    };

    if !pattern.contains(['*', '?', '[']) {
        let path = PathBuf::from(&pattern);
        if !path.exists() {
            return Err(MdvetError::NoFilesMatched(pattern));
        }
        return Ok(vec![path]);
    }

    let mut files: Vec<PathBuf> = glob(&pattern)
        .map_err(|e| MdvetError::InvalidGlob(format!("{}: {}", pattern, e)))?
        .filter_map(|entry| entry.ok())
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(MdvetError::NoFilesMatched(pattern));
    }
    Ok(files)
}

/// Orchestrator for markdown validation passes
pub struct ValidationRunner<E: ProcessExecutor> {
    executor: E,
    options: BlockOptions,
}

impl<E: ProcessExecutor> ValidationRunner<E> {
    pub fn new(executor: E, config: &MdvetConfig) -> Self {
        let mut options = BlockOptions::new(config.timeout_ms);
        options.keep_temp_files = config.keep_temp_files;
        options.allow_stderr = config.allow_stderr;
        Self { executor, options }
    }

    /// Validate every executable block across `files`
    ///
    /// Failures local to one block never abort the batch; an unreadable
    /// file aborts only when it is the sole target. The store is
    /// persisted once, after all files are processed.
    pub async fn validate_files(
        &self,
        files: &[PathBuf],
        store: &mut CacheStore,
    ) -> Result<ValidationSummary> {
        let mut summary = ValidationSummary::default();

        for file in files {
            if let Err(e) = self.validate_file(file, store, &mut summary).await {
                if files.len() > 1 {
                    warn!("Skipping unreadable {}: {}", file.display(), e);
                    continue;
                }
                return Err(e);
            }
            summary.files += 1;
        }

        store.save()?;
        info!(
            "Validated {} files: {} passed, {} failed, {} skipped ({} cached)",
            summary.files,
            summary.passed(),
            summary.failed(),
            summary.skipped(),
            summary.cached()
        );
        Ok(summary)
    }

    async fn validate_file(
        &self,
        file: &Path,
        store: &mut CacheStore,
        summary: &mut ValidationSummary,
    ) -> Result<()> {
        let content = std::fs::read_to_string(file)?;
        let file_name = file.display().to_string();
        let blocks = extract_blocks(&content);
        debug!("{}: {} fenced blocks", file_name, blocks.len());

        for block in blocks {
            // Unrecognized languages are not even attempted
            if !block.language.is_executable() {
                continue;
            }

            let hash = block_hash(&block.code, &block.tag);
            let key = block_key(&file_name, block.start_line, &hash);

            if !block.skip {
                if let Some(entry) = store.lookup(&key) {
                    if entry.matches_hash(&hash) {
                        if let CacheEntry::Block {
                            success,
                            exit_code,
                            stderr,
                            duration_ms,
                            ..
                        } = entry
                        {
                            debug!("{}:{} cache hit", file_name, block.start_line);
                            summary.results.push(ValidationResult {
                                source_file: file_name.clone(),
                                hash: hash.clone(),
                                success: *success,
                                exit_code: *exit_code,
                                stdout: String::new(),
                                stderr: stderr.clone(),
                                duration_ms: *duration_ms,
                                timed_out: false,
                                skipped: false,
                                skip_reason: None,
                                cached: true,
                                block,
                            });
                            continue;
                        }
                    }
                }
            }

            // An execution error (spawn failure, unwritable temp dir) is
            // environmental, so it fails the block without being cached:
            // the same content must re-run once the environment is fixed.
            let (result, cacheable) =
                match execute_block(&self.executor, &block, &file_name, &hash, &self.options).await
                {
                    Ok(result) => (result, true),
                    Err(e) => {
                        warn!("{}:{} could not execute: {}", file_name, block.start_line, e);
                        let result = ValidationResult {
                            source_file: file_name.clone(),
                            hash: hash.clone(),
                            success: false,
                            exit_code: -1,
                            stdout: String::new(),
                            stderr: e.to_string(),
                            duration_ms: 0,
                            timed_out: false,
                            skipped: false,
                            skip_reason: None,
                            cached: false,
                            block,
                        };
                        (result, false)
                    }
                };

            if cacheable && !result.skipped {
                store.insert(
                    key,
                    CacheEntry::Block {
                        hash: hash.clone(),
                        success: result.success,
                        exit_code: result.exit_code,
                        stderr: result.stderr.clone(),
                        duration_ms: result.duration_ms,
                        timestamp: Utc::now(),
                    },
                );
            }
            summary.results.push(result);
        }

        Ok(())
    }

    /// Dry run: report cache hit/miss per block without executing
    /// anything or mutating the store
    pub fn check_files(&self, files: &[PathBuf], store: &CacheStore) -> Result<Vec<CheckStatus>> {
        let mut statuses = Vec::new();

        for file in files {
            let content = std::fs::read_to_string(file)?;
            let file_name = file.display().to_string();

            for block in extract_blocks(&content) {
                if !block.language.is_executable() {
                    continue;
                }

                let hash = block_hash(&block.code, &block.tag);
                let key = block_key(&file_name, block.start_line, &hash);
                let cached = store
                    .lookup(&key)
                    .map(|entry| entry.matches_hash(&hash))
                    .unwrap_or(false);

                statuses.push(CheckStatus {
                    source_file: file_name.clone(),
                    start_line: block.start_line,
                    hash,
                    skipped: block.skip,
                    cached,
                });
            }
        }

        Ok(statuses)
    }
}
