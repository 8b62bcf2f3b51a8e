//! Cached execution of standalone scripts
//!
//! The `run` command's state machine: hash the script's current bytes,
//! replay from the cache when the hash matches (and `--force` was not
//! given), otherwise execute and overwrite the entry unconditionally.

use chrono::Utc;
use mdvet_cache::{content_hash, script_key, CacheEntry, CacheStore};
use mdvet_core::{MdvetError, Result};
use mdvet_exec::{run_script, ProcessExecutor};
use std::path::Path;
use tracing::{debug, info};

/// Outcome of a `run` invocation
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Whether execution was skipped in favor of the cached record
    pub cached: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

/// Execute a script, or replay its cached result when unchanged
///
/// A timeout here is fatal to the invocation, unlike in batch
/// validation where it is recorded as one failing block.
pub async fn run_with_cache<E: ProcessExecutor>(
    executor: &E,
    store: &mut CacheStore,
    script: &Path,
    args: &[String],
    force: bool,
    timeout_ms: u64,
) -> Result<RunOutcome> {
    if !script.exists() {
        return Err(MdvetError::ScriptNotFound(script.display().to_string()));
    }

    let resolved = script.canonicalize().unwrap_or_else(|_| script.to_path_buf());
    let content = std::fs::read_to_string(&resolved)?;
    let hash = content_hash(&content);
    let key = script_key(&resolved);

    if !force {
        if let Some(entry) = store.lookup(&key) {
            if entry.matches_hash(&hash) {
                if let CacheEntry::Script {
                    exit_code,
                    stdout,
                    stderr,
                    duration_ms,
                    ..
                } = entry
                {
                    debug!("Cache hit for {}", resolved.display());
                    return Ok(RunOutcome {
                        cached: true,
                        exit_code: *exit_code,
                        stdout: stdout.clone(),
                        stderr: stderr.clone(),
                        duration_ms: *duration_ms,
                    });
                }
            }
        }
    }

    let output = run_script(executor, &resolved, args, timeout_ms).await?;

    if output.timed_out {
        return Err(MdvetError::Timeout(timeout_ms));
    }

    store.insert(
        key,
        CacheEntry::Script {
            hash,
            last_run: Utc::now(),
            exit_code: output.exit_code,
            stdout: output.stdout.clone(),
            stderr: output.stderr.clone(),
            duration_ms: output.duration_ms,
        },
    );
    store.save()?;
    info!(
        "Ran {} (exit {}, {}ms)",
        resolved.display(),
        output.exit_code,
        output.duration_ms
    );

    Ok(RunOutcome {
        cached: false,
        exit_code: output.exit_code,
        stdout: output.stdout,
        stderr: output.stderr,
        duration_ms: output.duration_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdvet_core::TIMEOUT_EXIT_CODE;
    use mdvet_exec::{MockExecutor, ProcessOutput};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_script(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_cold_cache_executes_and_persists() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "hello.sh", "echo 'Hello from test fixture!'\n");
        let mut store = CacheStore::open(dir.path().join("cache.json"));

        let executor =
            MockExecutor::new().with_default(ProcessOutput::ok("Hello from test fixture!\n"));
        let outcome = run_with_cache(&executor, &mut store, &script, &[], false, 1000)
            .await
            .unwrap();

        assert!(!outcome.cached);
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.stdout, "Hello from test fixture!\n");
        assert_eq!(executor.call_count(), 1);

        // Exactly one script entry with exit 0 was persisted
        let reloaded = CacheStore::open(dir.path().join("cache.json"));
        let stats = reloaded.stats();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.script_count, 1);
        assert_eq!(stats.success_count, 1);
    }

    #[tokio::test]
    async fn test_idempotent_replay_spawns_once() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "hello.sh", "echo hi\n");
        let mut store = CacheStore::open(dir.path().join("cache.json"));

        let executor = MockExecutor::new().with_default(ProcessOutput::ok("hi\n"));

        let first = run_with_cache(&executor, &mut store, &script, &[], false, 1000)
            .await
            .unwrap();
        let second = run_with_cache(&executor, &mut store, &script, &[], false, 1000)
            .await
            .unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(second.stdout, first.stdout);
        assert_eq!(second.exit_code, first.exit_code);
        // The subprocess boundary was crossed exactly once
        assert_eq!(executor.call_count(), 1);
    }

    #[tokio::test]
    async fn test_force_always_spawns() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "hello.sh", "echo hi\n");
        let mut store = CacheStore::open(dir.path().join("cache.json"));

        let executor = MockExecutor::new().with_default(ProcessOutput::ok("hi\n"));

        run_with_cache(&executor, &mut store, &script, &[], false, 1000)
            .await
            .unwrap();
        let forced = run_with_cache(&executor, &mut store, &script, &[], true, 1000)
            .await
            .unwrap();

        assert!(!forced.cached);
        assert_eq!(executor.call_count(), 2);
    }

    #[tokio::test]
    async fn test_changed_content_misses_cache() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "hello.sh", "echo v1\n");
        let mut store = CacheStore::open(dir.path().join("cache.json"));

        let executor = MockExecutor::new().with_default(ProcessOutput::ok(""));
        run_with_cache(&executor, &mut store, &script, &[], false, 1000)
            .await
            .unwrap();

        std::fs::write(&script, "echo v2\n").unwrap();
        let outcome = run_with_cache(&executor, &mut store, &script, &[], false, 1000)
            .await
            .unwrap();

        assert!(!outcome.cached);
        assert_eq!(executor.call_count(), 2);
    }

    #[tokio::test]
    async fn test_missing_script_is_user_error() {
        let dir = TempDir::new().unwrap();
        let mut store = CacheStore::open(dir.path().join("cache.json"));
        let executor = MockExecutor::new();

        let result = run_with_cache(
            &executor,
            &mut store,
            &PathBuf::from("/no/such/script.sh"),
            &[],
            false,
            1000,
        )
        .await;

        assert!(matches!(result, Err(MdvetError::ScriptNotFound(_))));
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_timeout_is_fatal_in_run_mode() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "slow.sh", "sleep 60\n");
        let mut store = CacheStore::open(dir.path().join("cache.json"));

        let timed_out = ProcessOutput {
            exit_code: TIMEOUT_EXIT_CODE,
            stdout: String::new(),
            stderr: "Process timed out after 1000ms".to_string(),
            timed_out: true,
            duration_ms: 1000,
        };
        let executor = MockExecutor::new().with_default(timed_out);

        let result = run_with_cache(&executor, &mut store, &script, &[], false, 1000).await;
        assert!(matches!(result, Err(MdvetError::Timeout(1000))));
        // The failed invocation is not recorded
        assert_eq!(store.stats().total_entries, 0);
    }

    #[tokio::test]
    async fn test_rerun_overwrites_entry_wholesale() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "flaky.sh", "date\n");
        let mut store = CacheStore::open(dir.path().join("cache.json"));

        let executor = MockExecutor::new().with_default(ProcessOutput::failed(2, "boom"));
        run_with_cache(&executor, &mut store, &script, &[], false, 1000)
            .await
            .unwrap();

        let executor = MockExecutor::new().with_default(ProcessOutput::ok("ok\n"));
        let outcome = run_with_cache(&executor, &mut store, &script, &[], true, 1000)
            .await
            .unwrap();

        assert_eq!(outcome.exit_code, 0);
        let stats = store.stats();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.success_count, 1);
        assert_eq!(stats.failure_count, 0);
    }
}
