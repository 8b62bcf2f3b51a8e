//! End-to-end pipeline tests with real subprocesses
//!
//! Shell blocks only, so the tests depend on nothing beyond bash.

use mdvet_cache::CacheStore;
use mdvet_core::MdvetConfig;
use mdvet_exec::SystemExecutor;
use mdvet_validate::{run_with_cache, ValidationRunner};
use std::path::PathBuf;
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn validate_mixed_chapter_end_to_end() {
    let dir = TempDir::new().unwrap();
    let chapter = write_file(
        &dir,
        "chapter.md",
        concat!(
            "# Demo chapter\n\n",
            "```bash\necho hello\n```\n\n",
            "```bash\nexit 7\n```\n\n",
            "```bash\n# skip-validation\nfalse\n```\n\n",
            "```python\nprint('never considered')\n```\n"
        ),
    );
    let mut store = CacheStore::open(dir.path().join("cache.json"));

    let runner = ValidationRunner::new(SystemExecutor::new(), &MdvetConfig::default());
    let summary = runner
        .validate_files(&[chapter], &mut store)
        .await
        .unwrap();

    assert_eq!(summary.total_blocks(), 3);
    assert_eq!(summary.passed(), 1);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.skipped(), 1);
    assert_eq!(summary.score(), 50);
    assert_eq!(summary.exit_code(), 1);

    let failure = summary.failures().next().unwrap();
    assert_eq!(failure.exit_code, 7);
}

#[tokio::test]
async fn second_validate_pass_runs_nothing() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("ran.log");
    let chapter = write_file(
        &dir,
        "chapter.md",
        &format!("```bash\necho ran >> {}\n```\n", marker.display()),
    );

    let config = MdvetConfig::default();

    let mut store = CacheStore::open(dir.path().join("cache.json"));
    let runner = ValidationRunner::new(SystemExecutor::new(), &config);
    let first = runner.validate_files(&[chapter.clone()], &mut store).await.unwrap();
    assert_eq!(first.passed(), 1);

    // Fresh store instance reading the persisted file
    let mut store = CacheStore::open(dir.path().join("cache.json"));
    let runner = ValidationRunner::new(SystemExecutor::new(), &config);
    let second = runner.validate_files(&[chapter], &mut store).await.unwrap();

    assert_eq!(second.passed(), 1);
    assert_eq!(second.cached(), 1);

    // The side effect happened exactly once
    let log = std::fs::read_to_string(&marker).unwrap();
    assert_eq!(log.lines().count(), 1);
}

#[tokio::test]
async fn run_command_end_to_end_with_cache_hit() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("runs.log");
    let script = write_file(
        &dir,
        "fixture.sh",
        &format!("echo 'Hello from test fixture!'\necho ran >> {}\n", marker.display()),
    );

    let executor = SystemExecutor::new();
    let mut store = CacheStore::open(dir.path().join("cache.json"));

    let first = run_with_cache(&executor, &mut store, &script, &[], false, 30_000)
        .await
        .unwrap();
    assert!(!first.cached);
    assert_eq!(first.exit_code, 0);
    assert!(first.stdout.contains("Hello from test fixture!"));

    let second = run_with_cache(&executor, &mut store, &script, &[], false, 30_000)
        .await
        .unwrap();
    assert!(second.cached);
    assert_eq!(second.exit_code, 0);
    assert!(second.stdout.contains("Hello from test fixture!"));

    let log = std::fs::read_to_string(&marker).unwrap();
    assert_eq!(log.lines().count(), 1);
}

#[tokio::test]
async fn stderr_from_example_code_is_a_failure() {
    let dir = TempDir::new().unwrap();
    let chapter = write_file(&dir, "chapter.md", "```bash\necho warning >&2\n```\n");
    let mut store = CacheStore::open(dir.path().join("cache.json"));

    let runner = ValidationRunner::new(SystemExecutor::new(), &MdvetConfig::default());
    let summary = runner.validate_files(&[chapter], &mut store).await.unwrap();

    assert_eq!(summary.failed(), 1);
    let failure = summary.failures().next().unwrap();
    assert_eq!(failure.exit_code, 0);
    assert!(failure.stderr.contains("warning"));
}
