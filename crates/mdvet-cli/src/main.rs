//! mdvet CLI - validate executable code in markdown chapters and scripts
//!
//! Usage:
//!   mdvet run <script> [args...]     Execute or replay a script from cache
//!   mdvet validate <file-or-glob>    Validate markdown code blocks
//!   mdvet validate --all             Validate all configured chapters
//!   mdvet cache --status <script>    Compare current vs cached hash
//!   mdvet cache --clear              Empty the cache
//!   mdvet cache --stats              Show cache statistics
//!
//! Bare-path shorthands: `mdvet foo.sh` means `mdvet run foo.sh`;
//! `mdvet ch1.md` or a glob means `mdvet validate <path>`.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use mdvet_cache::{content_hash, script_key, CacheEntry, CacheStore};
use mdvet_core::{MdvetConfig, MdvetError};
use mdvet_exec::{truncate_output, SystemExecutor};
use mdvet_validate::{resolve_targets, run_with_cache, ValidationRunner, ValidationSummary};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "mdvet")]
#[command(author, version, about = "Markdown code-block and script validation with content-addressed caching")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a script, replaying from cache when its hash is unchanged
    Run {
        /// Script file (.sh, .bash, .ts, .js)
        script: PathBuf,

        /// Arguments forwarded to the script
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,

        /// Execute even when a cached result matches
        #[arg(long)]
        force: bool,
    },

    /// Validate fenced code blocks in markdown files
    Validate {
        /// File or glob pattern
        target: Option<String>,

        /// Validate every configured chapter
        #[arg(long)]
        all: bool,

        /// Report cache hit/miss status without executing anything
        #[arg(long)]
        check: bool,
    },

    /// Inspect or manage the result cache
    Cache {
        /// Compare a script's current hash against its cached hash
        #[arg(long, value_name = "SCRIPT")]
        status: Option<PathBuf>,

        /// Remove all cache entries
        #[arg(long)]
        clear: bool,

        /// Show aggregated cache statistics
        #[arg(long)]
        stats: bool,
    },
}

/// Script extensions recognized by the bare-path shorthand
const SCRIPT_EXTENSIONS: &[&str] = &[".sh", ".bash", ".ts", ".js"];

/// Rewrite `mdvet <path>` into the matching subcommand
///
/// Backward-compatible shorthand: a bare script path becomes `run`, a
/// markdown path or glob becomes `validate`. Anything else is left for
/// clap to reject.
fn normalize_args(mut args: Vec<String>) -> Vec<String> {
    let Some(first) = args.get(1).cloned() else {
        return args;
    };
    if first.starts_with('-') || matches!(first.as_str(), "run" | "validate" | "cache" | "help") {
        return args;
    }

    if SCRIPT_EXTENSIONS.iter().any(|ext| first.ends_with(ext)) {
        args.insert(1, "run".to_string());
    } else if first.ends_with(".md") || first.contains(['*', '?', '[']) {
        args.insert(1, "validate".to_string());
    }
    args
}

/// Summaries log at INFO, so that is the quiet default
fn log_level(verbose: bool) -> Level {
    if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };
    std::process::exit(code);
}

async fn run() -> Result<i32> {
    let args = normalize_args(std::env::args().collect());
    let cli = Cli::parse_from(args);

    // Setup logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level(cli.verbose))
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(0);
    };

    let cwd = std::env::current_dir()?;
    let config = MdvetConfig::load_or_default(&cwd)?;
    let mut store = CacheStore::open(cwd.join(&config.cache_file));

    match command {
        Commands::Run { script, args, force } => {
            cmd_run(&config, &mut store, &script, &args, force).await
        }
        Commands::Validate { target, all, check } => {
            cmd_validate(&config, &mut store, target.as_deref(), all, check, cli.verbose).await
        }
        Commands::Cache { status, clear, stats } => cmd_cache(&mut store, status, clear, stats),
    }
}

async fn cmd_run(
    config: &MdvetConfig,
    store: &mut CacheStore,
    script: &Path,
    args: &[String],
    force: bool,
) -> Result<i32> {
    let executor = SystemExecutor::new();
    let outcome = run_with_cache(&executor, store, script, args, force, config.timeout_ms)
        .await
        .with_context(|| format!("Failed to run {}", script.display()))?;

    if outcome.cached {
        println!("CACHED: {}", script.display());
        println!("Skipped execution (hash unchanged)");
    }
    if !outcome.stdout.is_empty() {
        print!("{}", outcome.stdout);
        if !outcome.stdout.ends_with('\n') {
            println!();
        }
    }
    if !outcome.stderr.is_empty() {
        eprint!("{}", outcome.stderr);
        if !outcome.stderr.ends_with('\n') {
            eprintln!();
        }
    }

    // Mirror the script's exit code; sentinel codes collapse to failure
    Ok(if outcome.exit_code < 0 { 1 } else { outcome.exit_code })
}

async fn cmd_validate(
    config: &MdvetConfig,
    store: &mut CacheStore,
    target: Option<&str>,
    all: bool,
    check: bool,
    verbose: bool,
) -> Result<i32> {
    let files = resolve_targets(target, all, config)?;
    info!("Validating {} file(s)", files.len());

    let runner = ValidationRunner::new(SystemExecutor::new(), config);

    if check {
        let statuses = runner.check_files(&files, store)?;
        for status in &statuses {
            let state = if status.skipped {
                "SKIP"
            } else if status.cached {
                "HIT"
            } else {
                "MISS"
            };
            println!(
                "{:<4} {}:{} ({})",
                state, status.source_file, status.start_line, status.hash
            );
        }
        println!("{} blocks checked", statuses.len());
        return Ok(0);
    }

    let summary = runner.validate_files(&files, store).await?;

    if verbose {
        for result in &summary.results {
            let state = if result.skipped {
                "skip"
            } else if result.success {
                "pass"
            } else {
                "FAIL"
            };
            let origin = if result.cached { " (cached)" } else { "" };
            println!(
                "{:<4} {}:{} [{}] {}ms{}",
                state,
                result.source_file,
                result.block.start_line,
                result.block.language,
                result.duration_ms,
                origin
            );
        }
        println!();
    }

    print_report(&summary);
    Ok(summary.exit_code())
}

fn print_report(summary: &ValidationSummary) {
    if !summary.is_perfect() {
        println!("Failures:");
        for failure in summary.failures() {
            println!(
                "  {}:{} exit {}{}",
                failure.source_file,
                failure.block.start_line,
                failure.exit_code,
                if failure.timed_out { " (timed out)" } else { "" }
            );
            if !failure.stderr.is_empty() {
                for line in truncate_output(&failure.stderr, 400).lines() {
                    println!("    {}", line);
                }
            }
        }
        println!();
    }

    println!(
        "{} blocks: {} passed, {} failed, {} skipped ({} from cache)",
        summary.total_blocks(),
        summary.passed(),
        summary.failed(),
        summary.skipped(),
        summary.cached()
    );
    println!("Score: {}/100", summary.score());
}

fn cmd_cache(
    store: &mut CacheStore,
    status: Option<PathBuf>,
    clear: bool,
    stats: bool,
) -> Result<i32> {
    if let Some(script) = status {
        return cmd_cache_status(store, &script);
    }

    if clear {
        let removed = store.clear()?;
        println!("Cleared {} cache entries", removed);
        return Ok(0);
    }

    if stats {
        let stats = store.stats();
        println!("Cache statistics:");
        println!("  Total entries:  {}", stats.total_entries);
        println!("  Scripts:        {}", stats.script_count);
        println!("  Blocks:         {}", stats.block_count);
        println!("  Successes:      {}", stats.success_count);
        println!("  Failures:       {}", stats.failure_count);
        println!("  Total duration: {}ms", stats.total_duration_ms);
        return Ok(0);
    }

    Err(MdvetError::Other("cache requires --status, --clear, or --stats".to_string()).into())
}

fn cmd_cache_status(store: &CacheStore, script: &Path) -> Result<i32> {
    if !script.exists() {
        return Err(MdvetError::ScriptNotFound(script.display().to_string()).into());
    }

    let resolved = script.canonicalize().unwrap_or_else(|_| script.to_path_buf());
    let content = std::fs::read_to_string(&resolved)?;
    let current = content_hash(&content);

    println!("Script:       {}", resolved.display());
    println!("Current hash: {}", current);

    match store.lookup(&script_key(&resolved)) {
        Some(CacheEntry::Script {
            hash,
            last_run,
            exit_code,
            ..
        }) => {
            println!("Cached hash:  {}", hash);
            println!("Last run:     {}", last_run);
            println!("Exit code:    {}", exit_code);
            if *hash == current {
                println!("Status:       up to date (next run replays from cache)");
            } else {
                println!("Status:       stale (next run executes)");
            }
        }
        _ => {
            println!("Cached hash:  none");
            println!("Status:       cold (next run executes)");
        }
    }

    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        std::iter::once("mdvet".to_string())
            .chain(parts.iter().map(|s| s.to_string()))
            .collect()
    }

    #[test]
    fn test_shorthand_script_becomes_run() {
        let args = normalize_args(argv(&["deploy.sh"]));
        assert_eq!(args[1], "run");
        assert_eq!(args[2], "deploy.sh");
    }

    #[test]
    fn test_shorthand_typescript_becomes_run() {
        let args = normalize_args(argv(&["demo.ts", "--force"]));
        assert_eq!(args[1], "run");
    }

    #[test]
    fn test_shorthand_markdown_becomes_validate() {
        let args = normalize_args(argv(&["chapter-01.md"]));
        assert_eq!(args[1], "validate");
    }

    #[test]
    fn test_shorthand_glob_becomes_validate() {
        let args = normalize_args(argv(&["chapters/*.md"]));
        assert_eq!(args[1], "validate");
    }

    #[test]
    fn test_subcommands_pass_through() {
        let args = normalize_args(argv(&["cache", "--stats"]));
        assert_eq!(args[1], "cache");
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn test_flags_pass_through() {
        let args = normalize_args(argv(&["--help"]));
        assert_eq!(args[1], "--help");
    }

    #[test]
    fn test_no_args_pass_through() {
        let args = normalize_args(vec!["mdvet".to_string()]);
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_unknown_word_left_for_clap() {
        let args = normalize_args(argv(&["frobnicate"]));
        assert_eq!(args[1], "frobnicate");
    }

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_log_level_shows_summaries() {
        assert_eq!(log_level(false), Level::INFO);
        assert_eq!(log_level(true), Level::DEBUG);
    }
}
