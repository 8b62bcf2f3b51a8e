//! Whole-script execution
//!
//! Dispatches a script file to the interpreter matching its extension
//! and runs it through the executor with timeout and output bounding.

use crate::process::{ProcessExecutor, ProcessOutput};
use mdvet_core::{Language, MdvetError, Result};
use std::path::Path;
use tracing::debug;

/// Execute a single script file
///
/// The interpreter is selected by file extension (`.sh`/`.bash` run
/// under bash, `.ts` under `npx tsx`, `.js` under node). An extension
/// outside the allow-list is a user-input error, reported before
/// anything is spawned.
pub async fn run_script<E: ProcessExecutor>(
    executor: &E,
    script: &Path,
    args: &[String],
    timeout_ms: u64,
) -> Result<ProcessOutput> {
    let ext = script
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    let language = Language::from_extension(ext);
    let (program, lead_args) = language
        .interpreter()
        .ok_or_else(|| MdvetError::UnsupportedExtension(script.display().to_string()))?;

    let mut full_args: Vec<String> = lead_args.iter().map(|s| s.to_string()).collect();
    full_args.push(script.display().to_string());
    full_args.extend(args.iter().cloned());

    debug!("Running {} via {}", script.display(), program);
    executor.run(program, &full_args, timeout_ms).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::MockExecutor;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_shell_script_runs_under_bash() {
        let executor =
            MockExecutor::new().with_response("bash /tmp/hello.sh", ProcessOutput::ok("hi\n"));

        let output = run_script(&executor, &PathBuf::from("/tmp/hello.sh"), &[], 1000)
            .await
            .unwrap();
        assert_eq!(output.exit_code, 0);
        assert_eq!(executor.calls(), vec!["bash /tmp/hello.sh".to_string()]);
    }

    #[tokio::test]
    async fn test_typescript_runs_under_tsx() {
        let executor =
            MockExecutor::new().with_response("npx tsx /tmp/demo.ts", ProcessOutput::ok(""));

        run_script(&executor, &PathBuf::from("/tmp/demo.ts"), &[], 1000)
            .await
            .unwrap();
        assert_eq!(executor.calls(), vec!["npx tsx /tmp/demo.ts".to_string()]);
    }

    #[tokio::test]
    async fn test_script_args_are_forwarded() {
        let executor = MockExecutor::new()
            .with_response("node /tmp/run.js --flag value", ProcessOutput::ok(""));

        run_script(
            &executor,
            &PathBuf::from("/tmp/run.js"),
            &["--flag".to_string(), "value".to_string()],
            1000,
        )
        .await
        .unwrap();
        assert_eq!(executor.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_extension_spawns_nothing() {
        let executor = MockExecutor::new();
        let result = run_script(&executor, &PathBuf::from("/tmp/script.py"), &[], 1000).await;

        assert!(matches!(result, Err(MdvetError::UnsupportedExtension(_))));
        assert_eq!(executor.call_count(), 0);
    }
}
