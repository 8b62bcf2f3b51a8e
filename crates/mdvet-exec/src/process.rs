//! Process execution abstraction
//!
//! The trait is the seam between mdvet's core logic and the concrete
//! process-spawning mechanism: tests substitute a mock that records
//! invocations, so caching behavior can be verified without spawning
//! anything.

use async_trait::async_trait;
use mdvet_core::{MdvetError, Result, MAX_OUTPUT_BYTES, TIMEOUT_EXIT_CODE};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::debug;

/// Fixed environment overrides keeping subprocess output deterministic
/// enough to cache.
const EXEC_ENV: &[(&str, &str)] = &[("CI", "true"), ("NO_COLOR", "1"), ("TERM", "dumb")];

/// Captured output from one subprocess run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub duration_ms: u64,
}

impl ProcessOutput {
    /// A plain successful run, useful as a mock response
    pub fn ok(stdout: &str) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
            timed_out: false,
            duration_ms: 1,
        }
    }

    /// A failing run with the given exit code and stderr
    pub fn failed(exit_code: i32, stderr: &str) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.to_string(),
            timed_out: false,
            duration_ms: 1,
        }
    }
}

/// Trait for spawning subprocesses (allows mocking in tests)
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    /// Run `program` with `args`, enforcing the timeout
    ///
    /// A non-zero exit code is reported as data in the output; only a
    /// failure to spawn is an `Err`.
    async fn run(&self, program: &str, args: &[String], timeout_ms: u64) -> Result<ProcessOutput>;
}

/// Real executor backed by tokio subprocesses
#[derive(Debug, Clone, Default)]
pub struct SystemExecutor;

impl SystemExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessExecutor for SystemExecutor {
    async fn run(&self, program: &str, args: &[String], timeout_ms: u64) -> Result<ProcessOutput> {
        debug!("Executing {} {:?}", program, args);
        let started = Instant::now();

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in EXEC_ENV {
            command.env(key, value);
        }

        let mut child = command
            .spawn()
            .map_err(|e| MdvetError::Spawn(format!("Failed to spawn {}: {}", program, e)))?;

        // Drain both pipes concurrently; sequential reads risk deadlock
        // when the child fills one buffer while blocked writing the other.
        let mut stdout_pipe = child.stdout.take().ok_or_else(|| {
            MdvetError::Spawn(format!("No stdout handle for {}", program))
        })?;
        let mut stderr_pipe = child.stderr.take().ok_or_else(|| {
            MdvetError::Spawn(format!("No stderr handle for {}", program))
        })?;

        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stdout_pipe.read_to_end(&mut buf).await;
            buf
        });
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr_pipe.read_to_end(&mut buf).await;
            buf
        });

        let status = match tokio::time::timeout(Duration::from_millis(timeout_ms), child.wait()).await {
            Ok(waited) => waited?,
            Err(_) => {
                // Timer fired first: kill the child and report the
                // sentinel result. Partial output is discarded so the
                // cached record stays deterministic.
                let _ = child.kill().await;
                stdout_task.abort();
                stderr_task.abort();
                debug!("{} timed out after {}ms", program, timeout_ms);
                return Ok(ProcessOutput {
                    exit_code: TIMEOUT_EXIT_CODE,
                    stdout: String::new(),
                    stderr: format!("Process timed out after {}ms", timeout_ms),
                    timed_out: true,
                    duration_ms: started.elapsed().as_millis() as u64,
                });
            }
        };

        // Join the reader loops before trusting the exit status
        let stdout = stdout_task
            .await
            .map_err(|e| MdvetError::Other(format!("stdout reader failed: {}", e)))?;
        let stderr = stderr_task
            .await
            .map_err(|e| MdvetError::Other(format!("stderr reader failed: {}", e)))?;

        Ok(ProcessOutput {
            exit_code: status.code().unwrap_or(TIMEOUT_EXIT_CODE),
            stdout: truncate_output(&String::from_utf8_lossy(&stdout), MAX_OUTPUT_BYTES),
            stderr: truncate_output(&String::from_utf8_lossy(&stderr), MAX_OUTPUT_BYTES),
            timed_out: false,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// Cap captured output at `max` bytes, annotating how much was dropped
///
/// Output exactly at the cap is left untouched.
pub fn truncate_output(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }

    let mut cut = max;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    let omitted = text.len() - cut;
    format!("{}\n...[truncated, {} bytes omitted]", &text[..cut], omitted)
}

/// Mock executor for testing cache and orchestration behavior
///
/// Responses are keyed on `program` plus joined args; a default response
/// answers anything unmatched (handy when args contain temp paths).
/// Every invocation is recorded for spy-style assertions.
pub struct MockExecutor {
    responses: std::collections::HashMap<String, ProcessOutput>,
    default_response: Option<ProcessOutput>,
    calls: std::sync::Mutex<Vec<String>>,
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExecutor {
    pub fn new() -> Self {
        Self {
            responses: std::collections::HashMap::new(),
            default_response: None,
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn with_response(mut self, command: &str, output: ProcessOutput) -> Self {
        self.responses.insert(command.to_string(), output);
        self
    }

    /// Respond to any command that has no exact-match response
    pub fn with_default(mut self, output: ProcessOutput) -> Self {
        self.default_response = Some(output);
        self
    }

    /// All commands run so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock poisoned").len()
    }
}

#[async_trait]
impl ProcessExecutor for MockExecutor {
    async fn run(&self, program: &str, args: &[String], _timeout_ms: u64) -> Result<ProcessOutput> {
        let key = if args.is_empty() {
            program.to_string()
        } else {
            format!("{} {}", program, args.join(" "))
        };
        self.calls.lock().expect("calls lock poisoned").push(key.clone());

        self.responses
            .get(&key)
            .or(self.default_response.as_ref())
            .cloned()
            .ok_or_else(|| MdvetError::Spawn(format!("No mock response for: {}", key)))
    }
}
