/// Isolated Loader & Bounded Runner
///
/// **Isolation:**
/// Every run gets its own JVM process. Its classpath is
/// `launcher : host classpath : language runtime : workspace`, so host types
/// resolve first and workspace classes are visible to this process only.
/// Nothing loaded for one request can leak into another.
///
/// **Deadline:**
/// The process is awaited for at most `timeout`. On expiry it is killed and
/// `Timeout` is returned straight away; reaping happens on a detached task so
/// the caller never waits past the deadline. Guest code is terminated, not
/// merely asked to stop.

use crate::error::{EngineError, Result};
use crate::launcher::{parse_report, ReportStatus, EXIT_OK, EXIT_RESULT_WRITE, LAUNCHER_CLASS};
use crate::resolver::EntryPoint;
use crate::workspace::Workspace;
use crate::compiler::join_classpath;
use codexec_common::config::ExecutorConfig;
use codexec_common::types::ExecutionOutcome;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

const RESULT_FILE: &str = ".codexec-result";
const STDERR_TAIL_BYTES: usize = 8 * 1024;
const STDERR_DRAIN_GRACE: Duration = Duration::from_secs(1);
/// What the launcher prints to stderr before halting with `EXIT_RESULT_WRITE`
const RESULT_WRITE_FAILURE: &str = "failed to write result";

/// Runs one resolved entry point in a fresh JVM under a wall-clock deadline
#[derive(Debug, Clone)]
pub struct BoundedRunner {
    java: PathBuf,
    jvm_args: Vec<String>,
    host_classpath: Vec<PathBuf>,
    timeout: Duration,
}

impl BoundedRunner {
    pub fn new(config: &ExecutorConfig) -> Self {
        Self {
            java: config.jdk_tool("java"),
            jvm_args: config.jvm_args.clone(),
            host_classpath: config.host_classpath.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[instrument(skip(self, workspace, launcher_dir, runtime_classpath), fields(entry = %entry, workspace = workspace.id()))]
    pub async fn run(
        &self,
        entry: &EntryPoint,
        workspace: &Workspace,
        launcher_dir: &Path,
        runtime_classpath: &[PathBuf],
    ) -> Result<ExecutionOutcome> {
        let result_file = workspace.path().join(RESULT_FILE);

        let mut classpath = vec![launcher_dir.to_path_buf()];
        classpath.extend(self.host_classpath.iter().cloned());
        classpath.extend(runtime_classpath.iter().cloned());
        classpath.push(workspace.path().to_path_buf());
        let classpath = join_classpath(&classpath)?.unwrap_or_default();

        let mut args: Vec<OsString> = self.jvm_args.iter().map(OsString::from).collect();
        args.push("-cp".into());
        args.push(classpath);
        args.push(LAUNCHER_CLASS.into());
        args.push(entry.name().into());
        args.push(result_file.clone().into());

        let mut child = Command::new(&self.java)
            .args(&args)
            .current_dir(workspace.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                tool: self.java.display().to_string(),
                source,
            })?;

        let stderr_task = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(read_tail(stderr, STDERR_TAIL_BYTES)));

        let start = Instant::now();
        debug!(timeout_ms = self.timeout.as_millis() as u64, "Guest process started");

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Guest execution timed out - killing process"
                );
                if let Err(e) = child.start_kill() {
                    warn!(error = %e, "Failed to kill timed-out guest process");
                }
                tokio::spawn(async move {
                    let _ = child.wait().await;
                });
                return Ok(ExecutionOutcome::Timeout(format!(
                    "code ran longer than {}",
                    describe_duration(self.timeout)
                )));
            }
        };

        let stderr_tail = match stderr_task {
            Some(task) => match tokio::time::timeout(STDERR_DRAIN_GRACE, task).await {
                Ok(Ok(tail)) => tail,
                _ => String::new(),
            },
            None => String::new(),
        };

        let result_text = tokio::fs::read_to_string(&result_file).await.ok();
        let outcome = interpret(status, result_text, &stderr_tail, entry);

        info!(
            exit_code = ?status.code(),
            status = outcome.status(),
            execution_ms = start.elapsed().as_millis() as u64,
            "Guest process finished"
        );

        Ok(outcome)
    }
}

/// Map the launcher's exit status and result file to an outcome.
///
/// A protocol exit code only counts when the launcher's report agrees with
/// it; guest code calling `System.exit` leaves no report behind.
fn interpret(
    status: ExitStatus,
    result_text: Option<String>,
    stderr_tail: &str,
    entry: &EntryPoint,
) -> ExecutionOutcome {
    let report = result_text.as_deref().and_then(parse_report);

    let code = match status.code() {
        Some(code) => code,
        None => return abnormal(&format!("guest process terminated abnormally ({})", status), stderr_tail),
    };

    match report {
        Some((report_status, payload)) if report_status.exit_code() == code => match report_status {
            ReportStatus::Ok => match serde_json::from_str(payload) {
                Ok(value) => ExecutionOutcome::Value(value),
                Err(e) => ExecutionOutcome::RuntimeError(format!("malformed result from launcher: {}", e)),
            },
            ReportStatus::NotFound => ExecutionOutcome::ResolutionFailure(entry.name().to_string()),
            ReportStatus::Contract => ExecutionOutcome::ContractViolation(payload.to_string()),
            ReportStatus::GuestError => ExecutionOutcome::RuntimeError(payload.to_string()),
        },
        _ if code == EXIT_RESULT_WRITE && last_line(stderr_tail).starts_with(RESULT_WRITE_FAILURE) => {
            ExecutionOutcome::RuntimeError(format!("failed to store result: {}", last_line(stderr_tail)))
        }
        _ if code == EXIT_OK => {
            ExecutionOutcome::RuntimeError("guest process exited without producing a result".to_string())
        }
        _ => abnormal(&format!("guest process exited with status {}", code), stderr_tail),
    }
}

fn abnormal(summary: &str, stderr_tail: &str) -> ExecutionOutcome {
    let detail = last_line(stderr_tail);
    if detail.is_empty() {
        ExecutionOutcome::RuntimeError(summary.to_string())
    } else {
        ExecutionOutcome::RuntimeError(format!("{}: {}", summary, detail))
    }
}

fn last_line(text: &str) -> &str {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
}

fn describe_duration(duration: Duration) -> String {
    if duration.subsec_nanos() == 0 {
        format!("{} seconds", duration.as_secs())
    } else {
        format!("{} ms", duration.as_millis())
    }
}

/// Drain a stream to EOF, keeping only its last `limit` bytes
async fn read_tail<R: AsyncRead + Unpin>(mut stream: R, limit: usize) -> String {
    let mut tail: Vec<u8> = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                tail.extend_from_slice(&buf[..n]);
                if tail.len() > limit {
                    let excess = tail.len() - limit;
                    tail.drain(..excess);
                }
            }
        }
    }
    String::from_utf8_lossy(&tail).into_owned()
}
