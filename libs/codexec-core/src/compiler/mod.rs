/// Compiler Adapters - source text to class files
///
/// **Adapter Contract:**
/// 1. Write the source into the workspace, named after the extracted entry type
/// 2. Invoke the compiler with the workspace as output directory and the
///    configured host classpath
/// 3. Keep error diagnostics in report order, drop warnings and notes
/// 4. Return `Success` with the workspace location, or `Failure` with diagnostics
///
/// Compilation runs to completion: only guest execution is deadline-bounded.

pub mod java;
pub mod kotlin;

use crate::error::{EngineError, Result};
use crate::source::EntryName;
use crate::workspace::Workspace;
use async_trait::async_trait;
use codexec_common::types::Language;
use lazy_static::lazy_static;
use regex::Regex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, warn};

pub use java::JavaCompiler;
pub use kotlin::KotlinCompiler;

lazy_static! {
    /// `<file>:<line>[:<col>]: <severity>: <message>`, location optional.
    /// Matches both javac and kotlinc output.
    static ref DIAGNOSTIC_PATTERN: Regex = Regex::new(
        r"^(?:(?P<file>.+?):(?P<line>\d+):(?:(?P<col>\d+):)?\s+)?(?P<severity>error|warning|note|info|exception):\s*(?P<message>.*)$"
    )
    .unwrap();
}

/// Result of compiling one snippet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilationOutcome {
    /// Class files were written to this directory
    Success(PathBuf),
    /// Compiler errors, in the order the compiler reported them
    Failure(Vec<String>),
}

/// One guest language's compiler
#[async_trait]
pub trait CompilerAdapter: Send + Sync {
    fn language(&self) -> Language;

    /// Expected entry type for this source, falling back to the language's default name
    fn extract_entry(&self, source: &str) -> EntryName;

    async fn compile(
        &self,
        source: &str,
        entry: &EntryName,
        workspace: &Workspace,
    ) -> Result<CompilationOutcome>;

    /// Classpath entries the compiled artifacts need at run time
    fn runtime_classpath(&self) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// Raw compiler process result
#[derive(Debug)]
pub(crate) struct CompilerOutput {
    pub success: bool,
    pub output: String,
}

/// Run a compiler to completion, capturing stdout and stderr together
pub(crate) async fn run_compiler(
    tool: &Path,
    args: Vec<OsString>,
    envs: Vec<(&'static str, OsString)>,
    working_dir: &Path,
) -> Result<CompilerOutput> {
    let start = Instant::now();

    let mut command = Command::new(tool);
    command
        .args(&args)
        .envs(envs)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = command.output().await.map_err(|source| EngineError::Spawn {
        tool: tool.display().to_string(),
        source,
    })?;

    let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&stdout);
    }

    debug!(
        tool = %tool.display(),
        exit_code = ?output.status.code(),
        compile_ms = start.elapsed().as_millis() as u64,
        "Compiler finished"
    );

    Ok(CompilerOutput {
        success: output.status.success(),
        output: text,
    })
}

/// Turn compiler output into an outcome.
///
/// Error entries are kept in report order and rendered as
/// `<file name>:<line>[:<col>]: <message>`; warnings and notes are dropped.
/// A failed run with no recognisable error line still yields one diagnostic,
/// the raw output.
pub(crate) fn classify(result: CompilerOutput, workspace: &Path) -> CompilationOutcome {
    let errors = collect_errors(&result.output);

    if result.success && errors.is_empty() {
        return CompilationOutcome::Success(workspace.to_path_buf());
    }

    if errors.is_empty() {
        let raw = result.output.trim();
        let diagnostic = if raw.is_empty() {
            "compiler exited with a failure status and no output".to_string()
        } else {
            raw.to_string()
        };
        warn!("Compiler failed without parseable diagnostics");
        return CompilationOutcome::Failure(vec![diagnostic]);
    }

    CompilationOutcome::Failure(errors)
}

pub(crate) fn collect_errors(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| DIAGNOSTIC_PATTERN.captures(line.trim_end()))
        .filter(|caps| &caps["severity"] == "error" || &caps["severity"] == "exception")
        .map(|caps| {
            let message = caps["message"].trim();
            match (caps.name("file"), caps.name("line")) {
                (Some(file), Some(line)) => {
                    let file_name = Path::new(file.as_str())
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| file.as_str().to_string());
                    match caps.name("col") {
                        Some(col) => {
                            format!("{}:{}:{}: {}", file_name, line.as_str(), col.as_str(), message)
                        }
                        None => format!("{}:{}: {}", file_name, line.as_str(), message),
                    }
                }
                _ => message.to_string(),
            }
        })
        .collect()
}

/// Join classpath entries with the platform separator, `None` when empty
pub(crate) fn join_classpath(entries: &[PathBuf]) -> Result<Option<OsString>> {
    if entries.is_empty() {
        return Ok(None);
    }
    std::env::join_paths(entries)
        .map(Some)
        .map_err(|e| EngineError::Classpath(e.to_string()))
}
