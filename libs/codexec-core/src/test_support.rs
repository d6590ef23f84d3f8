//! Toolchain-free stand-ins for `javac` and `java`.
//!
//! The stub JVM is `/bin/sh` running a script that mimics the launcher
//! protocol, keyed on the entry class name. Symlinking the shell instead of
//! exec'ing a freshly written script keeps parallel tests clear of ETXTBSY.

use crate::compiler::{CompilationOutcome, CompilerAdapter};
use crate::error::Result;
use crate::source::{self, EntryName, JAVA_DEFAULT_NAME};
use crate::workspace::Workspace;
use async_trait::async_trait;
use codexec_common::config::ExecutorConfig;
use codexec_common::types::Language;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Entry-name prefixes the stub JVM reacts to
pub struct StubBehaviour;

impl StubBehaviour {
    pub const VALUE: &'static str = "Value";
    pub const SLEEP: &'static str = "Sleepy";
    pub const NOT_CALLABLE: &'static str = "NotCallable";
    pub const THROW: &'static str = "Boom";
    pub const MISSING: &'static str = "Missing";
    pub const CRASH: &'static str = "Crash";
    /// `System.exit(3)` from guest code: no report written
    pub const BARE_EXIT_NOT_FOUND: &'static str = "BareExitThree";
    /// `System.exit(4)` from guest code: no report written
    pub const BARE_EXIT_CONTRACT: &'static str = "BareExitFour";
    /// Guest forges an `ok` report, then exits 4
    pub const MISMATCHED_REPORT: &'static str = "Mismatch";
}

const STUB_JVM_SCRIPT: &str = r#"entry=""
result=""
for arg in "$@"; do
  entry="$result"
  result="$arg"
done
case "$entry" in
  Sleepy*) exec sleep 30 ;;
  NotCallable*)
    printf 'codexec:contract\n%s does not implement the required callable contract (java.util.concurrent.Callable)' "$entry" > "$result"
    exit 4 ;;
  Boom*)
    printf 'codexec:guest-error\njava.lang.IllegalStateException: boom' > "$result"
    exit 5 ;;
  Missing*)
    printf 'codexec:not-found\n%s' "$entry" > "$result"
    exit 3 ;;
  BareExitThree*) exit 3 ;;
  BareExitFour*) exit 4 ;;
  Mismatch*)
    printf 'codexec:ok\n1' > "$result"
    exit 4 ;;
  Crash*)
    echo 'Exception in thread "main" java.lang.OutOfMemoryError: Java heap space' >&2
    exit 1 ;;
  *)
    printf 'codexec:ok\n{"entry":"%s"}' "$entry" > "$result" ;;
esac
"#;

/// Fake JDK home whose `bin/java` runs the stub script
pub struct StubJvm {
    home: TempDir,
}

impl StubJvm {
    pub fn path(&self) -> &std::path::Path {
        self.home.path()
    }

    pub fn script(&self) -> PathBuf {
        self.home.path().join("stub-jvm.sh")
    }

    /// Configuration pointing the runner at the stub; the script is passed as
    /// the first "JVM argument" so the shell executes it
    pub fn config(&self, scratch_root: PathBuf) -> ExecutorConfig {
        ExecutorConfig {
            scratch_root,
            timeout_seconds: 5,
            java_home: Some(self.home.path().to_path_buf()),
            jvm_args: vec![self.script().display().to_string()],
            ..Default::default()
        }
    }
}

pub fn stub_java_home() -> StubJvm {
    let home = tempfile::tempdir().unwrap();
    fs::create_dir_all(home.path().join("bin")).unwrap();
    std::os::unix::fs::symlink("/bin/sh", home.path().join("bin").join("java")).unwrap();
    fs::write(home.path().join("stub-jvm.sh"), STUB_JVM_SCRIPT).unwrap();
    StubJvm { home }
}

/// Marker that makes the stub compiler report a syntax error
pub const SYNTAX_ERROR_MARKER: &str = "/* syntax error */";

/// Compiler stand-in: writes an empty class file for the extracted entry name
#[derive(Debug, Default)]
pub struct StubCompiler;

#[async_trait]
impl CompilerAdapter for StubCompiler {
    fn language(&self) -> Language {
        Language::Java
    }

    fn extract_entry(&self, source: &str) -> EntryName {
        source::extract_java(source).unwrap_or_else(|| EntryName::new(None, JAVA_DEFAULT_NAME))
    }

    async fn compile(
        &self,
        source: &str,
        entry: &EntryName,
        workspace: &Workspace,
    ) -> Result<CompilationOutcome> {
        workspace.write_file(&format!("{}.java", entry.simple), source.as_bytes())?;

        if source.contains(SYNTAX_ERROR_MARKER) {
            return Ok(CompilationOutcome::Failure(vec![
                format!("{}.java:1: ';' expected", entry.simple),
                format!("{}.java:2: cannot find symbol", entry.simple),
            ]));
        }
        if source.contains("interface") {
            // compiles, but produces nothing runnable
            return Ok(CompilationOutcome::Success(workspace.path().to_path_buf()));
        }

        let relative = format!("{}.class", entry.qualified().replace('.', "/"));
        let class_file = workspace.path().join(relative);
        if let Some(parent) = class_file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(class_file, b"\xca\xfe\xba\xbe")?;
        Ok(CompilationOutcome::Success(workspace.path().to_path_buf()))
    }
}
