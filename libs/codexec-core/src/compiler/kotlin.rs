use super::{classify, join_classpath, run_compiler, CompilationOutcome, CompilerAdapter};
use crate::error::Result;
use crate::source::{self, EntryName, KOTLIN_DEFAULT_NAME};
use crate::workspace::Workspace;
use async_trait::async_trait;
use codexec_common::config::ExecutorConfig;
use codexec_common::types::Language;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// Compiles Kotlin snippets with `kotlinc`.
///
/// Kotlin class files depend on the Kotlin standard library at run time, so
/// this adapter also contributes `kotlin-stdlib.jar` to the guest classpath.
#[derive(Debug, Clone)]
pub struct KotlinCompiler {
    kotlinc: PathBuf,
    java_home: Option<PathBuf>,
    host_classpath: Vec<PathBuf>,
    stdlib: Option<PathBuf>,
}

impl KotlinCompiler {
    pub fn new(config: &ExecutorConfig) -> Self {
        let kotlinc = config.kotlinc();
        let stdlib = config
            .kotlin_stdlib()
            .or_else(|| locate_stdlib(&kotlinc));
        if stdlib.is_none() {
            warn!("kotlin-stdlib.jar not found; set kotlin_home to run Kotlin snippets");
        }

        Self {
            kotlinc,
            java_home: config.java_home.clone(),
            host_classpath: config.host_classpath.clone(),
            stdlib,
        }
    }
}

/// Find `lib/kotlin-stdlib.jar` next to a `kotlinc` found on PATH.
/// Distribution launchers are usually symlinks into `<home>/bin`.
fn locate_stdlib(kotlinc: &Path) -> Option<PathBuf> {
    let executable = if kotlinc.components().count() > 1 {
        kotlinc.to_path_buf()
    } else {
        let path = std::env::var_os("PATH")?;
        std::env::split_paths(&path)
            .map(|dir| dir.join(kotlinc))
            .find(|candidate| candidate.is_file())?
    };

    let home = executable.canonicalize().ok()?.parent()?.parent()?.to_path_buf();
    let stdlib = home.join("lib").join("kotlin-stdlib.jar");
    stdlib.is_file().then_some(stdlib)
}

#[async_trait]
impl CompilerAdapter for KotlinCompiler {
    fn language(&self) -> Language {
        Language::Kotlin
    }

    fn extract_entry(&self, source: &str) -> EntryName {
        source::extract_kotlin(source)
            .unwrap_or_else(|| EntryName::new(None, KOTLIN_DEFAULT_NAME))
    }

    #[instrument(skip(self, source, workspace), fields(entry = %entry.qualified(), workspace = workspace.id()))]
    async fn compile(
        &self,
        source: &str,
        entry: &EntryName,
        workspace: &Workspace,
    ) -> Result<CompilationOutcome> {
        let file_name = format!("{}.kt", entry.simple);
        let source_path = workspace.write_file(&file_name, source.as_bytes())?;
        debug!(source = %source_path.display(), "Wrote Kotlin source");

        let mut args: Vec<OsString> = vec![
            "-d".into(),
            workspace.path().into(),
            "-nowarn".into(),
        ];
        if let Some(classpath) = join_classpath(&self.host_classpath)? {
            args.push("-classpath".into());
            args.push(classpath);
        }
        args.push(source_path.into());

        let envs = match &self.java_home {
            Some(home) => vec![("JAVA_HOME", home.clone().into_os_string())],
            None => Vec::new(),
        };

        let output = run_compiler(&self.kotlinc, args, envs, workspace.path()).await?;
        Ok(classify(output, workspace.path()))
    }

    fn runtime_classpath(&self) -> Vec<PathBuf> {
        self.stdlib.iter().cloned().collect()
    }
}
