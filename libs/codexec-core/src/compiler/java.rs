use super::{classify, join_classpath, run_compiler, CompilationOutcome, CompilerAdapter};
use crate::error::Result;
use crate::source::{self, EntryName, JAVA_DEFAULT_NAME};
use crate::workspace::Workspace;
use async_trait::async_trait;
use codexec_common::config::ExecutorConfig;
use codexec_common::types::Language;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::{debug, instrument};

/// Compiles Java snippets with `javac`
#[derive(Debug, Clone)]
pub struct JavaCompiler {
    javac: PathBuf,
    host_classpath: Vec<PathBuf>,
}

impl JavaCompiler {
    pub fn new(config: &ExecutorConfig) -> Self {
        Self {
            javac: config.jdk_tool("javac"),
            host_classpath: config.host_classpath.clone(),
        }
    }
}

#[async_trait]
impl CompilerAdapter for JavaCompiler {
    fn language(&self) -> Language {
        Language::Java
    }

    fn extract_entry(&self, source: &str) -> EntryName {
        source::extract_java(source).unwrap_or_else(|| EntryName::new(None, JAVA_DEFAULT_NAME))
    }

    #[instrument(skip(self, source, workspace), fields(entry = %entry.qualified(), workspace = workspace.id()))]
    async fn compile(
        &self,
        source: &str,
        entry: &EntryName,
        workspace: &Workspace,
    ) -> Result<CompilationOutcome> {
        let file_name = format!("{}.java", entry.simple);
        let source_path = workspace.write_file(&file_name, source.as_bytes())?;
        debug!(source = %source_path.display(), "Wrote Java source");

        let mut args: Vec<OsString> = vec![
            "-d".into(),
            workspace.path().into(),
            "-encoding".into(),
            "UTF-8".into(),
            "-proc:none".into(),
            "-nowarn".into(),
        ];
        if let Some(classpath) = join_classpath(&self.host_classpath)? {
            args.push("-classpath".into());
            args.push(classpath);
        }
        args.push(source_path.into());

        let output = run_compiler(&self.javac, args, Vec::new(), workspace.path()).await?;
        Ok(classify(output, workspace.path()))
    }
}
