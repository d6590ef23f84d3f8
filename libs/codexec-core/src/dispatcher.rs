/// Language Dispatcher - the single entry point of the execution core
///
/// **Pipeline:**
/// validate → acquire workspace → compile → resolve → launch → release workspace
///
/// **Failure Funnel:**
/// Each stage returns its own outcome or an `EngineError`; this module is the
/// only place where internal errors become `RuntimeError` outcomes. Callers
/// always get exactly one `ExecutionOutcome` and never an `Err`.
///
/// Blank source and unknown languages are rejected before any filesystem work.

use crate::compiler::{CompilationOutcome, CompilerAdapter, JavaCompiler, KotlinCompiler};
use crate::error::{EngineError, Result};
use crate::launcher::Launcher;
use crate::resolver;
use crate::runner::BoundedRunner;
use crate::workspace::{Workspace, WorkspaceManager};
use codexec_common::config::ExecutorConfig;
use codexec_common::response::join_diagnostics;
use codexec_common::types::{ExecutionOutcome, ExecutionRequest, Language};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument};

const SUPPORT_DIR: &str = ".support";

/// Compiles and runs guest snippets; cheap to share behind an `Arc`
pub struct Engine {
    config: ExecutorConfig,
    workspaces: WorkspaceManager,
    adapters: HashMap<Language, Arc<dyn CompilerAdapter>>,
    launcher: Launcher,
    runner: BoundedRunner,
}

impl Engine {
    /// Engine with the Java and Kotlin adapters registered
    pub fn new(config: ExecutorConfig) -> Self {
        let support_dir = config.scratch_root.join(SUPPORT_DIR);
        let launcher = Launcher::new(config.jdk_tool("javac"), support_dir);

        let mut adapters: HashMap<Language, Arc<dyn CompilerAdapter>> = HashMap::new();
        adapters.insert(Language::Java, Arc::new(JavaCompiler::new(&config)));
        adapters.insert(Language::Kotlin, Arc::new(KotlinCompiler::new(&config)));

        Self {
            workspaces: WorkspaceManager::new(config.scratch_root.clone()),
            runner: BoundedRunner::new(&config),
            adapters,
            launcher,
            config,
        }
    }

    /// Register or replace the adapter for its language
    pub fn with_adapter(mut self, adapter: Arc<dyn CompilerAdapter>) -> Self {
        self.adapters.insert(adapter.language(), adapter);
        self
    }

    /// Use an already compiled launcher instead of building one on first run
    pub fn with_launcher_dir(mut self, dir: PathBuf) -> Self {
        self.launcher = Launcher::preinstalled(dir);
        self
    }

    /// Override the configured execution deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.runner = self.runner.with_timeout(timeout);
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Collaborator-facing operation: one snippet in, one response value out
    pub async fn execute(&self, source_code: &str, language: Option<&str>) -> Value {
        let request = ExecutionRequest::new(source_code, language);
        self.dispatch(&request).await.into_response()
    }

    /// Run a request through the full pipeline
    #[instrument(skip(self, request), fields(request_id = %request.id, language = %request.language_tag()))]
    pub async fn dispatch(&self, request: &ExecutionRequest) -> ExecutionOutcome {
        if request.source_code.trim().is_empty() {
            return ExecutionOutcome::EmptyInput("source code must not be empty".to_string());
        }

        let tag = request.language_tag();
        let Some(adapter) = Language::from_str(&tag).and_then(|l| self.adapters.get(&l)) else {
            info!(tag = %tag, "Rejected unsupported language");
            return ExecutionOutcome::UnsupportedLanguage(tag);
        };

        if request.source_code.len() > self.config.max_source_bytes {
            let err = EngineError::SourceTooLarge {
                limit: self.config.max_source_bytes,
            };
            return ExecutionOutcome::RuntimeError(err.to_string());
        }

        let start = Instant::now();

        let outcome = match self.workspaces.acquire().await {
            Ok(workspace) => {
                let result = self.run_pipeline(request, adapter.as_ref(), &workspace).await;
                let cleanup = workspace.release_async().await;
                debug!(removed = cleanup.removed, failed = cleanup.failed, "Workspace torn down");

                result.unwrap_or_else(|e| {
                    error!(error = %e, "Execution pipeline failed");
                    ExecutionOutcome::RuntimeError(e.to_string())
                })
            }
            Err(e) => {
                error!(error = %e, "Failed to acquire workspace");
                ExecutionOutcome::RuntimeError(e.to_string())
            }
        };

        info!(
            status = outcome.status(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Execution completed"
        );

        outcome
    }

    async fn run_pipeline(
        &self,
        request: &ExecutionRequest,
        adapter: &dyn CompilerAdapter,
        workspace: &Workspace,
    ) -> Result<ExecutionOutcome> {
        let source = request.source_code.as_str();
        let entry = adapter.extract_entry(source);

        debug!(state = "compiling", entry = %entry.qualified());
        if let CompilationOutcome::Failure(diagnostics) =
            adapter.compile(source, &entry, workspace).await?
        {
            debug!(state = "compile_failed", diagnostics = diagnostics.len());
            return Ok(ExecutionOutcome::CompileError(join_diagnostics(&diagnostics)));
        }

        debug!(state = "resolving");
        let Some(entry_point) = resolver::resolve(&entry, workspace.path()) else {
            debug!(state = "resolve_failed");
            return Ok(ExecutionOutcome::ResolutionFailure(entry.qualified()));
        };

        debug!(state = "loading", entry = %entry_point);
        let launcher_dir = self.launcher.ensure_installed().await?;

        debug!(state = "running");
        self.runner
            .run(&entry_point, workspace, launcher_dir, &adapter.runtime_classpath())
            .await
    }
}
