use std::path::PathBuf;
use thiserror::Error;

/// Internal faults raised by the execution pipeline.
///
/// These never reach callers directly: the dispatcher turns every one of them
/// into a `RuntimeError` outcome carrying the error's message.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to create workspace under {root}: {source}")]
    Workspace {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write source file {path}: {source}")]
    WriteSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to launch {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid classpath entry: {0}")]
    Classpath(String),

    #[error("launcher unavailable: {0}")]
    Launcher(String),

    #[error("source code exceeds maximum size of {limit} bytes")]
    SourceTooLarge { limit: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
