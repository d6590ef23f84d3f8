use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Guest languages the executor can compile and run.
///
/// Java is the primary language: requests that omit a language tag run as Java.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Java,
    Kotlin,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Java, Language::Kotlin];

    /// Parse a language tag, ignoring case and surrounding whitespace
    pub fn from_str(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "java" => Some(Language::Java),
            "kotlin" => Some(Language::Kotlin),
            _ => None,
        }
    }

    /// Source file extension, without the leading dot
    pub fn file_extension(&self) -> &'static str {
        match self {
            Language::Java => "java",
            Language::Kotlin => "kt",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::Java => write!(f, "java"),
            Language::Kotlin => write!(f, "kotlin"),
        }
    }
}

/// A single snippet submitted for execution.
///
/// The language stays an unparsed tag here: rejecting unknown tags is the
/// dispatcher's job, and it must happen before any filesystem work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub source_code: String,
    #[serde(default)]
    pub language: Option<String>,
}

impl ExecutionRequest {
    pub fn new(source_code: impl Into<String>, language: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_code: source_code.into(),
            language: language.map(str::to_string),
        }
    }

    /// The language tag as submitted, or the primary language when omitted
    pub fn language_tag(&self) -> String {
        self.language
            .clone()
            .unwrap_or_else(|| Language::default().to_string())
    }
}

/// Final outcome of one execution request. Exactly one is produced per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// Return value of the guest `call()`, passed through unexamined
    Value(serde_json::Value),
    EmptyInput(String),
    UnsupportedLanguage(String),
    /// Compiler diagnostics, one per line, in report order
    CompileError(String),
    ResolutionFailure(String),
    ContractViolation(String),
    RuntimeError(String),
    Timeout(String),
}

impl ExecutionOutcome {
    /// Short status label, used for logging and metrics labels
    pub fn status(&self) -> &'static str {
        match self {
            ExecutionOutcome::Value(_) => "value",
            ExecutionOutcome::EmptyInput(_) => "empty_input",
            ExecutionOutcome::UnsupportedLanguage(_) => "unsupported_language",
            ExecutionOutcome::CompileError(_) => "compile_error",
            ExecutionOutcome::ResolutionFailure(_) => "resolution_failure",
            ExecutionOutcome::ContractViolation(_) => "contract_violation",
            ExecutionOutcome::RuntimeError(_) => "runtime_error",
            ExecutionOutcome::Timeout(_) => "timeout",
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, ExecutionOutcome::Value(_))
    }
}
