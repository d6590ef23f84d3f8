/// Result normalization
///
/// **Contract:**
/// Every `ExecutionOutcome` maps to exactly one response value.
/// - Successful values pass through untouched
/// - Failures become a human-readable string starting with a category prefix
///
/// Callers tell categories apart by prefix alone, without a status code.
/// The tagged serde form of `ExecutionOutcome` is the stricter alternative.

use crate::types::ExecutionOutcome;
use serde_json::Value;

pub const EMPTY_INPUT_PREFIX: &str = "empty input: ";
pub const UNSUPPORTED_LANGUAGE_PREFIX: &str = "unsupported language: ";
pub const COMPILE_ERROR_PREFIX: &str = "compile error:\n";
pub const RESOLUTION_FAILURE_PREFIX: &str = "class not found: ";
pub const CONTRACT_VIOLATION_PREFIX: &str = "contract violation: ";
pub const RUNTIME_ERROR_PREFIX: &str = "execution error: ";
pub const TIMEOUT_PREFIX: &str = "execution timeout: ";

impl ExecutionOutcome {
    /// Category prefix for failure variants, `None` for values
    pub fn prefix(&self) -> Option<&'static str> {
        match self {
            ExecutionOutcome::Value(_) => None,
            ExecutionOutcome::EmptyInput(_) => Some(EMPTY_INPUT_PREFIX),
            ExecutionOutcome::UnsupportedLanguage(_) => Some(UNSUPPORTED_LANGUAGE_PREFIX),
            ExecutionOutcome::CompileError(_) => Some(COMPILE_ERROR_PREFIX),
            ExecutionOutcome::ResolutionFailure(_) => Some(RESOLUTION_FAILURE_PREFIX),
            ExecutionOutcome::ContractViolation(_) => Some(CONTRACT_VIOLATION_PREFIX),
            ExecutionOutcome::RuntimeError(_) => Some(RUNTIME_ERROR_PREFIX),
            ExecutionOutcome::Timeout(_) => Some(TIMEOUT_PREFIX),
        }
    }

    /// Render the outcome as the single response value handed to callers
    pub fn into_response(self) -> Value {
        let prefix = self.prefix();
        match self {
            ExecutionOutcome::Value(value) => value,
            ExecutionOutcome::EmptyInput(detail)
            | ExecutionOutcome::UnsupportedLanguage(detail)
            | ExecutionOutcome::CompileError(detail)
            | ExecutionOutcome::ResolutionFailure(detail)
            | ExecutionOutcome::ContractViolation(detail)
            | ExecutionOutcome::RuntimeError(detail)
            | ExecutionOutcome::Timeout(detail) => {
                Value::String(format!("{}{}", prefix.unwrap_or_default(), detail))
            }
        }
    }
}

/// Join compiler diagnostics the way they appear in a compile-error response
pub fn join_diagnostics(diagnostics: &[String]) -> String {
    diagnostics.join("\n")
}
