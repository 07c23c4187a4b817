//! Error types for the script sandbox

use formgate_common::{ErrorSeverity, Severity};
use thiserror::Error;

/// Result type alias for sandbox operations
pub type Result<T> = std::result::Result<T, JsError>;

/// Errors that can occur while evaluating a script
#[derive(Debug, Clone, Error)]
pub enum JsError {
    /// The script raised an exception or failed to parse
    #[error("{message}")]
    Evaluation { message: String },

    /// Type conversion error between JSON and JS values
    #[error("Type conversion error: {message}")]
    TypeConversion { message: String },

    /// Runtime initialization or worker failure
    #[error("Runtime error: {message}")]
    Runtime { message: String },

    /// Script exceeded its execution budget
    #[error("Timeout: script exceeded its {budget_ms} ms execution budget")]
    Timeout { budget_ms: u64 },
}

impl JsError {
    /// Create an evaluation error
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation {
            message: msg.into(),
        }
    }

    /// Create a type conversion error
    pub fn type_conversion(msg: impl Into<String>) -> Self {
        Self::TypeConversion {
            message: msg.into(),
        }
    }

    /// Create a runtime error
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime {
            message: msg.into(),
        }
    }

    /// True when the script ran out of time
    pub fn is_timeout(&self) -> bool {
        matches!(self, JsError::Timeout { .. })
    }
}

impl Severity for JsError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            JsError::Evaluation { .. } | JsError::Timeout { .. } => ErrorSeverity::Warning,
            JsError::TypeConversion { .. } => ErrorSeverity::Error,
            JsError::Runtime { .. } => ErrorSeverity::Critical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_error_displays_bare_message() {
        let err = JsError::evaluation("ReferenceError: x is not defined");
        assert_eq!(err.to_string(), "ReferenceError: x is not defined");
    }

    #[test]
    fn timeout_mentions_budget() {
        let err = JsError::Timeout { budget_ms: 50 };
        assert!(err.is_timeout());
        assert!(err.to_string().contains("50 ms"));
        assert_eq!(err.severity(), ErrorSeverity::Warning);
    }

    #[test]
    fn runtime_errors_are_critical() {
        assert_eq!(
            JsError::runtime("worker gone").severity(),
            ErrorSeverity::Critical
        );
    }
}
