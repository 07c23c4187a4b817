//! Error types for the validator façade
//!
//! Validation failures are not errors: they come back as
//! [`ValidationVerdict::Invalid`](crate::ValidationVerdict::Invalid).
//! The variants here abort a validation attempt, and retrying is left to
//! the caller.

use formgate_common::{ErrorSeverity, Severity};
use formgate_js::JsError;
use formgate_store::StoreError;
use thiserror::Error;

/// Result type alias for validator operations
pub type Result<T> = std::result::Result<T, ValidatorError>;

/// Errors that abort a validation attempt or validator setup
#[derive(Debug, Error)]
pub enum ValidatorError {
    /// The store lookup for a unique field failed
    #[error("store lookup for field '{field_key}' failed: {source}")]
    StoreLookup {
        field_key: String,
        #[source]
        source: StoreError,
    },

    /// The store lookup for a unique field did not finish in time
    #[error("store lookup for field '{field_key}' timed out after {timeout_ms} ms")]
    StoreTimeout { field_key: String, timeout_ms: u64 },

    /// The caller cancelled the validation
    #[error("validation cancelled")]
    Cancelled,

    /// The script sandbox could not be started
    #[error("failed to start script sandbox: {0}")]
    Sandbox(#[from] JsError),

    /// A form definition could not be loaded
    #[error("failed to load form '{form_id}': {message}")]
    FormLoad { form_id: String, message: String },
}

impl ValidatorError {
    /// Create a form load error
    pub fn form_load(form_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FormLoad {
            form_id: form_id.into(),
            message: message.into(),
        }
    }

    /// True for errors a caller may reasonably retry
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ValidatorError::StoreLookup {
                source: StoreError::Unavailable { .. },
                ..
            } | ValidatorError::StoreTimeout { .. }
        )
    }
}

impl Severity for ValidatorError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            ValidatorError::Cancelled => ErrorSeverity::Warning,
            ValidatorError::StoreLookup { source, .. } => source.severity(),
            ValidatorError::StoreTimeout { .. } | ValidatorError::FormLoad { .. } => {
                ErrorSeverity::Error
            }
            ValidatorError::Sandbox(_) => ErrorSeverity::Critical,
        }
    }
}
