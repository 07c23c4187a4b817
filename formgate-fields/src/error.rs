//! Error types for form parsing

use formgate_common::{ErrorSeverity, Severity};
use thiserror::Error;

/// Result type for fields operations
pub type Result<T> = std::result::Result<T, FieldsError>;

/// Errors that can occur while loading a form definition.
///
/// Compilation itself never fails; only decoding the outer document can.
#[derive(Debug, Error)]
pub enum FieldsError {
    /// The form document is not valid JSON or not a JSON object
    #[error("invalid form definition: {0}")]
    Json(#[from] serde_json::Error),
}

impl Severity for FieldsError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Error
    }
}
