//! Error types for submission stores

use formgate_common::{ErrorSeverity, Severity};
use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors a store lookup can report
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The backing store could not be reached
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    /// The store rejected the query
    #[error("invalid query: {message}")]
    InvalidQuery { message: String },

    /// Any other backend failure
    #[error("store error: {message}")]
    Backend { message: String },
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable {
            message: msg.into(),
        }
    }

    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: msg.into(),
        }
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend {
            message: msg.into(),
        }
    }
}

impl Severity for StoreError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            StoreError::Unavailable { .. } => ErrorSeverity::Critical,
            StoreError::InvalidQuery { .. } | StoreError::Backend { .. } => ErrorSeverity::Error,
        }
    }
}
