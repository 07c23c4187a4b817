//! Error severity shared across Formgate crates
//!
//! Each crate owns its error enum and classifies its variants through the
//! [`Severity`] trait so callers can pick a log level or retry policy without
//! matching on crate-specific variants.

use thiserror::Error as ThisError;

/// Severity levels for error classification
///
/// - **Warning**: the operation produced a result but something was off
///   (for example a form node that had to be skipped).
/// - **Error**: the operation failed, other operations are unaffected.
/// - **Critical**: a collaborator (store, sandbox worker) is unusable.
///
/// # Examples
///
/// ```rust
/// use formgate_common::ErrorSeverity;
///
/// let skipped_node = ErrorSeverity::Warning;
/// let bad_config = ErrorSeverity::Error;
/// let store_down = ErrorSeverity::Critical;
/// assert_ne!(skipped_node, store_down);
/// # let _ = bad_config;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Potential issue but operation can proceed
    Warning,

    /// Operation failed but system can continue
    Error,

    /// A collaborator is unusable and requires attention
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Warning => write!(f, "warning"),
            ErrorSeverity::Error => write!(f, "error"),
            ErrorSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Trait for error types that have severity levels
///
/// # Example
///
/// ```rust
/// use formgate_common::{ErrorSeverity, Severity};
///
/// #[derive(Debug)]
/// enum LookupError {
///     Unreachable,
///     Malformed,
/// }
///
/// impl Severity for LookupError {
///     fn severity(&self) -> ErrorSeverity {
///         match self {
///             LookupError::Unreachable => ErrorSeverity::Critical,
///             LookupError::Malformed => ErrorSeverity::Error,
///         }
///     }
/// }
///
/// assert_eq!(LookupError::Unreachable.severity(), ErrorSeverity::Critical);
/// ```
pub trait Severity {
    /// Get the severity level of this error
    fn severity(&self) -> ErrorSeverity;
}

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// Errors raised by the shared helpers themselves
#[derive(Debug, ThisError)]
#[non_exhaustive]
pub enum CommonError {
    /// A tracing subscriber was already installed for this process
    #[error("tracing subscriber already initialised: {0}")]
    TracingInit(String),

    /// The log filter directive could not be parsed
    #[error("invalid log filter '{directive}': {message}")]
    InvalidFilter {
        /// The directive as supplied
        directive: String,
        /// Parser message
        message: String,
    },
}

impl Severity for CommonError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            CommonError::TracingInit(_) => ErrorSeverity::Warning,
            CommonError::InvalidFilter { .. } => ErrorSeverity::Error,
        }
    }
}
