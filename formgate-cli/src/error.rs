//! Error handling for the Formgate CLI
//!
//! Every failure carries the exit code the process should end with, and
//! keeps its source so the full cause chain can be logged.

use std::error::Error;
use std::fmt;
use std::path::Path;

use crate::exit_codes::{EXIT_ERROR, EXIT_SUCCESS};

/// CLI-specific result type
pub type CliResult<T> = Result<T, CliError>;

/// CLI error with a suggested exit code
#[derive(Debug)]
pub struct CliError {
    pub message: String,
    pub exit_code: i32,
    pub source: Option<Box<dyn Error + Send + Sync>>,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: i32) -> Self {
        Self {
            message: message.into(),
            exit_code,
            source: None,
        }
    }

    /// Wrap an error with a message and the generic error exit code
    pub fn with_source(message: impl Into<String>, source: impl Error + Send + Sync + 'static) -> Self {
        Self {
            message: message.into(),
            exit_code: EXIT_ERROR,
            source: Some(Box::new(source)),
        }
    }

    /// Failure reading or decoding an input file
    pub fn input(path: &Path, source: impl Error + Send + Sync + 'static) -> Self {
        Self::with_source(format!("cannot read {}", path.display()), source)
    }

    /// Get the full error chain as a formatted string
    pub fn full_chain(&self) -> String {
        let mut result = self.message.clone();

        let mut current_source = self.source();
        while let Some(err) = current_source {
            result.push_str(&format!("\n  Caused by: {err}"));
            current_source = err.source();
        }

        result
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

/// Convert a result carrying an exit code into the final exit code,
/// logging the error chain on failure
pub fn handle_cli_result(result: CliResult<i32>) -> i32 {
    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e.full_chain());
            eprintln!("error: {}", e.full_chain());
            if e.exit_code == EXIT_SUCCESS {
                EXIT_ERROR
            } else {
                e.exit_code
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn full_chain_lists_causes() {
        let err = CliError::with_source(
            "cannot read form.json",
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
        );
        assert_eq!(
            err.full_chain(),
            "cannot read form.json\n  Caused by: no such file"
        );
        assert_eq!(err.exit_code, EXIT_ERROR);
    }

    #[test]
    fn handle_result_codes() {
        assert_eq!(handle_cli_result(Ok(1)), 1);
        assert_eq!(handle_cli_result(Err(CliError::new("bad", 0))), EXIT_ERROR);
        assert_eq!(handle_cli_result(Err(CliError::new("bad", 2))), 2);
    }
}
