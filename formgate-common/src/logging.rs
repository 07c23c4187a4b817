//! Logging utilities for Formgate
//!
//! Libraries log through `tracing`; binaries call [`init_tracing`] once at
//! startup to route events to stderr.

use serde::Serialize;
use std::fmt::Debug;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

use crate::error::{CommonError, Result};

/// Wrapper for pretty-printing types in logs as YAML
///
/// ```ignore
/// use formgate_common::Pretty;
/// use tracing::debug;
///
/// debug!("compiled schema: {}", Pretty(&schema.describe()));
/// ```
///
/// Outputs YAML with a leading newline. Debug is used as a fallback if YAML
/// serialization fails.
pub struct Pretty<T>(pub T);

impl<T: Serialize + Debug> std::fmt::Display for Pretty<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_yaml_ng::to_string(&self.0) {
            Ok(yaml) => write!(f, "\n{}", yaml),
            Err(_) => write!(f, "\n{:#?}", self.0),
        }
    }
}

impl<T: Serialize + Debug> std::fmt::Debug for Pretty<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

/// Build the filter used by [`init_tracing`].
///
/// `RUST_LOG` wins when set; otherwise every `formgate*` target logs at
/// `level` and third-party crates stay at `warn`.
pub fn build_filter(level: Level) -> Result<EnvFilter> {
    if let Ok(directive) = std::env::var(EnvFilter::DEFAULT_ENV) {
        return EnvFilter::try_new(&directive).map_err(|e| CommonError::InvalidFilter {
            directive,
            message: e.to_string(),
        });
    }

    let directive = format!("warn,formgate={level}");
    EnvFilter::try_new(&directive).map_err(|e| CommonError::InvalidFilter {
        directive,
        message: e.to_string(),
    })
}

/// Install a stderr `fmt` subscriber filtered by [`build_filter`].
pub fn init_tracing(level: Level) -> Result<()> {
    let filter = build_filter(level)?;
    registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| CommonError::TracingInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pretty_renders_yaml_with_leading_newline() {
        let rendered = format!("{}", Pretty(json!({"key": "email", "required": true})));
        assert!(rendered.starts_with('\n'));
        assert!(rendered.contains("key: email"));
        assert!(rendered.contains("required: true"));
    }

    #[test]
    fn pretty_debug_matches_display() {
        let value = json!(["a", "b"]);
        assert_eq!(format!("{:?}", Pretty(&value)), format!("{}", Pretty(&value)));
    }
}
