//! Validator configuration values

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Operational limits applied by the validator.
///
/// All fields have defaults so partial files and single environment
/// variables are enough to override one knob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Execution budget for a single custom rule, in milliseconds
    pub script_timeout_ms: u64,

    /// Heap limit of the script runtime, in bytes
    pub script_memory_limit_bytes: usize,

    /// Stack limit of the script runtime, in bytes
    pub script_max_stack_bytes: usize,

    /// Number of script worker threads
    pub script_workers: usize,

    /// Budget for a single uniqueness lookup against the store, in milliseconds
    pub store_timeout_ms: u64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            script_timeout_ms: 250,
            script_memory_limit_bytes: 10 * 1024 * 1024, // 10 MB
            script_max_stack_bytes: 512 * 1024,          // 512 KB
            script_workers: 2,
            store_timeout_ms: 5_000,
        }
    }
}

impl ValidatorConfig {
    /// Per-rule script budget as a `Duration`
    pub fn script_timeout(&self) -> Duration {
        Duration::from_millis(self.script_timeout_ms)
    }

    /// Per-lookup store budget as a `Duration`
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Reject values that would disable a limit outright.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.script_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "script_timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.store_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "store_timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.script_memory_limit_bytes < 1024 * 1024 {
            return Err(ConfigError::invalid_value(
                "script_memory_limit_bytes",
                "must be at least 1 MiB",
            ));
        }
        if self.script_max_stack_bytes < 64 * 1024 {
            return Err(ConfigError::invalid_value(
                "script_max_stack_bytes",
                "must be at least 64 KiB",
            ));
        }
        if self.script_workers == 0 {
            return Err(ConfigError::invalid_value(
                "script_workers",
                "at least one worker is required",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ValidatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.script_timeout(), Duration::from_millis(250));
        assert_eq!(config.store_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn zero_timeouts_rejected() {
        let config = ValidatorConfig {
            script_timeout_ms: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("script_timeout_ms"));

        let config = ValidatorConfig {
            store_timeout_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn tiny_memory_limit_rejected() {
        let config = ValidatorConfig {
            script_memory_limit_bytes: 4096,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_workers_rejected() {
        let config = ValidatorConfig {
            script_workers: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("script_workers"));
    }
}
