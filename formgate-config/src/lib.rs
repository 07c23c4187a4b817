//! Formgate configuration management using Figment
//!
//! The validator has a handful of operational knobs (script and store time
//! budgets, sandbox memory limits). They are resolved with a fixed precedence,
//! later sources overriding earlier ones:
//!
//! 1. Built-in defaults ([`ValidatorConfig::default`])
//! 2. Configuration files discovered in the search directory
//!    (`formgate.toml`, `formgate.yaml`, `formgate.yml`, `formgate.json`),
//!    or a single explicit file
//! 3. Environment variables prefixed with `FORMGATE_`
//!
//! ```no_run
//! use formgate_config::ConfigProvider;
//!
//! let config = ConfigProvider::new().load()?;
//! println!("script budget: {:?}", config.script_timeout());
//! # Ok::<(), formgate_config::ConfigError>(())
//! ```
//!
//! ## Example TOML Configuration
//!
//! ```toml
//! script_timeout_ms = 100
//! store_timeout_ms = 2000
//! ```

mod error;
mod provider;
mod types;

pub use error::{ConfigError, ConfigResult};
pub use provider::{ConfigProvider, CONFIG_FILE_STEM, ENV_PREFIX};
pub use types::ValidatorConfig;

/// Load configuration from the current directory and environment.
pub fn load_configuration() -> ConfigResult<ValidatorConfig> {
    ConfigProvider::new().load()
}
