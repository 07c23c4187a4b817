//! Configuration provider using Figment

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::error::{ConfigError, ConfigResult};
use crate::types::ValidatorConfig;

/// File stem searched for in the search directory
pub const CONFIG_FILE_STEM: &str = "formgate";

/// Prefix of environment variables mapped onto configuration keys
pub const ENV_PREFIX: &str = "FORMGATE_";

/// Configuration provider using figment
///
/// No caching is performed; every `load` reads the sources fresh.
pub struct ConfigProvider {
    search_dir: PathBuf,
    explicit_file: Option<PathBuf>,
}

impl ConfigProvider {
    /// Provider searching the current working directory
    pub fn new() -> Self {
        Self {
            search_dir: PathBuf::from("."),
            explicit_file: None,
        }
    }

    /// Search a different directory for `formgate.*` files
    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dir = dir.into();
        self
    }

    /// Use exactly this file instead of searching
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_file = Some(path.into());
        self
    }

    /// Resolve all sources into a validated [`ValidatorConfig`].
    pub fn load(&self) -> ConfigResult<ValidatorConfig> {
        let figment = self.build_figment()?;
        let config: ValidatorConfig = figment.extract()?;
        config.validate()?;
        debug!(?config, "validator configuration loaded");
        Ok(config)
    }

    /// Build the figment with all sources in precedence order
    fn build_figment(&self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(ValidatorConfig::default()));

        for path in self.config_files()? {
            trace!(path = %path.display(), "merging configuration file");
            figment = figment.merge(file_provider(&path)?);
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    fn config_files(&self) -> ConfigResult<Vec<PathBuf>> {
        if let Some(path) = &self.explicit_file {
            if !path.is_file() {
                return Err(ConfigError::FileNotFound { path: path.clone() });
            }
            return Ok(vec![path.clone()]);
        }

        Ok(["toml", "yaml", "yml", "json"]
            .iter()
            .map(|ext| self.search_dir.join(format!("{CONFIG_FILE_STEM}.{ext}")))
            .filter(|path| path.is_file())
            .collect())
    }
}

impl Default for ConfigProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn file_provider(path: &Path) -> ConfigResult<Figment> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Ok(Figment::from(Toml::file(path))),
        Some("yaml") | Some("yml") => Ok(Figment::from(Yaml::file(path))),
        Some("json") => Ok(Figment::from(Json::file(path))),
        other => Err(ConfigError::UnsupportedFormat {
            format: other.unwrap_or("<none>").to_string(),
        }),
    }
}
