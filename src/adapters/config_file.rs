//! JSON configuration file adapter.
//!
//! Implements [`ConfigPort`] by reading a JSON document from disk.  Missing
//! fields take their defaults (`#[serde(default)]` on the config struct),
//! so a file only needs to name what it overrides.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::ControllerConfig;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "GEOSIGNAL_CONFIG";

pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Adapter for the path in `GEOSIGNAL_CONFIG`, if set.
    pub fn from_env() -> Option<Self> {
        std::env::var_os(CONFIG_ENV).map(Self::new)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<ControllerConfig, ConfigError> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConfigError::NotFound,
            _ => {
                warn!("JsonConfigFile: reading {} failed: {}", self.path.display(), e);
                ConfigError::IoError
            }
        })?;

        let config: ControllerConfig = serde_json::from_str(&text).map_err(|e| {
            warn!("JsonConfigFile: {} is not valid config: {}", self.path.display(), e);
            ConfigError::Corrupted
        })?;
        config.validate()?;

        info!("JsonConfigFile: loaded config from {}", self.path.display());
        Ok(config)
    }
}
