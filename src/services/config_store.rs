//! Updater configuration store.
//!
//! Reads and writes `updater.json` in the platform config directory. A
//! missing file yields defaults; a corrupt file is an error so we never
//! silently discard a user's settings.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::platform::get_config_dir;
use crate::types::config::UpdaterConfig;
use crate::types::errors::ConfigError;

const CONFIG_FILE: &str = "updater.json";

pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Creates a store backed by `path`, or the default location
    /// (`<config dir>/updater.json`) when `path` is `None`.
    pub fn new(path: Option<PathBuf>) -> Self {
        let path = path.unwrap_or_else(|| get_config_dir().join(CONFIG_FILE));
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Loads the configuration, returning defaults if the file does not
    /// exist yet.
    pub fn load(&self) -> Result<UpdaterConfig, ConfigError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no config file, using defaults");
            return Ok(UpdaterConfig::default());
        }
        let text = std::fs::read_to_string(&self.path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        let config = serde_json::from_str(&text)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;
        debug!(path = %self.path.display(), "loaded updater config");
        Ok(config)
    }

    /// Persists the configuration, creating the config directory if needed.
    pub fn save(&self, config: &UpdaterConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }
        let text = serde_json::to_string_pretty(config)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;
        std::fs::write(&self.path, text).map_err(|e| ConfigError::IoError(e.to_string()))?;
        info!(path = %self.path.display(), "saved updater config");
        Ok(())
    }
}
