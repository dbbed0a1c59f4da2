//! Configuration manager
//!
//! Resolves the platform config path and ties loading and saving together.

use crate::persistence::ConfigPersistence;
use crate::{Config, ConfigError, ConfigResult};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.toml";

/// High-level entry point for configuration access
pub struct ConfigManager {
    config_path: PathBuf,
    persistence: ConfigPersistence,
}

impl ConfigManager {
    /// Creates a manager using the platform config directory
    /// (e.g. `~/.config/mediabridge/config.toml` on Linux)
    pub fn new() -> ConfigResult<Self> {
        let dirs = ProjectDirs::from("org", "mediabridge", "mediabridge").ok_or_else(|| {
            ConfigError::PathResolutionError {
                reason: "no home directory available".to_string(),
            }
        })?;
        Ok(Self::with_path(dirs.config_dir().join(CONFIG_FILE_NAME)))
    }

    /// Creates a manager for an explicit config file path
    pub fn with_path(config_path: PathBuf) -> Self {
        Self {
            persistence: ConfigPersistence::new(config_path.clone()),
            config_path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Loads the config, falling back to defaults when the file is missing
    pub fn load(&self) -> ConfigResult<Config> {
        self.persistence.load()
    }

    /// Saves the config atomically
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        self.persistence.save(config)
    }
}
