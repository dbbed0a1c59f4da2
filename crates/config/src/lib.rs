//! mediabridge configuration system
//!
//! Trait-based config sections with validation, atomic file persistence and
//! graceful fallback to defaults when no file exists.
//!
//! # Example
//!
//! ```rust,no_run
//! use mediabridge_config::{Config, ConfigManager};
//!
//! let manager = ConfigManager::new().expect("Failed to resolve config path");
//! let config = manager.load().unwrap_or_else(|e| {
//!     eprintln!("Config error: {}, using defaults", e);
//!     Config::default()
//! });
//! println!("Volume: {}", config.player.default_volume);
//! ```

mod error;
mod manager;
mod persistence;
mod validation;

mod discovery_config;
mod engine_config;
mod logging_config;
mod player_config;

pub use error::{ConfigError, ConfigResult, ValidationError};
pub use manager::ConfigManager;
pub use persistence::ConfigPersistence;
pub use validation::{ConfigSection, Validator};

pub use discovery_config::DiscoveryConfig;
pub use engine_config::EngineConfig;
pub use logging_config::LoggingConfig;
pub use player_config::PlayerConfig;

use serde::{Deserialize, Serialize};

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Config file format version
    pub version: u32,

    /// Engine startup settings
    pub engine: EngineConfig,

    /// Discovery settings
    pub discovery: DiscoveryConfig,

    /// Player preferences
    pub player: PlayerConfig,

    /// Log output settings
    pub logging: LoggingConfig,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates every section, collecting all errors
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(mut e) = self.engine.validate() {
            errors.append(&mut e);
        }
        if let Err(mut e) = self.discovery.validate() {
            errors.append(&mut e);
        }
        if let Err(mut e) = self.player.validate() {
            errors.append(&mut e);
        }
        if let Err(mut e) = self.logging.validate() {
            errors.append(&mut e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Merges another config into this one; values from `other` win
    pub fn merge(&mut self, other: Config) {
        self.engine.merge(other.engine);
        self.discovery.merge(other.discovery);
        self.player.merge(other.player);
        self.logging.merge(other.logging);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            engine: EngineConfig::default(),
            discovery: DiscoveryConfig::default(),
            player: PlayerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
