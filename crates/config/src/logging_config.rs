//! Logging configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Maximum log level: error, warn, info, debug or trace
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ConfigSection for LoggingConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![Validator::one_of(
            &self.level.as_str(),
            &LEVELS,
            "logging.level",
        )])
    }

    fn merge(&mut self, other: Self) {
        self.level = other.level;
    }

    fn section_name(&self) -> &'static str {
        "logging"
    }
}
