//! Engine startup configuration section

use crate::validation::{ConfigSection, ValidationError};
use serde::{Deserialize, Serialize};

/// Engine startup flags
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Disable video output
    pub suppress_video: bool,

    /// Suppress engine log noise
    pub quiet: bool,

    /// Extra startup flag tokens passed through verbatim
    pub extra_flags: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            suppress_video: true,
            quiet: true,
            extra_flags: Vec::new(),
        }
    }
}

impl ConfigSection for EngineConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        // Flag tokens are free-form; the engine rejects unknown ones itself
        Ok(())
    }

    fn merge(&mut self, other: Self) {
        self.suppress_video = other.suppress_video;
        self.quiet = other.quiet;
        self.extra_flags = other.extra_flags;
    }

    fn section_name(&self) -> &'static str {
        "engine"
    }
}
