//! Discovery configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Renderer and media discovery settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Directories scanned by local media discovery
    pub media_dirs: Vec<PathBuf>,

    /// Renderer discovery service to use
    pub renderer_service: String,

    /// How long to wait for a matching renderer (1-300 seconds)
    pub find_timeout_secs: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            media_dirs: Vec::new(),
            renderer_service: "microdns_renderer".to_string(),
            find_timeout_secs: 10,
        }
    }
}

impl ConfigSection for DiscoveryConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![
            Validator::not_empty(&self.renderer_service, "discovery.renderer_service"),
            Validator::in_range(
                self.find_timeout_secs,
                1,
                300,
                "discovery.find_timeout_secs",
            ),
        ])
    }

    fn merge(&mut self, other: Self) {
        self.media_dirs = other.media_dirs;
        self.renderer_service = other.renderer_service;
        self.find_timeout_secs = other.find_timeout_secs;
    }

    fn section_name(&self) -> &'static str {
        "discovery"
    }
}
