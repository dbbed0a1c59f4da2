//! Player configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// Player preferences
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerConfig {
    /// Initial volume (0.0 - 1.0)
    pub default_volume: f32,

    /// Equalizer preset applied at startup, by name. None means flat.
    pub equalizer_preset: Option<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_volume: 1.0,
            equalizer_preset: None,
        }
    }
}

impl ConfigSection for PlayerConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = vec![Validator::in_range(
            self.default_volume,
            0.0,
            1.0,
            "player.default_volume",
        )];
        // Preset names are resolved against the engine's table at use time;
        // here we only reject the obviously broken empty string.
        if let Some(ref preset) = self.equalizer_preset {
            results.push(Validator::not_empty(preset, "player.equalizer_preset"));
        }
        Validator::collect_errors(results)
    }

    fn merge(&mut self, other: Self) {
        self.default_volume = other.default_volume;
        self.equalizer_preset = other.equalizer_preset;
    }

    fn section_name(&self) -> &'static str {
        "player"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(PlayerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_volume_out_of_range() {
        let config = PlayerConfig {
            default_volume: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_preset_rejected() {
        let config = PlayerConfig {
            equalizer_preset: Some(String::new()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
