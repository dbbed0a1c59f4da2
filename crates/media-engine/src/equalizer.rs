//! Equalizer presets, bands and per-player configuration
//!
//! Pure data: one preamplification value plus one amplification value per
//! fixed frequency band. Applying a configuration to a player is a single
//! set-or-clear operation; clearing restores the flat default.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// Center frequencies of the fixed band layout, in Hz
pub const BAND_FREQUENCIES: [f32; 10] = [
    60.0, 170.0, 310.0, 600.0, 1_000.0, 3_000.0, 6_000.0, 12_000.0, 14_000.0, 16_000.0,
];

const PREAMP_RANGE_DB: f32 = 20.0;
const AMP_RANGE_DB: f32 = 20.0;
const DEFAULT_PREAMP_DB: f32 = 12.0;

struct Preset {
    name: &'static str,
    amps: [f32; 10],
}

const PRESETS: [Preset; 18] = [
    Preset { name: "Flat", amps: [0.0; 10] },
    Preset { name: "Classical", amps: [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -7.2, -7.2, -7.2, -9.6] },
    Preset { name: "Club", amps: [0.0, 0.0, 8.0, 5.6, 5.6, 5.6, 3.2, 0.0, 0.0, 0.0] },
    Preset { name: "Dance", amps: [9.6, 7.2, 2.4, 0.0, 0.0, -5.6, -7.2, -7.2, 0.0, 0.0] },
    Preset { name: "Full bass", amps: [-8.0, 9.6, 9.6, 5.6, 1.6, -4.0, -8.0, -10.4, -11.2, -11.2] },
    Preset { name: "Full bass and treble", amps: [7.2, 5.6, 0.0, -7.2, -4.8, 1.6, 8.0, 11.2, 12.0, 12.0] },
    Preset { name: "Full treble", amps: [-9.6, -9.6, -9.6, -4.0, 2.4, 11.2, 16.0, 16.0, 16.0, 16.8] },
    Preset { name: "Headphones", amps: [4.8, 11.2, 5.6, -3.2, -2.4, 1.6, 4.8, 9.6, 12.8, 14.4] },
    Preset { name: "Large Hall", amps: [10.4, 10.4, 5.6, 5.6, 0.0, -4.8, -4.8, -4.8, 0.0, 0.0] },
    Preset { name: "Live", amps: [-4.8, 0.0, 4.0, 5.6, 5.6, 5.6, 4.0, 2.4, 2.4, 2.4] },
    Preset { name: "Party", amps: [7.2, 7.2, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 7.2, 7.2] },
    Preset { name: "Pop", amps: [-1.6, 4.8, 7.2, 8.0, 5.6, 0.0, -2.4, -2.4, -1.6, -1.6] },
    Preset { name: "Reggae", amps: [0.0, 0.0, 0.0, -5.6, 0.0, 6.4, 6.4, 0.0, 0.0, 0.0] },
    Preset { name: "Rock", amps: [8.0, 4.8, -5.6, -8.0, -3.2, 4.0, 8.8, 11.2, 11.2, 11.2] },
    Preset { name: "Ska", amps: [-2.4, -4.8, -4.0, 0.0, 4.0, 5.6, 8.8, 9.6, 11.2, 9.6] },
    Preset { name: "Soft", amps: [4.8, 1.6, 0.0, -2.4, 0.0, 4.0, 8.0, 9.6, 11.2, 12.0] },
    Preset { name: "Soft rock", amps: [4.0, 4.0, 2.4, 0.0, -4.0, -5.6, -3.2, 0.0, 2.4, 8.8] },
    Preset { name: "Techno", amps: [8.0, 5.6, 0.0, -5.6, -4.8, 0.0, 8.0, 9.6, 9.6, 8.8] },
];

/// Number of available presets
pub fn preset_count() -> usize {
    PRESETS.len()
}

/// Ordered list of preset names
pub fn preset_names() -> Vec<&'static str> {
    PRESETS.iter().map(|p| p.name).collect()
}

/// Name of one preset
pub fn preset_name(index: usize) -> EngineResult<&'static str> {
    PRESETS
        .get(index)
        .map(|p| p.name)
        .ok_or(EngineError::InvalidPreset(index))
}

/// Number of frequency bands
pub fn band_count() -> usize {
    BAND_FREQUENCIES.len()
}

/// Center frequencies of every band
pub fn band_frequencies() -> Vec<f32> {
    BAND_FREQUENCIES.to_vec()
}

/// Center frequency of one band
pub fn band_frequency(index: usize) -> EngineResult<f32> {
    BAND_FREQUENCIES
        .get(index)
        .copied()
        .ok_or(EngineError::InvalidBand(index))
}

/// One equalizer configuration: preamp plus per-band gains, in dB
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equalizer {
    preamp: f32,
    amps: [f32; 10],
}

impl Equalizer {
    /// Flat configuration
    pub fn new() -> Self {
        Self {
            preamp: DEFAULT_PREAMP_DB,
            amps: [0.0; 10],
        }
    }

    /// Configuration initialized from a preset
    pub fn from_preset(index: usize) -> EngineResult<Self> {
        let preset = PRESETS.get(index).ok_or(EngineError::InvalidPreset(index))?;
        Ok(Self {
            preamp: DEFAULT_PREAMP_DB,
            amps: preset.amps,
        })
    }

    pub fn preamp(&self) -> f32 {
        self.preamp
    }

    /// Sets the preamplification, clamped to ±20 dB
    pub fn set_preamp(&mut self, db: f32) {
        self.preamp = db.clamp(-PREAMP_RANGE_DB, PREAMP_RANGE_DB);
    }

    /// Amplification of one band
    pub fn amp_at(&self, index: usize) -> EngineResult<f32> {
        self.amps
            .get(index)
            .copied()
            .ok_or(EngineError::InvalidBand(index))
    }

    /// Sets the amplification of one band, clamped to ±20 dB
    pub fn set_amp_at(&mut self, index: usize, db: f32) -> EngineResult<()> {
        let amp = self
            .amps
            .get_mut(index)
            .ok_or(EngineError::InvalidBand(index))?;
        *amp = db.clamp(-AMP_RANGE_DB, AMP_RANGE_DB);
        Ok(())
    }
}

impl Default for Equalizer {
    fn default() -> Self {
        Self::new()
    }
}
