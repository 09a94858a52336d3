//! Playback engine configuration.
//!
//! All fields have defaults so a partial JSON file (or none at all) is
//! enough. Values are tunables, not protocol constants: the wire format in
//! [`crate::format`] is fixed.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::duration::DEFAULT_CHARS_PER_SECOND;
use crate::error::ConfigError;
use crate::format::{BYTES_PER_SAMPLE, SAMPLE_RATE};

/// Default buffered audio required before playback starts.
pub const DEFAULT_PRE_ROLL_MS: u64 = 200;

/// Default position sampling interval.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// Default lifetime of a transient status message.
pub const DEFAULT_STATUS_CLEAR_MS: u64 = 3_000;

/// Playback engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Audio that must be queued before the sink starts rendering.
    pub pre_roll_ms: u64,

    /// How often position/progress are sampled while rendering.
    pub tick_interval_ms: u64,

    /// Reading rate used for the upfront duration estimate.
    pub chars_per_second: f64,

    /// How long a user-facing status message stays visible.
    pub status_clear_ms: u64,

    /// Output volume (0.0 = muted, 1.0 = full).
    pub volume: f32,
}

impl PlaybackConfig {
    /// Create a config with sensible defaults.
    #[must_use]
    pub const fn with_defaults() -> Self {
        Self {
            pre_roll_ms: DEFAULT_PRE_ROLL_MS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            chars_per_second: DEFAULT_CHARS_PER_SECOND,
            status_clear_ms: DEFAULT_STATUS_CLEAR_MS,
            volume: 1.0,
        }
    }

    /// Load a JSON config file; missing fields fall back to defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pre_roll_ms > 5_000 {
            return Err(ConfigError::InvalidPreRoll(self.pre_roll_ms));
        }
        if !(10..=1_000).contains(&self.tick_interval_ms) {
            return Err(ConfigError::InvalidTickInterval(self.tick_interval_ms));
        }
        if !(self.chars_per_second.is_finite() && self.chars_per_second > 0.0) {
            return Err(ConfigError::InvalidCharsPerSecond(self.chars_per_second));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(ConfigError::InvalidVolume(self.volume));
        }
        Ok(())
    }

    /// Pre-roll threshold in bytes, frame-aligned.
    pub const fn pre_roll_bytes(&self) -> usize {
        let frames = self.pre_roll_ms as usize * SAMPLE_RATE as usize / 1_000;
        frames * BYTES_PER_SAMPLE
    }

    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub const fn status_clear(&self) -> Duration {
        Duration::from_millis(self.status_clear_ms)
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}
