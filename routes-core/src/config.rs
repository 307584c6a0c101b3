//! Guidance constants

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;

/// Tunable constants of the guidance engine and the cue cadence.
///
/// Every field has a default, so a partial settings file only overrides what
/// it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GuidanceConfig {
    /// Distance at and beyond which progress reads 0
    pub max_distance_meters: f64,
    /// Assumed walking speed for the ETA, in m/s
    pub walking_speed_mps: f64,
    /// Half-width of the alignment band in degrees
    pub alignment_threshold_deg: f64,
    /// Fastest cue cadence (perfectly aligned), in seconds
    pub min_cue_interval_secs: f64,
    /// Slowest cue cadence (facing away), in seconds
    pub max_cue_interval_secs: f64,
    /// How long one beep plays, in seconds
    pub cue_duration_secs: f64,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        GuidanceConfig {
            max_distance_meters: 1000.0,
            walking_speed_mps: 1.4,
            alignment_threshold_deg: 5.0,
            min_cue_interval_secs: 0.1,
            max_cue_interval_secs: 1.0,
            cue_duration_secs: 0.1,
        }
    }
}

impl GuidanceConfig {
    /// Check that every constant is usable by the engine
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("maxDistanceMeters", self.max_distance_meters),
            ("walkingSpeedMps", self.walking_speed_mps),
            ("alignmentThresholdDeg", self.alignment_threshold_deg),
            ("minCueIntervalSecs", self.min_cue_interval_secs),
            ("maxCueIntervalSecs", self.max_cue_interval_secs),
            ("cueDurationSecs", self.cue_duration_secs),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NotPositive { name, value });
            }
        }
        if self.min_cue_interval_secs > self.max_cue_interval_secs {
            return Err(ConfigError::IntervalRange {
                min: self.min_cue_interval_secs,
                max: self.max_cue_interval_secs,
            });
        }
        if self.alignment_threshold_deg >= 180.0 {
            return Err(ConfigError::ThresholdTooWide(self.alignment_threshold_deg));
        }
        Ok(())
    }

    pub fn cue_duration(&self) -> Duration {
        Duration::from_secs_f64(self.cue_duration_secs)
    }
}
