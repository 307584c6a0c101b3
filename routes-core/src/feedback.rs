//! Feedback events and the audio cue cadence policy.
//!
//! This module decides *what* should happen after each guidance update; the
//! host runtime owns the actual timer and executes the [`CueCommand`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::GuidanceConfig;
use crate::guidance::GuidanceState;

/// Feedback emitted toward the user. Emitted, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FeedbackEvent {
    /// Play the beep for `duration`
    AudioCue { duration: Duration },
    /// One alignment pulse
    HapticPulse,
}

/// What the cue timer must do after a guidance update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueCommand {
    /// Drop any pending cue and schedule nothing
    Cancel,
    /// Replace any pending cue with one firing after the given delay
    Arm(Duration),
}

/// Delay until the next cue for a given misalignment.
///
/// Linear in |relative bearing|: 0 degrees gives the cadence floor, 180 the
/// ceiling, both taken from `config`.
pub fn cue_interval(relative_bearing_deg: f64, config: &GuidanceConfig) -> Duration {
    let secs = (relative_bearing_deg.abs() / 180.0)
        .clamp(config.min_cue_interval_secs, config.max_cue_interval_secs);
    Duration::from_secs_f64(secs)
}

/// Cue decision for a freshly computed state
pub fn plan_cue(state: &GuidanceState, config: &GuidanceConfig) -> CueCommand {
    if !state.active {
        return CueCommand::Cancel;
    }
    CueCommand::Arm(cue_interval(state.relative_bearing_deg, config))
}
