//! Guidance state engine
//!
//! Holds the single authoritative [`GuidanceState`] derived from the current
//! target and the latest [`SensorSample`], plus the alignment latch that turns
//! entry into the alignment band into exactly one haptic pulse.
//!
//! ```text
//!             aligned sample / HapticPulse
//!   ┌───────────┐ ─────────────────────────▶ ┌─────────┐
//!   │ Unaligned │                            │ Aligned │
//!   └───────────┘ ◀───────────────────────── └─────────┘
//!        ▲          misaligned sample / -         │
//!        └──── set_target / reset (any state) ────┘
//! ```
//!
//! Every operation is O(1) and never blocks.

use serde::{Deserialize, Serialize};

use crate::config::GuidanceConfig;
use crate::feedback::FeedbackEvent;
use crate::geo::{angle_difference, bearing, distance_meters, Coordinate};
use crate::sensor::SensorSample;

/// Below this distance the target counts as reached and the bearing toward
/// it is treated as pointing straight ahead.
pub const COINCIDENT_DISTANCE_M: f64 = 0.001;

/// Edge trigger for the alignment band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentLatch {
    #[default]
    Unaligned,
    Aligned,
}

impl AlignmentLatch {
    /// Advance the latch with the alignment of a new sample.
    ///
    /// Returns true only on the Unaligned to Aligned transition.
    pub fn update(&mut self, aligned: bool) -> bool {
        let entered = *self == AlignmentLatch::Unaligned && aligned;
        *self = if aligned {
            AlignmentLatch::Aligned
        } else {
            AlignmentLatch::Unaligned
        };
        entered
    }

    pub fn reset(&mut self) {
        *self = AlignmentLatch::Unaligned;
    }
}

impl std::fmt::Display for AlignmentLatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlignmentLatch::Unaligned => write!(f, "Unaligned"),
            AlignmentLatch::Aligned => write!(f, "Aligned"),
        }
    }
}

/// Derived guidance values, recomputed atomically on every sample.
///
/// The default value is the inactive state: every number zero and
/// `aligned == false`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidanceState {
    /// A target is set and at least one sample has been processed for it
    pub active: bool,
    /// Great-circle distance from the position to the target
    pub distance_meters: f64,
    /// Compass bearing from the position to the target, [0, 360)
    pub target_bearing_deg: f64,
    /// Heading of the sample this state was computed from, [0, 360)
    pub heading_deg: f64,
    /// Target bearing relative to the heading, (-180, 180]; positive means
    /// the target is clockwise of where the device points
    pub relative_bearing_deg: f64,
    /// Angle the direction arrow is rotated by; same wrapped value as
    /// `relative_bearing_deg` so the arrow never spins through 360 at north
    pub display_rotation_deg: f64,
    /// 1 at the target, 0 at or beyond the configured maximum distance
    pub progress: f64,
    /// Remaining time at the assumed walking speed
    pub eta_seconds: f64,
    /// |relative bearing| is inside the alignment band
    pub aligned: bool,
}

impl GuidanceState {
    pub fn inactive() -> Self {
        Self::default()
    }

    /// Compute the state for `sample` steering toward `target`
    pub fn compute(target: &Coordinate, sample: &SensorSample, config: &GuidanceConfig) -> Self {
        let distance = distance_meters(&sample.position, target);

        let (target_bearing, relative, aligned) = if distance < COINCIDENT_DISTANCE_M {
            // No meaningful bearing toward a coincident point: count as aligned
            (sample.heading, 0.0, true)
        } else {
            let target_bearing = bearing(&sample.position, target);
            let relative = angle_difference(target_bearing, sample.heading);
            (
                target_bearing,
                relative,
                relative.abs() < config.alignment_threshold_deg,
            )
        };

        let progress = (1.0 - distance / config.max_distance_meters).clamp(0.0, 1.0);

        GuidanceState {
            active: true,
            distance_meters: distance,
            target_bearing_deg: target_bearing,
            heading_deg: sample.heading,
            relative_bearing_deg: relative,
            display_rotation_deg: relative,
            progress,
            eta_seconds: distance / config.walking_speed_mps,
            aligned,
        }
    }
}

/// Owner of the current target, the latest guidance state and the latch
#[derive(Debug, Clone)]
pub struct GuidanceEngine {
    config: GuidanceConfig,
    target: Option<Coordinate>,
    state: GuidanceState,
    latch: AlignmentLatch,
}

impl Default for GuidanceEngine {
    fn default() -> Self {
        Self::new(GuidanceConfig::default())
    }
}

impl GuidanceEngine {
    pub fn new(config: GuidanceConfig) -> Self {
        GuidanceEngine {
            config,
            target: None,
            state: GuidanceState::inactive(),
            latch: AlignmentLatch::Unaligned,
        }
    }

    pub fn config(&self) -> &GuidanceConfig {
        &self.config
    }

    pub fn target(&self) -> Option<Coordinate> {
        self.target
    }

    pub fn latch(&self) -> AlignmentLatch {
        self.latch
    }

    /// Replace the target.
    ///
    /// Any change of target drops the derived state and re-arms the latch, so
    /// the first aligned sample for the new target pulses again.
    pub fn set_target(&mut self, target: Option<Coordinate>) {
        self.target = target;
        self.state = GuidanceState::inactive();
        self.latch.reset();
    }

    /// Recompute from a new sample.
    ///
    /// Without a target this only clears the state. Returns a haptic pulse on
    /// entry into the alignment band.
    pub fn on_sample(&mut self, sample: &SensorSample) -> Option<FeedbackEvent> {
        let Some(target) = self.target else {
            self.state = GuidanceState::inactive();
            self.latch.reset();
            return None;
        };

        self.state = GuidanceState::compute(&target, sample, &self.config);
        if self.latch.update(self.state.aligned) {
            Some(FeedbackEvent::HapticPulse)
        } else {
            None
        }
    }

    /// Read-only snapshot of the latest state
    pub fn current_state(&self) -> GuidanceState {
        self.state
    }

    /// Forget derived state and the latch but keep the target
    pub fn reset(&mut self) {
        self.state = GuidanceState::inactive();
        self.latch.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::destination;

    fn origin() -> Coordinate {
        Coordinate::new(55.7558, 37.6173).unwrap()
    }

    fn sample_at(position: Coordinate, heading: f64) -> SensorSample {
        SensorSample::new(position, heading, 0)
    }

    #[test]
    fn test_no_target_is_noop() {
        let mut engine = GuidanceEngine::default();
        assert_eq!(engine.on_sample(&sample_at(origin(), 0.0)), None);
        assert_eq!(engine.current_state(), GuidanceState::inactive());
        assert!(!engine.current_state().aligned);
    }

    #[test]
    fn test_target_north_facing_east() {
        let mut engine = GuidanceEngine::default();
        engine.set_target(Some(destination(&origin(), 0.0, 500.0)));
        engine.on_sample(&sample_at(origin(), 90.0));

        let state = engine.current_state();
        assert!(state.active);
        assert!((state.distance_meters - 500.0).abs() < 1e-6);
        // Target is counter-clockwise of the heading
        assert!((state.relative_bearing_deg + 90.0).abs() < 1e-6);
        assert!((state.progress - 0.5).abs() < 1e-6);
        assert!((state.eta_seconds - 357.142857).abs() < 1e-3);
        assert!(!state.aligned);
    }

    #[test]
    fn test_coincident_target_is_aligned_and_arrived() {
        let mut engine = GuidanceEngine::default();
        engine.set_target(Some(origin()));
        let pulse = engine.on_sample(&sample_at(origin(), 123.0));

        let state = engine.current_state();
        assert_eq!(state.progress, 1.0);
        assert_eq!(state.relative_bearing_deg, 0.0);
        assert!(state.aligned);
        assert_eq!(pulse, Some(FeedbackEvent::HapticPulse));
    }

    #[test]
    fn test_progress_zero_beyond_max_distance() {
        let mut engine = GuidanceEngine::default();
        for distance in [1000.01, 1500.0, 25_000.0] {
            engine.set_target(Some(destination(&origin(), 45.0, distance)));
            engine.on_sample(&sample_at(origin(), 0.0));
            assert_eq!(engine.current_state().progress, 0.0);
        }
    }

    #[test]
    fn test_latch_pulses_once_per_entry() {
        let mut engine = GuidanceEngine::default();
        engine.set_target(Some(destination(&origin(), 90.0, 300.0)));

        let headings = [0.0, 88.0, 89.0, 90.0, 91.0, 120.0, 92.0, 93.0];
        let pulses: Vec<bool> = headings
            .iter()
            .map(|h| engine.on_sample(&sample_at(origin(), *h)).is_some())
            .collect();

        assert_eq!(
            pulses,
            vec![false, true, false, false, false, false, true, false]
        );
    }

    #[test]
    fn test_alignment_threshold_is_strict() {
        let config = GuidanceConfig::default();
        let target = destination(&origin(), 0.0, 200.0);
        let state = GuidanceState::compute(&target, &sample_at(origin(), 5.0), &config);
        assert!((state.relative_bearing_deg + 5.0).abs() < 1e-6);

        let inside = GuidanceState::compute(&target, &sample_at(origin(), 4.9), &config);
        assert!(inside.aligned);
        let outside = GuidanceState::compute(&target, &sample_at(origin(), 5.1), &config);
        assert!(!outside.aligned);
    }

    #[test]
    fn test_clearing_target_resets_latch() {
        let mut engine = GuidanceEngine::default();
        let target = destination(&origin(), 180.0, 100.0);
        engine.set_target(Some(target));
        assert!(engine.on_sample(&sample_at(origin(), 180.0)).is_some());
        assert_eq!(engine.latch(), AlignmentLatch::Aligned);

        engine.set_target(None);
        assert_eq!(engine.latch(), AlignmentLatch::Unaligned);
        assert_eq!(engine.current_state(), GuidanceState::inactive());
        assert_eq!(engine.on_sample(&sample_at(origin(), 180.0)), None);

        // Same target again: entry into the band pulses again
        engine.set_target(Some(target));
        assert!(engine.on_sample(&sample_at(origin(), 180.0)).is_some());
    }

    #[test]
    fn test_display_rotation_is_continuous_across_north() {
        // Target at bearing ~2 degrees, heading sweeps across north
        let mut engine = GuidanceEngine::default();
        engine.set_target(Some(destination(&origin(), 2.0, 400.0)));

        engine.on_sample(&sample_at(origin(), 358.0));
        let before = engine.current_state().display_rotation_deg;
        engine.on_sample(&sample_at(origin(), 1.0));
        let after = engine.current_state().display_rotation_deg;

        assert!((before - 4.0).abs() < 1e-3);
        assert!((after - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_state_serializes_camel_case() {
        let json = serde_json::to_value(GuidanceState::inactive()).unwrap();
        assert_eq!(json["relativeBearingDeg"], 0.0);
        assert_eq!(json["aligned"], false);
        assert_eq!(json["etaSeconds"], 0.0);
    }
}
