//! Feedback scheduler: turns guidance updates into a debounced beep cadence.
//!
//! Every update cancels the pending cue and arms a new one at the interval
//! for the latest relative bearing, so stale cadences never fire. A fired cue
//! is not re-armed; the next sensor update does that, which bounds the beep
//! rate by the sensor rate.

use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

use routes_core::{plan_cue, CueCommand, GuidanceConfig, GuidanceState};

use crate::audio::{BeepAsset, FeedbackSink};
use crate::cue::CueTimer;

pub struct FeedbackScheduler {
    config: GuidanceConfig,
    timer: CueTimer,
    sink: Arc<dyn FeedbackSink>,
    asset: Option<Arc<BeepAsset>>,
    audio_acquired: bool,
    missing_asset_logged: bool,
}

impl FeedbackScheduler {
    pub fn new(config: GuidanceConfig, sink: Arc<dyn FeedbackSink>, runtime: Handle) -> Self {
        FeedbackScheduler {
            config,
            timer: CueTimer::new(runtime),
            sink,
            asset: None,
            audio_acquired: false,
            missing_asset_logged: false,
        }
    }

    /// Take ownership of the beep for this run.
    ///
    /// Without an asset cues degrade to no-ops; that is logged once per
    /// scheduler, not once per run.
    pub fn acquire_audio(&mut self, asset: Option<BeepAsset>) {
        if asset.is_none() && !self.missing_asset_logged {
            warn!("No beep asset available, radar continues with haptic and visual feedback only");
            self.missing_asset_logged = true;
        }
        self.asset = asset.map(Arc::new);
        self.audio_acquired = true;
    }

    /// Whether the missing-asset warning has been logged
    pub fn missing_asset_reported(&self) -> bool {
        self.missing_asset_logged
    }

    pub fn has_audio(&self) -> bool {
        self.asset.is_some()
    }

    /// React to a freshly computed guidance state
    pub fn on_guidance_updated(&self, state: &GuidanceState) {
        match plan_cue(state, &self.config) {
            CueCommand::Cancel => {
                self.timer.cancel();
            }
            CueCommand::Arm(interval) => {
                let sink = Arc::clone(&self.sink);
                let asset = self.asset.clone();
                let duration = self.config.cue_duration();
                self.timer.arm(interval, move || match asset {
                    Some(asset) => sink.audio_cue(&asset, duration),
                    None => debug!("Cue fired without beep asset"),
                });
            }
        }
    }

    /// Forward an alignment pulse from the engine
    pub fn haptic_pulse(&self) {
        self.sink.haptic_pulse();
    }

    /// Drop the pending cue without releasing audio
    pub fn cancel(&self) -> bool {
        self.timer.cancel()
    }

    pub fn is_pending(&self) -> bool {
        self.timer.is_pending()
    }

    /// Cancel the pending cue and release audio. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.timer.cancel();
        if self.audio_acquired {
            self.asset = None;
            self.sink.release_audio();
            self.audio_acquired = false;
            debug!("Audio released");
        }
    }

    pub fn cue_interval_for(&self, state: &GuidanceState) -> Option<Duration> {
        match plan_cue(state, &self.config) {
            CueCommand::Arm(interval) => Some(interval),
            CueCommand::Cancel => None,
        }
    }
}
