//! Radar mode: the runtime around the guidance engine.
//!
//! ```text
//!   SensorAdapter ──SensorPort──► Radar ──► GuidanceEngine (core)
//!                                   │              │
//!                                   │      GuidanceState ──► watch subscribers
//!                                   ▼
//!                           FeedbackScheduler ──► FeedbackSink (beep, haptic)
//! ```
//!
//! All mutable state sits behind one mutex. Handles are cheap to clone and may
//! be used from any thread; snapshots are published last-write-wins.

use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::Instant;

use routes_core::{
    Coordinate, GuidanceEngine, GuidanceState, RadarLifecycle, RadarStatus, SampleFusion,
    SensorSample,
};

use crate::audio::{BeepAsset, FeedbackSink};
use crate::scheduler::FeedbackScheduler;
use crate::sensor::{SensorAdapter, SensorEvent, SensorIngest, SensorPort};
use crate::settings::{Settings, SettingsError};

struct RadarInner {
    engine: GuidanceEngine,
    fusion: SampleFusion,
    scheduler: FeedbackScheduler,
    lifecycle: RadarLifecycle,
}

impl RadarInner {
    /// Recompute from `sample`, publish, and drive feedback
    fn process(&mut self, sample: &SensorSample, publisher: &watch::Sender<GuidanceState>) {
        let pulse = self.engine.on_sample(sample);
        let state = self.engine.current_state();
        publisher.send_replace(state);
        if pulse.is_some() {
            debug!("Aligned with target, pulsing");
            self.scheduler.haptic_pulse();
        }
        self.scheduler.on_guidance_updated(&state);
    }
}

struct RadarShared {
    inner: Mutex<RadarInner>,
    adapter: Arc<dyn SensorAdapter>,
    publisher: watch::Sender<GuidanceState>,
    beep_path: Option<PathBuf>,
    epoch: Instant,
}

impl RadarShared {
    fn lock(&self) -> MutexGuard<'_, RadarInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn load_beep(&self) -> Option<BeepAsset> {
        let path = self.beep_path.as_ref()?;
        match BeepAsset::load(path) {
            Ok(asset) => Some(asset),
            Err(e) => {
                debug!("{}", e);
                None
            }
        }
    }

    fn stop_sensors(&self) {
        self.adapter.stop_location_updates();
        self.adapter.stop_heading_updates();
    }
}

impl SensorIngest for RadarShared {
    fn ingest(&self, event: SensorEvent) {
        let reading = match event {
            SensorEvent::Reading(reading) => reading,
            SensorEvent::LocationError(message) => {
                warn!("Location update failed: {}", message);
                return;
            }
            SensorEvent::HeadingError(message) => {
                warn!("Heading update failed: {}", message);
                return;
            }
        };

        let mut inner = self.lock();
        if !inner.lifecycle.is_running() {
            debug!("Radar not running, dropping {:?}", reading);
            return;
        }
        if let Some(sample) = inner.fusion.push(reading) {
            inner.process(&sample, &self.publisher);
        }
    }
}

/// Handle to the radar
#[derive(Clone)]
pub struct Radar {
    shared: Arc<RadarShared>,
}

impl Radar {
    /// Create a radar driving `adapter` and reporting to `sink`.
    ///
    /// Fails when the guidance constants in `settings` are unusable.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime; use [`Radar::with_runtime`]
    /// to pass one explicitly.
    pub fn new(
        adapter: Arc<dyn SensorAdapter>,
        sink: Arc<dyn FeedbackSink>,
        settings: &Settings,
    ) -> Result<Self, SettingsError> {
        Self::with_runtime(adapter, sink, settings, Handle::current())
    }

    pub fn with_runtime(
        adapter: Arc<dyn SensorAdapter>,
        sink: Arc<dyn FeedbackSink>,
        settings: &Settings,
        runtime: Handle,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;
        let inner = RadarInner {
            engine: GuidanceEngine::new(settings.guidance.clone()),
            fusion: SampleFusion::new(),
            scheduler: FeedbackScheduler::new(settings.guidance.clone(), sink, runtime),
            lifecycle: RadarLifecycle::new(),
        };
        let (publisher, _) = watch::channel(GuidanceState::inactive());
        Ok(Radar {
            shared: Arc::new(RadarShared {
                inner: Mutex::new(inner),
                adapter,
                publisher,
                beep_path: settings.beep_path.clone(),
                epoch: Instant::now(),
            }),
        })
    }

    /// Port adapters deliver sensor events through
    pub fn sensor_port(&self) -> SensorPort {
        let shared: Arc<dyn SensorIngest> = self.shared.clone();
        SensorPort::new(Arc::downgrade(&shared))
    }

    /// Change or clear the target.
    ///
    /// The pending cue is cancelled and the latch re-armed before this
    /// returns. While running with a known position and heading, the new
    /// target is evaluated at once.
    pub fn set_target(&self, target: Option<Coordinate>) {
        let mut inner = self.shared.lock();
        inner.engine.set_target(target);
        inner.scheduler.cancel();

        match target {
            Some(target) => info!("Target set to {}", target),
            None => info!("Target cleared"),
        }

        let sample = inner.fusion.sample();
        match sample {
            Some(sample) if inner.lifecycle.is_running() => {
                inner.process(&sample, &self.shared.publisher);
            }
            _ => {
                self.shared.publisher.send_replace(inner.engine.current_state());
            }
        }
    }

    pub fn target(&self) -> Option<Coordinate> {
        self.shared.lock().engine.target()
    }

    /// Enter radar mode.
    ///
    /// Without a target this reports [`RadarStatus::TargetNotSet`] and leaves
    /// the sensors off. Starting an already running radar changes nothing.
    pub fn start_radar(&self) -> RadarStatus {
        let now = self.shared.now_ms();
        let (status, was_running) = {
            let mut inner = self.shared.lock();
            let was_running = inner.lifecycle.is_running();
            let has_target = inner.engine.target().is_some();
            let status = inner.lifecycle.start(has_target, now);

            if status.is_running() && !was_running {
                let beep = self.shared.load_beep();
                inner.scheduler.acquire_audio(beep);
            } else if was_running && !status.is_running() {
                inner.scheduler.stop();
                inner.engine.reset();
                inner.fusion.clear();
                self.shared.publisher.send_replace(inner.engine.current_state());
            }
            (status, was_running)
        };

        match status {
            RadarStatus::Running if !was_running => {
                let port = self.sensor_port();
                self.shared.adapter.start_location_updates(port.clone());
                self.shared.adapter.start_heading_updates(port);
                info!("Radar started");
            }
            RadarStatus::Running => debug!("Radar already running"),
            RadarStatus::TargetNotSet => {
                if was_running {
                    self.shared.stop_sensors();
                }
                info!("Radar not started: no target set");
            }
            RadarStatus::Inactive | RadarStatus::Stopped => {}
        }
        status
    }

    /// Leave radar mode. Returns true if the radar was running.
    ///
    /// Stops both sensor streams, cancels the pending cue, releases audio,
    /// re-arms the latch and forgets fused readings. The target is kept.
    pub fn stop_radar(&self) -> bool {
        let now = self.shared.now_ms();
        let was_running = {
            let mut inner = self.shared.lock();
            let was_running = inner.lifecycle.stop(now);
            inner.scheduler.stop();
            inner.engine.reset();
            inner.fusion.clear();
            self.shared.publisher.send_replace(inner.engine.current_state());
            was_running
        };

        self.shared.stop_sensors();
        if was_running {
            info!("Radar stopped");
        }
        was_running
    }

    /// Latest published snapshot
    pub fn current_state(&self) -> GuidanceState {
        *self.shared.publisher.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<GuidanceState> {
        self.shared.publisher.subscribe()
    }

    pub fn status(&self) -> RadarStatus {
        self.shared.lock().lifecycle.status()
    }

    /// Number of runs started since creation
    pub fn sessions(&self) -> u32 {
        self.shared.lock().lifecycle.sessions()
    }

    /// Last known position, while running
    pub fn last_position(&self) -> Option<Coordinate> {
        self.shared.lock().fusion.last_position()
    }

    pub fn cue_pending(&self) -> bool {
        self.shared.lock().scheduler.is_pending()
    }
}
