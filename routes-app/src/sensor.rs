//! Sensor adapters and the radar's ingestion port.
//!
//! An adapter owns the platform location and compass streams and pushes every
//! callback into a [`SensorPort`]. The port holds only a weak reference to the
//! radar, so an adapter outliving its radar delivers into nothing.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use routes_core::{Coordinate, SensorReading};

/// Something a sensor callback reported
#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent {
    Reading(SensorReading),
    LocationError(String),
    HeadingError(String),
}

/// Receiver side of a [`SensorPort`]
pub trait SensorIngest: Send + Sync {
    fn ingest(&self, event: SensorEvent);
}

/// Cloneable handle adapters deliver sensor events through
#[derive(Clone)]
pub struct SensorPort {
    target: Weak<dyn SensorIngest>,
}

impl SensorPort {
    pub fn new(target: Weak<dyn SensorIngest>) -> Self {
        SensorPort { target }
    }

    /// Deliver an event. Returns false once the receiver is gone.
    pub fn deliver(&self, event: SensorEvent) -> bool {
        match self.target.upgrade() {
            Some(target) => {
                target.ingest(event);
                true
            }
            None => false,
        }
    }

    pub fn location(&self, position: Coordinate, timestamp_ms: u64) -> bool {
        self.deliver(SensorEvent::Reading(SensorReading::Location {
            position,
            timestamp_ms,
        }))
    }

    pub fn heading(&self, degrees: f64, timestamp_ms: u64) -> bool {
        self.deliver(SensorEvent::Reading(SensorReading::Heading {
            degrees,
            timestamp_ms,
        }))
    }
}

/// Platform location and compass streams.
///
/// Stop calls on a stream that is not running are no-ops.
pub trait SensorAdapter: Send + Sync {
    fn start_location_updates(&self, port: SensorPort);
    fn stop_location_updates(&self);
    fn start_heading_updates(&self, port: SensorPort);
    fn stop_heading_updates(&self);
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Cannot read session script '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid session script")]
    Parse(#[from] serde_json::Error),
    #[error("Replay speed must be positive, got {0}")]
    InvalidSpeed(f64),
}

/// One timed step of a recorded session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ScriptStep {
    Location { at_ms: u64, position: Coordinate },
    Heading { at_ms: u64, degrees: f64 },
    LocationError { at_ms: u64, message: String },
    HeadingError { at_ms: u64, message: String },
}

impl ScriptStep {
    pub fn at_ms(&self) -> u64 {
        match self {
            ScriptStep::Location { at_ms, .. }
            | ScriptStep::Heading { at_ms, .. }
            | ScriptStep::LocationError { at_ms, .. }
            | ScriptStep::HeadingError { at_ms, .. } => *at_ms,
        }
    }

    fn is_location_stream(&self) -> bool {
        matches!(
            self,
            ScriptStep::Location { .. } | ScriptStep::LocationError { .. }
        )
    }

    fn to_event(&self) -> SensorEvent {
        match self {
            ScriptStep::Location { at_ms, position } => {
                SensorEvent::Reading(SensorReading::Location {
                    position: *position,
                    timestamp_ms: *at_ms,
                })
            }
            ScriptStep::Heading { at_ms, degrees } => {
                SensorEvent::Reading(SensorReading::Heading {
                    degrees: *degrees,
                    timestamp_ms: *at_ms,
                })
            }
            ScriptStep::LocationError { message, .. } => {
                SensorEvent::LocationError(message.clone())
            }
            ScriptStep::HeadingError { message, .. } => SensorEvent::HeadingError(message.clone()),
        }
    }
}

/// Recorded walk, as stored on disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionScript {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub steps: Vec<ScriptStep>,
}

impl SessionScript {
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let json = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, ScriptError> {
        let mut script: SessionScript = serde_json::from_str(json)?;
        // Stable, so steps sharing a timestamp keep their file order
        script.steps.sort_by_key(ScriptStep::at_ms);
        Ok(script)
    }

    pub fn duration_ms(&self) -> u64 {
        self.steps.last().map(ScriptStep::at_ms).unwrap_or(0)
    }
}

#[derive(Default)]
struct Streams {
    location: AtomicBool,
    heading: AtomicBool,
}

struct Playback {
    cancel: CancellationToken,
    done: CancellationToken,
}

#[derive(Default)]
struct ReplayState {
    playback: Option<Playback>,
}

/// Adapter replaying a recorded session in real time.
///
/// Playback starts with the first started stream and is cancelled when both
/// streams are stopped. Steps of a stream that is not started are skipped.
pub struct ReplayAdapter {
    script: Arc<SessionScript>,
    speed: f64,
    runtime: Handle,
    streams: Arc<Streams>,
    state: Mutex<ReplayState>,
}

impl ReplayAdapter {
    /// `speed` scales time: 2.0 replays twice as fast as recorded
    pub fn new(script: SessionScript, speed: f64, runtime: Handle) -> Result<Self, ScriptError> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(ScriptError::InvalidSpeed(speed));
        }
        Ok(ReplayAdapter {
            script: Arc::new(script),
            speed,
            runtime,
            streams: Arc::new(Streams::default()),
            state: Mutex::new(ReplayState::default()),
        })
    }

    pub fn script(&self) -> &SessionScript {
        &self.script
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.state)
            .playback
            .as_ref()
            .is_some_and(|p| !p.done.is_cancelled())
    }

    /// Resolves when the current playback ends or is cancelled, immediately
    /// if nothing is playing.
    pub fn finished(&self) -> impl Future<Output = ()> + Send + 'static {
        let done = lock(&self.state)
            .playback
            .as_ref()
            .map(|p| p.done.clone());
        async move {
            if let Some(done) = done {
                done.cancelled().await;
            }
        }
    }

    fn start_stream(&self, flag: &AtomicBool, port: SensorPort) {
        flag.store(true, Ordering::SeqCst);
        let mut state = lock(&self.state);
        if state
            .playback
            .as_ref()
            .is_some_and(|p| !p.done.is_cancelled())
        {
            return;
        }

        let cancel = CancellationToken::new();
        let done = CancellationToken::new();
        state.playback = Some(Playback {
            cancel: cancel.clone(),
            done: done.clone(),
        });
        info!(
            "Replaying {} sensor steps over {} ms at {}x",
            self.script.steps.len(),
            self.script.duration_ms(),
            self.speed
        );
        self.runtime.spawn(play(
            Arc::clone(&self.script),
            self.speed,
            Arc::clone(&self.streams),
            port,
            cancel,
            done,
        ));
    }

    fn stop_stream(&self, flag: &AtomicBool) {
        flag.store(false, Ordering::SeqCst);
        if self.streams.location.load(Ordering::SeqCst)
            || self.streams.heading.load(Ordering::SeqCst)
        {
            return;
        }
        if let Some(playback) = lock(&self.state).playback.take() {
            playback.cancel.cancel();
            debug!("Replay cancelled");
        }
    }
}

impl Drop for ReplayAdapter {
    fn drop(&mut self) {
        if let Some(playback) = lock(&self.state).playback.take() {
            playback.cancel.cancel();
        }
    }
}

impl SensorAdapter for ReplayAdapter {
    fn start_location_updates(&self, port: SensorPort) {
        self.start_stream(&self.streams.location, port);
    }

    fn stop_location_updates(&self) {
        self.stop_stream(&self.streams.location);
    }

    fn start_heading_updates(&self, port: SensorPort) {
        self.start_stream(&self.streams.heading, port);
    }

    fn stop_heading_updates(&self) {
        self.stop_stream(&self.streams.heading);
    }
}

async fn play(
    script: Arc<SessionScript>,
    speed: f64,
    streams: Arc<Streams>,
    port: SensorPort,
    cancel: CancellationToken,
    done: CancellationToken,
) {
    let start = tokio::time::Instant::now();
    let mut delivered = 0usize;

    for step in script.steps.iter() {
        let due = start + Duration::from_secs_f64(step.at_ms() as f64 / 1000.0 / speed);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep_until(due) => {}
        }
        // Stream flags may already belong to the next run
        if cancel.is_cancelled() {
            break;
        }

        let enabled = if step.is_location_stream() {
            streams.location.load(Ordering::SeqCst)
        } else {
            streams.heading.load(Ordering::SeqCst)
        };
        if !enabled {
            continue;
        }
        if !port.deliver(step.to_event()) {
            warn!("Radar went away, ending replay");
            break;
        }
        delivered += 1;
    }

    if !cancel.is_cancelled() {
        info!("Replay finished after {} steps", delivered);
    }
    done.cancel();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterCall {
    StartLocation,
    StopLocation,
    StartHeading,
    StopHeading,
}

#[derive(Default)]
struct ScriptedState {
    calls: Vec<AdapterCall>,
    location_port: Option<SensorPort>,
    heading_port: Option<SensorPort>,
}

/// Adapter for tests and embedding: records calls and lets the caller push
/// readings synchronously into whichever streams are started.
#[derive(Default)]
pub struct ScriptedAdapter {
    state: Mutex<ScriptedState>,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<AdapterCall> {
        lock(&self.state).calls.clone()
    }

    pub fn location_running(&self) -> bool {
        lock(&self.state).location_port.is_some()
    }

    pub fn heading_running(&self) -> bool {
        lock(&self.state).heading_port.is_some()
    }

    /// Push a location fix. Returns false if the stream is not started.
    pub fn push_location(&self, position: Coordinate, timestamp_ms: u64) -> bool {
        let port = lock(&self.state).location_port.clone();
        port.is_some_and(|port| port.location(position, timestamp_ms))
    }

    /// Push a heading. Returns false if the stream is not started.
    pub fn push_heading(&self, degrees: f64, timestamp_ms: u64) -> bool {
        let port = lock(&self.state).heading_port.clone();
        port.is_some_and(|port| port.heading(degrees, timestamp_ms))
    }

    pub fn push_location_error(&self, message: &str) -> bool {
        let port = lock(&self.state).location_port.clone();
        port.is_some_and(|port| port.deliver(SensorEvent::LocationError(message.to_string())))
    }

    pub fn push_heading_error(&self, message: &str) -> bool {
        let port = lock(&self.state).heading_port.clone();
        port.is_some_and(|port| port.deliver(SensorEvent::HeadingError(message.to_string())))
    }
}

impl SensorAdapter for ScriptedAdapter {
    fn start_location_updates(&self, port: SensorPort) {
        let mut state = lock(&self.state);
        state.calls.push(AdapterCall::StartLocation);
        state.location_port = Some(port);
    }

    fn stop_location_updates(&self) {
        let mut state = lock(&self.state);
        state.calls.push(AdapterCall::StopLocation);
        state.location_port = None;
    }

    fn start_heading_updates(&self, port: SensorPort) {
        let mut state = lock(&self.state);
        state.calls.push(AdapterCall::StartHeading);
        state.heading_port = Some(port);
    }

    fn stop_heading_updates(&self) {
        let mut state = lock(&self.state);
        state.calls.push(AdapterCall::StopHeading);
        state.heading_port = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Collector {
        events: Mutex<Vec<SensorEvent>>,
    }

    impl SensorIngest for Collector {
        fn ingest(&self, event: SensorEvent) {
            lock(&self.events).push(event);
        }
    }

    impl Collector {
        fn events(&self) -> Vec<SensorEvent> {
            lock(&self.events).clone()
        }
    }

    fn port_for(collector: &Arc<Collector>) -> SensorPort {
        let ingest: Arc<dyn SensorIngest> = collector.clone();
        SensorPort::new(Arc::downgrade(&ingest))
    }

    const SCRIPT: &str = r#"{
        "description": "short walk",
        "steps": [
            {"type": "heading", "atMs": 500, "degrees": 90.0},
            {"type": "location", "atMs": 0, "position": {"latitude": 55.75, "longitude": 37.61}},
            {"type": "headingError", "atMs": 1000, "message": "interference"},
            {"type": "location", "atMs": 1500, "position": {"latitude": 55.7501, "longitude": 37.61}}
        ]
    }"#;

    #[test]
    fn test_script_parse_sorts_steps() {
        let script = SessionScript::from_json(SCRIPT).unwrap();
        assert_eq!(script.description.as_deref(), Some("short walk"));
        let times: Vec<u64> = script.steps.iter().map(ScriptStep::at_ms).collect();
        assert_eq!(times, vec![0, 500, 1000, 1500]);
        assert_eq!(script.duration_ms(), 1500);
    }

    #[test]
    fn test_script_rejects_bad_coordinate() {
        let json = r#"{"steps": [{"type": "location", "atMs": 0, "position": {"latitude": 95.0, "longitude": 0.0}}]}"#;
        assert!(matches!(
            SessionScript::from_json(json),
            Err(ScriptError::Parse(_))
        ));
    }

    #[test]
    fn test_port_after_receiver_dropped() {
        let collector = Arc::new(Collector::default());
        let port = port_for(&collector);
        assert!(port.heading(10.0, 0));
        drop(collector);
        assert!(!port.heading(20.0, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_delivers_in_time() {
        let collector = Arc::new(Collector::default());
        let script = SessionScript::from_json(SCRIPT).unwrap();
        let adapter = ReplayAdapter::new(script, 1.0, Handle::current()).unwrap();

        adapter.start_location_updates(port_for(&collector));
        adapter.start_heading_updates(port_for(&collector));
        assert!(adapter.is_playing());

        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(collector.events().len(), 2);

        adapter.finished().await;
        let events = collector.events();
        assert_eq!(events.len(), 4);
        assert_eq!(events[2], SensorEvent::HeadingError("interference".to_string()));
        assert!(!adapter.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_speed_multiplier() {
        let collector = Arc::new(Collector::default());
        let script = SessionScript::from_json(SCRIPT).unwrap();
        let adapter = ReplayAdapter::new(script, 4.0, Handle::current()).unwrap();

        let started = tokio::time::Instant::now();
        adapter.start_location_updates(port_for(&collector));
        adapter.start_heading_updates(port_for(&collector));
        adapter.finished().await;

        assert_eq!(collector.events().len(), 4);
        assert!(started.elapsed() <= Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_skips_stopped_stream() {
        let collector = Arc::new(Collector::default());
        let script = SessionScript::from_json(SCRIPT).unwrap();
        let adapter = ReplayAdapter::new(script, 1.0, Handle::current()).unwrap();

        adapter.start_location_updates(port_for(&collector));
        adapter.finished().await;

        let events = collector.events();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| matches!(
            e,
            SensorEvent::Reading(SensorReading::Location { .. })
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopping_both_streams_cancels_replay() {
        let collector = Arc::new(Collector::default());
        let script = SessionScript::from_json(SCRIPT).unwrap();
        let adapter = ReplayAdapter::new(script, 1.0, Handle::current()).unwrap();

        adapter.start_location_updates(port_for(&collector));
        adapter.start_heading_updates(port_for(&collector));
        tokio::time::sleep(Duration::from_millis(100)).await;

        let finished = adapter.finished();
        adapter.stop_location_updates();
        assert!(adapter.is_playing());
        adapter.stop_heading_updates();
        assert!(!adapter.is_playing());

        finished.await;
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(collector.events().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replays_only_new_session() {
        let collector = Arc::new(Collector::default());
        let script = SessionScript::from_json(SCRIPT).unwrap();
        let adapter = ReplayAdapter::new(script, 1.0, Handle::current()).unwrap();

        adapter.start_location_updates(port_for(&collector));
        adapter.start_heading_updates(port_for(&collector));
        tokio::time::sleep(Duration::from_millis(700)).await;
        let before = collector.events().len();
        assert_eq!(before, 2);

        adapter.stop_location_updates();
        adapter.stop_heading_updates();
        adapter.start_location_updates(port_for(&collector));
        adapter.start_heading_updates(port_for(&collector));
        adapter.finished().await;
        tokio::time::sleep(Duration::from_secs(2)).await;

        let events = collector.events();
        assert_eq!(events.len(), before + 4);
        assert!(matches!(
            events[before],
            SensorEvent::Reading(SensorReading::Location { .. })
        ));
    }

    #[test]
    fn test_replay_rejects_bad_speed() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let result = ReplayAdapter::new(SessionScript::default(), 0.0, runtime.handle().clone());
        assert!(matches!(result, Err(ScriptError::InvalidSpeed(_))));
    }

    #[test]
    fn test_scripted_adapter_records_calls() {
        let collector = Arc::new(Collector::default());
        let adapter = ScriptedAdapter::new();
        let here = Coordinate::new(10.0, 10.0).unwrap();

        assert!(!adapter.push_location(here, 0));
        adapter.start_location_updates(port_for(&collector));
        adapter.start_heading_updates(port_for(&collector));
        assert!(adapter.push_location(here, 1));
        assert!(adapter.push_heading_error("calibrating"));
        adapter.stop_heading_updates();
        assert!(!adapter.push_heading(5.0, 2));

        assert_eq!(
            adapter.calls(),
            vec![
                AdapterCall::StartLocation,
                AdapterCall::StartHeading,
                AdapterCall::StopHeading
            ]
        );
        assert_eq!(collector.events().len(), 2);
        assert!(adapter.location_running());
        assert!(!adapter.heading_running());
    }
}
