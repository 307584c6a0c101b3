//! Replays the bundled demo walk end to end.

use std::path::PathBuf;
use std::sync::Arc;

use accessible_routes::sensor::{ScriptStep, SessionScript};
use accessible_routes::settings::SearchSettings;
use accessible_routes::{Catalog, ChannelSink, PlaceSearch, Radar, ReplayAdapter, Settings};
use routes_core::{FeedbackEvent, RadarStatus};
use tokio::runtime::Handle;

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

#[tokio::test(start_paused = true)]
async fn test_demo_walk_reaches_pharmacy() {
    let script = SessionScript::load(&demo("walk.json")).unwrap();
    let start = script
        .steps
        .iter()
        .find_map(|step| match step {
            ScriptStep::Location { position, .. } => Some(*position),
            _ => None,
        })
        .unwrap();

    let catalog = Catalog::load(&demo("catalog.json")).unwrap();
    let search = PlaceSearch::new(Arc::new(catalog), SearchSettings::default());
    let pharmacy = search
        .search_limited("pharmacy", Some(start), 1)
        .await
        .unwrap()
        .remove(0);
    assert_eq!(pharmacy.name, "Pharmacy No. 1");

    let settings = Settings {
        beep_path: Some(demo("beep.wav")),
        ..Default::default()
    };
    let adapter = Arc::new(ReplayAdapter::new(script, 1.0, Handle::current()).unwrap());
    let (sink, mut feedback) = ChannelSink::channel();
    let radar = Radar::new(adapter.clone(), Arc::new(sink), &settings).unwrap();

    radar.set_target(Some(pharmacy.coordinate));
    assert_eq!(radar.start_radar(), RadarStatus::Running);
    adapter.finished().await;

    let state = radar.current_state();
    assert!(state.active);
    assert!((state.distance_meters - 20.0).abs() < 1.0);
    assert!(state.progress > 0.97);

    let mut pulses = 0;
    let mut cues = 0;
    while let Ok(event) = feedback.try_recv() {
        match event {
            FeedbackEvent::HapticPulse => pulses += 1,
            FeedbackEvent::AudioCue { .. } => cues += 1,
        }
    }
    // Drifting out of the band and back pulses again
    assert!(pulses >= 2);
    assert!(cues > 0);

    assert!(radar.stop_radar());
    assert!(!adapter.is_playing());
}
