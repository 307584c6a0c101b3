//! Subcommand implementations for the `accessible-routes` binary.

use log::{debug, info, warn};
use miette::{bail, IntoDiagnostic, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

use routes_core::format::{format_distance, format_duration};
use routes_core::{Coordinate, GuidanceState, Notice, Place};

use crate::audio::{BeepAsset, FeedbackSink};
use crate::radar::Radar;
use crate::sensor::{ReplayAdapter, ScriptStep, SessionScript};
use crate::services::{Catalog, NearbyFinder, PlaceSearch, RoutePlanner, StraightLineDirections};
use crate::settings::Settings;
use crate::{Cli, Command, RadarArgs};

/// English wording for a notice
pub fn describe(notice: &Notice) -> String {
    match notice {
        Notice::RadarStarted => "Radar started".to_string(),
        Notice::RadarStopped => "Radar stopped".to_string(),
        Notice::TargetNotSet => "Target not set".to_string(),
        Notice::SearchResults { count } => format!("Results updated: {}", count),
        Notice::NothingFound => "Nothing found".to_string(),
        Notice::SearchFailed => "Connection or search error".to_string(),
        Notice::NearbyUpdated { count } => format!("Nearby places updated: {}", count),
        Notice::RouteBuilt {
            distance_meters,
            duration_seconds,
        } => format!(
            "Route built. Distance {}, time {}",
            format_distance(*distance_meters),
            format_duration(*duration_seconds)
        ),
        Notice::RouteFailed => "Could not build a route".to_string(),
        Notice::PositionUnavailable => "Could not determine your position".to_string(),
    }
}

fn announce(notice: &Notice) {
    info!("{}", describe(notice));
}

/// Feedback rendered as log lines
struct LogSink;

impl FeedbackSink for LogSink {
    fn audio_cue(&self, asset: &BeepAsset, duration: Duration) {
        debug!("beep '{}' for {} ms", asset.name(), duration.as_millis());
    }

    fn haptic_pulse(&self) {
        info!("pulse: facing the target");
    }

    fn release_audio(&self) {
        debug!("audio released");
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref()).into_diagnostic()?;
    let catalog = open_catalog(cli.catalog.as_deref())?;
    let search = Arc::new(PlaceSearch::new(Arc::new(catalog), settings.search.clone()));

    match cli.command {
        Command::Radar(args) => run_radar(args, settings, &search).await,
        Command::Search { query, near } => {
            let result = search.search(&query, near).await;
            announce(&Notice::for_search(&result));
            for place in result.into_diagnostic()? {
                print_place(&place);
            }
            Ok(())
        }
        Command::Nearby { near } => {
            let places = NearbyFinder::new(search).find(near).await;
            announce(&Notice::NearbyUpdated {
                count: places.len(),
            });
            for place in &places {
                print_place(place);
            }
            Ok(())
        }
        Command::Route { from, to, mode } => {
            let planner = RoutePlanner::new(Arc::new(StraightLineDirections), mode.into());
            let destination = Place::new(None, None, to);
            match planner.build_route(Some(from), &destination).await {
                Ok(route) => {
                    announce(&Notice::for_route(&route));
                    Ok(())
                }
                Err(e) => {
                    announce(&Notice::from(&e));
                    Err(e).into_diagnostic()
                }
            }
        }
    }
}

fn open_catalog(path: Option<&Path>) -> Result<Catalog> {
    match path {
        Some(path) => Catalog::load(path).into_diagnostic(),
        None => {
            warn!("No catalog given, searches will find nothing");
            Ok(Catalog::default())
        }
    }
}

fn print_place(place: &Place) {
    let mut line = place.name.clone();
    if let Some(category) = &place.category {
        line.push_str(&format!(" [{}]", category));
    }
    if let Some(address) = &place.address {
        line.push_str(&format!(", {}", address));
    }
    if let Some(distance) = place.distance_meters {
        line.push_str(&format!(" ({})", format_distance(distance)));
    }
    println!("{}  {}", place.coordinate, line);
}

fn first_position(script: &SessionScript) -> Option<Coordinate> {
    script.steps.iter().find_map(|step| match step {
        ScriptStep::Location { position, .. } => Some(*position),
        _ => None,
    })
}

async fn resolve_target(
    args: &RadarArgs,
    script: &SessionScript,
    search: &PlaceSearch,
) -> Result<Coordinate> {
    if let Some(target) = args.target {
        return Ok(target);
    }
    let Some(query) = args.place.as_deref() else {
        bail!("Either --target or --place is required");
    };
    let places = search
        .search_limited(query, first_position(script), 1)
        .await
        .into_diagnostic()?;
    match places.into_iter().next() {
        Some(place) => {
            info!("Target: {} at {}", place.name, place.coordinate);
            Ok(place.coordinate)
        }
        None => bail!("No place matching '{}'", query),
    }
}

fn log_state(state: &GuidanceState, was_aligned: bool) {
    if !state.active {
        return;
    }
    let line = format!(
        "{} to go, turn {:+.0}°, progress {:.0}%, ETA {}",
        format_distance(state.distance_meters),
        state.relative_bearing_deg,
        state.progress * 100.0,
        format_duration(state.eta_seconds)
    );
    if state.aligned != was_aligned {
        info!("{}{}", line, if state.aligned { " (on course)" } else { "" });
    } else {
        debug!("{}", line);
    }
}

async fn run_radar(
    mut args: RadarArgs,
    mut settings: Settings,
    search: &PlaceSearch,
) -> Result<()> {
    let script = SessionScript::load(&args.session).into_diagnostic()?;
    let target = resolve_target(&args, &script, search).await?;
    if let Some(beep) = args.beep.take() {
        settings.beep_path = Some(beep);
    }

    let adapter =
        Arc::new(ReplayAdapter::new(script, args.speed, Handle::current()).into_diagnostic()?);
    let radar = Radar::new(adapter.clone(), Arc::new(LogSink), &settings).into_diagnostic()?;
    let mut states = radar.subscribe();

    radar.set_target(Some(target));
    let status = radar.start_radar();
    if let Some(notice) = Notice::for_radar_start(status) {
        announce(&notice);
    }
    if !status.is_running() {
        return Ok(());
    }

    let finished = adapter.finished();
    tokio::pin!(finished);
    let mut aligned = false;
    loop {
        tokio::select! {
            _ = &mut finished => break,
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                log_state(&state, aligned);
                aligned = state.aligned;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    let last = radar.current_state();
    radar.stop_radar();
    announce(&Notice::RadarStopped);
    if last.active {
        info!(
            "Final distance to target: {}",
            format_distance(last.distance_meters)
        );
    }
    Ok(())
}
