//! # Accessible Routes
//!
//! Runtime for the accessible navigation radar: a compass-style mode that
//! guides a visually impaired user toward a target with a beep whose cadence
//! follows the turn still needed, and a haptic pulse when facing the target.
//!
//! The guidance math lives in [`routes_core`]; this crate adds the parts
//! that need a runtime:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                   accessible-routes                       │
//! │  ┌──────────────┐   ┌──────────────┐   ┌───────────────┐  │
//! │  │ SensorAdapter│──►│    Radar     │──►│ watch channel │  │
//! │  │ (replay,     │   │ (engine,     │   │ (GuidanceState│  │
//! │  │  scripted)   │   │  lifecycle)  │   │  snapshots)   │  │
//! │  └──────────────┘   └──────┬───────┘   └───────────────┘  │
//! │                            ▼                              │
//! │                  ┌──────────────────┐                     │
//! │                  │FeedbackScheduler │──► FeedbackSink     │
//! │                  │ (CueTimer)       │                     │
//! │                  └──────────────────┘                     │
//! │  services: PlaceSearch, SearchDebouncer, NearbyFinder,    │
//! │            RoutePlanner, offline Catalog                  │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example: Driving the radar by hand
//!
//! ```rust
//! use accessible_routes::{ChannelSink, Radar, ScriptedAdapter, Settings};
//! use routes_core::{destination, Coordinate, FeedbackEvent, RadarStatus};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let adapter = Arc::new(ScriptedAdapter::new());
//! let (sink, mut feedback) = ChannelSink::channel();
//! let radar = Radar::new(adapter.clone(), Arc::new(sink), &Settings::default()).unwrap();
//!
//! let here = Coordinate::new(55.7558, 37.6173).unwrap();
//! radar.set_target(Some(destination(&here, 0.0, 500.0)));
//! assert_eq!(radar.start_radar(), RadarStatus::Running);
//!
//! adapter.push_location(here, 0);
//! adapter.push_heading(0.0, 0);
//! assert!(radar.current_state().aligned);
//! assert_eq!(feedback.try_recv().unwrap(), FeedbackEvent::HapticPulse);
//!
//! radar.stop_radar();
//! # }
//! ```
//!
//! ## Command-Line Interface
//!
//! See [`Cli`]. The binary replays recorded sessions through the radar and
//! exposes search, nearby lookup and routing against an offline catalog.

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use routes_core::{Coordinate, TransportMode};

pub mod audio;
pub mod commands;
pub mod cue;
pub mod radar;
pub mod scheduler;
pub mod sensor;
pub mod services;
pub mod settings;

pub use audio::{AudioError, BeepAsset, ChannelSink, FeedbackSink};
pub use radar::Radar;
pub use sensor::{ReplayAdapter, ScriptedAdapter, SensorAdapter, SensorEvent, SensorPort};
pub use services::{
    Catalog, NearbyFinder, PlaceSearch, RoutePlanner, SearchDebouncer, ServiceError,
};
pub use settings::{Settings, SettingsError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Clone, Debug)]
#[command(version, about)]
pub struct Cli {
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    /// Settings file, instead of the one in the user config directory
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Offline place catalog (JSON array of places)
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Replay a recorded walk through the radar
    Radar(RadarArgs),

    /// Search places by name or category
    Search {
        query: String,

        /// Bias results toward `lat,lon`
        #[arg(long, allow_hyphen_values = true)]
        near: Option<Coordinate>,
    },

    /// Closest cafe, pharmacy and bus stop
    Nearby {
        /// Current position as `lat,lon`
        #[arg(long, allow_hyphen_values = true)]
        near: Coordinate,
    },

    /// Build a route between two points
    Route {
        #[arg(long, allow_hyphen_values = true)]
        from: Coordinate,

        #[arg(long, allow_hyphen_values = true)]
        to: Coordinate,

        #[arg(long, default_value_t, value_enum)]
        mode: Mode,
    },
}

#[derive(Args, Clone, Debug)]
#[command(group(ArgGroup::new("destination").required(true).args(["target", "place"])))]
pub struct RadarArgs {
    /// Session script to replay
    #[arg(long)]
    pub session: PathBuf,

    /// Target as `lat,lon`
    #[arg(long, allow_hyphen_values = true)]
    pub target: Option<Coordinate>,

    /// Target the first catalog match for this query
    #[arg(long)]
    pub place: Option<String>,

    /// Beep WAV file, overriding the settings
    #[arg(long)]
    pub beep: Option<PathBuf>,

    /// Replay speed multiplier
    #[arg(long, default_value_t = 1.0)]
    pub speed: f64,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    Walking,
    #[default]
    Automobile,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", TransportMode::from(*self))
    }
}

impl From<Mode> for TransportMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Walking => TransportMode::Walking,
            Mode::Automobile => TransportMode::Automobile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_radar_args() {
        let cli = Cli::parse_from([
            "accessible-routes",
            "-vv",
            "radar",
            "--session",
            "walk.json",
            "--target",
            "55.7558,37.6173",
            "--speed",
            "4",
        ]);
        let Command::Radar(args) = cli.command else {
            panic!("expected radar command");
        };
        assert_eq!(args.target, Some(Coordinate::new(55.7558, 37.6173).unwrap()));
        assert_eq!(args.speed, 4.0);
        assert!(args.place.is_none());
    }

    #[test]
    fn test_radar_needs_destination() {
        let result = Cli::try_parse_from(["accessible-routes", "radar", "--session", "walk.json"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_invalid_coordinate() {
        let result = Cli::try_parse_from(["accessible-routes", "nearby", "--near", "91,0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_route_mode() {
        let cli = Cli::parse_from([
            "accessible-routes",
            "route",
            "--from",
            "1,1",
            "--to",
            "1.01,1",
            "--mode",
            "walking",
        ]);
        let Command::Route { mode, .. } = cli.command else {
            panic!("expected route command");
        };
        assert_eq!(TransportMode::from(mode), TransportMode::Walking);
    }
}
