//! # Accessible Routes Core
//!
//! Platform-independent guidance engine for the accessible navigation radar.
//!
//! This crate contains the pure bearing and guidance logic with **zero I/O
//! dependencies**: no async runtime, no timers, no sensor or audio access. The
//! host runtime (`accessible-routes`) feeds it sensor readings and executes
//! the feedback it asks for.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  accessible-routes-core (no tokio, no I/O)                   │
//! │  ├── geo        (bearing, angle difference, distance)        │
//! │  ├── sensor     (latest-value fusion of location + heading)  │
//! │  ├── guidance   (GuidanceState, alignment latch)             │
//! │  ├── feedback   (cue cadence policy, FeedbackEvent)          │
//! │  ├── radar      (radar mode lifecycle)                       │
//! │  └── places     (Place, Route, TransportMode)                │
//! └──────────────────────────────────────────────────────────────┘
//!                              ▲
//!              ┌───────────────┴───────────────┐
//!              │  accessible-routes            │
//!              │  (cue timer, sensor adapters, │
//!              │   providers, CLI)             │
//!              └───────────────────────────────┘
//! ```
//!
//! ## Example: Steering toward a target
//!
//! ```rust
//! use routes_core::{destination, Coordinate, FeedbackEvent, GuidanceEngine, SensorSample};
//!
//! let here = Coordinate::new(55.7558, 37.6173).unwrap();
//! let target = destination(&here, 0.0, 500.0); // 500 m north
//!
//! let mut engine = GuidanceEngine::default();
//! engine.set_target(Some(target));
//!
//! // Facing east: target is a quarter turn to the left
//! engine.on_sample(&SensorSample::new(here, 90.0, 0));
//! let state = engine.current_state();
//! assert!((state.relative_bearing_deg + 90.0).abs() < 1e-6);
//! assert!((state.progress - 0.5).abs() < 1e-6);
//!
//! // Turning to face it enters the alignment band: one haptic pulse
//! let pulse = engine.on_sample(&SensorSample::new(here, 0.0, 100));
//! assert_eq!(pulse, Some(FeedbackEvent::HapticPulse));
//! assert_eq!(engine.on_sample(&SensorSample::new(here, 1.0, 200)), None);
//! ```

pub mod config;
pub mod error;
pub mod feedback;
pub mod format;
pub mod geo;
pub mod guidance;
pub mod notice;
pub mod places;
pub mod radar;
pub mod sensor;

// Re-export commonly used types
pub use config::GuidanceConfig;
pub use error::{ConfigError, CoordinateError};
pub use feedback::{cue_interval, plan_cue, CueCommand, FeedbackEvent};
pub use geo::{angle_difference, bearing, destination, distance_meters, Coordinate};
pub use guidance::{AlignmentLatch, GuidanceEngine, GuidanceState};
pub use notice::Notice;
pub use places::{AddressComponents, Place, Route, TransportMode};
pub use radar::{RadarLifecycle, RadarStatus};
pub use sensor::{SampleFusion, SensorReading, SensorSample};
