//! Error types for coordinate validation and configuration

use thiserror::Error;

/// Errors that can occur when constructing or parsing a coordinate
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinateError {
    /// Latitude outside [-90, 90] or not a finite number
    #[error("Invalid latitude: {0} (expected -90..=90)")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180] or not a finite number
    #[error("Invalid longitude: {0} (expected -180..=180)")]
    InvalidLongitude(f64),

    /// Text could not be split into a `lat,lon` pair
    #[error("Cannot parse coordinate '{0}', expected 'lat,lon'")]
    Malformed(String),
}

/// Errors raised when validating guidance constants
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A constant that must be strictly positive is zero, negative or NaN
    #[error("'{name}' must be a positive finite number, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    /// Cadence floor is above the cadence ceiling
    #[error("Cue interval floor {min}s is above ceiling {max}s")]
    IntervalRange { min: f64, max: f64 },

    /// Alignment band wider than a half turn can never be left
    #[error("Alignment threshold {0} must be below 180 degrees")]
    ThresholdTooWide(f64),
}
