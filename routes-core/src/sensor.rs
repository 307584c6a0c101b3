//! Sensor samples and the fusion of location and heading streams.
//!
//! Platforms report location fixes and compass headings through separate
//! callbacks at unrelated rates. [`SampleFusion`] keeps only the latest value
//! of each and produces a [`SensorSample`] once both are known. Nothing older
//! than the latest value is retained.

use serde::{Deserialize, Serialize};

use crate::geo::{normalize_degrees, Coordinate};

/// One value delivered by a platform sensor callback
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SensorReading {
    /// Position fix
    Location {
        position: Coordinate,
        timestamp_ms: u64,
    },
    /// Heading in degrees from magnetic north
    Heading { degrees: f64, timestamp_ms: u64 },
}

impl SensorReading {
    pub fn timestamp_ms(&self) -> u64 {
        match self {
            SensorReading::Location { timestamp_ms, .. } => *timestamp_ms,
            SensorReading::Heading { timestamp_ms, .. } => *timestamp_ms,
        }
    }
}

/// Position and heading observed together
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorSample {
    pub position: Coordinate,
    /// Degrees from magnetic north, in [0, 360)
    pub heading: f64,
    /// Timestamp of the newest reading in this sample
    pub timestamp_ms: u64,
}

impl SensorSample {
    pub fn new(position: Coordinate, heading: f64, timestamp_ms: u64) -> Self {
        SensorSample {
            position,
            heading: normalize_degrees(heading),
            timestamp_ms,
        }
    }
}

/// Latest-value fusion of the location and heading streams
#[derive(Debug, Clone, Default)]
pub struct SampleFusion {
    position: Option<(Coordinate, u64)>,
    heading: Option<(f64, u64)>,
}

impl SampleFusion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reading and return the fused sample, if both streams have
    /// reported at least once.
    pub fn push(&mut self, reading: SensorReading) -> Option<SensorSample> {
        match reading {
            SensorReading::Location {
                position,
                timestamp_ms,
            } => self.position = Some((position, timestamp_ms)),
            SensorReading::Heading {
                degrees,
                timestamp_ms,
            } => {
                // A NaN heading (uncalibrated compass) is no fix at all
                if !degrees.is_finite() {
                    return None;
                }
                self.heading = Some((normalize_degrees(degrees), timestamp_ms))
            }
        }
        self.sample()
    }

    /// Fused sample from the latest readings, if both are known
    pub fn sample(&self) -> Option<SensorSample> {
        let (position, position_ts) = self.position?;
        let (heading, heading_ts) = self.heading?;
        Some(SensorSample {
            position,
            heading,
            timestamp_ms: position_ts.max(heading_ts),
        })
    }

    pub fn has_position(&self) -> bool {
        self.position.is_some()
    }

    pub fn last_position(&self) -> Option<Coordinate> {
        self.position.map(|(p, _)| p)
    }

    /// Forget both streams
    pub fn clear(&mut self) {
        self.position = None;
        self.heading = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(lat: f64, lon: f64, ts: u64) -> SensorReading {
        SensorReading::Location {
            position: Coordinate::new(lat, lon).unwrap(),
            timestamp_ms: ts,
        }
    }

    fn heading(degrees: f64, ts: u64) -> SensorReading {
        SensorReading::Heading {
            degrees,
            timestamp_ms: ts,
        }
    }

    #[test]
    fn test_no_sample_until_both_streams_report() {
        let mut fusion = SampleFusion::new();
        assert_eq!(fusion.push(heading(90.0, 10)), None);
        assert_eq!(fusion.push(heading(91.0, 20)), None);

        let sample = fusion.push(location(1.0, 2.0, 30)).unwrap();
        assert_eq!(sample.heading, 91.0);
        assert_eq!(sample.timestamp_ms, 30);
        assert_eq!(sample.position, Coordinate::new(1.0, 2.0).unwrap());
    }

    #[test]
    fn test_latest_value_wins() {
        let mut fusion = SampleFusion::new();
        fusion.push(location(1.0, 2.0, 0));
        fusion.push(heading(10.0, 5));
        let sample = fusion.push(heading(370.0, 9)).unwrap();
        assert_eq!(sample.heading, 10.0);
        assert_eq!(sample.timestamp_ms, 9);

        let sample = fusion.push(location(3.0, 4.0, 12)).unwrap();
        assert_eq!(sample.position.latitude(), 3.0);
    }

    #[test]
    fn test_invalid_heading_is_ignored() {
        let mut fusion = SampleFusion::new();
        fusion.push(location(1.0, 2.0, 0));
        assert_eq!(fusion.push(heading(f64::NAN, 1)), None);
        assert!(fusion.sample().is_none());
    }

    #[test]
    fn test_clear_forgets_everything() {
        let mut fusion = SampleFusion::new();
        fusion.push(location(1.0, 2.0, 0));
        fusion.push(heading(10.0, 5));
        fusion.clear();
        assert!(!fusion.has_position());
        assert_eq!(fusion.push(heading(20.0, 6)), None);
    }

    #[test]
    fn test_reading_json_shape() {
        let reading: SensorReading = serde_json::from_str(
            r#"{"type":"heading","degrees":45.0,"timestampMs":100}"#,
        )
        .unwrap();
        assert_eq!(reading, heading(45.0, 100));
        assert_eq!(reading.timestamp_ms(), 100);
    }
}
