//! Places and routes returned by the search and directions collaborators.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::geo::{distance_meters, Coordinate};

/// Name given to search results the provider returned without one
pub const UNNAMED_PLACE: &str = "Unnamed";

/// Point of interest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub coordinate: Coordinate,
    /// Category label attached by nearby lookups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Distance from the user when the lookup ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
}

impl Place {
    pub fn new(name: Option<&str>, address: Option<String>, coordinate: Coordinate) -> Self {
        let name = match name.map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => UNNAMED_PLACE.to_string(),
        };
        Place {
            name,
            address,
            coordinate,
            category: None,
            distance_meters: None,
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    /// Fill in the distance from `origin`
    pub fn measured_from(mut self, origin: &Coordinate) -> Self {
        self.distance_meters = Some(distance_meters(origin, &self.coordinate));
        self
    }
}

/// Postal address parts as a geocoder returns them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AddressComponents {
    pub street: Option<String>,
    pub house_number: Option<String>,
    pub locality: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
}

impl AddressComponents {
    /// Join the present, non-empty parts with ", ".
    ///
    /// Returns None if nothing is present.
    pub fn compose(&self) -> Option<String> {
        let parts: Vec<&str> = [
            &self.street,
            &self.house_number,
            &self.locality,
            &self.region,
            &self.country,
        ]
        .into_iter()
        .filter_map(|p| p.as_deref())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// Sort places nearest first. Places without a distance go last.
pub fn sort_by_distance(places: &mut [Place]) {
    places.sort_by(|a, b| match (a.distance_meters, b.distance_meters) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Travel mode requested from the directions provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Walking,
    #[default]
    Automobile,
}

impl TransportMode {
    /// Typical speed used for offline duration estimates, in m/s
    pub fn typical_speed_mps(&self) -> f64 {
        match self {
            TransportMode::Walking => 1.4,
            TransportMode::Automobile => 13.9,
        }
    }
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportMode::Walking => write!(f, "walking"),
            TransportMode::Automobile => write!(f, "automobile"),
        }
    }
}

/// Route computed by the directions provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub polyline: Vec<Coordinate>,
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

impl Route {
    /// Length of the polyline itself, which may differ from the provider's
    /// reported distance
    pub fn polyline_length_meters(&self) -> f64 {
        self.polyline
            .windows(2)
            .map(|w| distance_meters(&w[0], &w[1]))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    #[test]
    fn test_unnamed_place() {
        assert_eq!(Place::new(None, None, coord(0.0, 0.0)).name, UNNAMED_PLACE);
        assert_eq!(
            Place::new(Some("  "), None, coord(0.0, 0.0)).name,
            UNNAMED_PLACE
        );
        assert_eq!(Place::new(Some("Cafe"), None, coord(0.0, 0.0)).name, "Cafe");
    }

    #[test]
    fn test_address_compose() {
        let address = AddressComponents {
            street: Some("Tverskaya".into()),
            house_number: Some("7".into()),
            locality: Some("Moscow".into()),
            region: None,
            country: Some("Russia".into()),
        };
        assert_eq!(
            address.compose().as_deref(),
            Some("Tverskaya, 7, Moscow, Russia")
        );
        assert_eq!(AddressComponents::default().compose(), None);
    }

    #[test]
    fn test_sort_by_distance() {
        let origin = coord(0.0, 0.0);
        let mut places = vec![
            Place::new(Some("far"), None, coord(0.1, 0.0)).measured_from(&origin),
            Place::new(Some("unknown"), None, coord(0.0, 0.0)),
            Place::new(Some("near"), None, coord(0.01, 0.0)).measured_from(&origin),
        ];
        sort_by_distance(&mut places);
        let names: Vec<&str> = places.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["near", "far", "unknown"]);
    }

    #[test]
    fn test_polyline_length() {
        let route = Route {
            polyline: vec![coord(0.0, 0.0), coord(0.0, 0.01), coord(0.01, 0.01)],
            distance_meters: 0.0,
            duration_seconds: 0.0,
        };
        let leg = distance_meters(&coord(0.0, 0.0), &coord(0.0, 0.01));
        assert!(route.polyline_length_meters() > leg);
    }
}
