//! Providers that work without a network: a JSON place catalog and
//! straight-line directions.

use async_trait::async_trait;
use log::debug;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

use routes_core::places::sort_by_distance;
use routes_core::{distance_meters, Coordinate, Place, Route, TransportMode};

use super::{DirectionsProvider, SearchProvider, SearchRequest, ServiceError};

/// Below this the endpoints are the same spot and there is nothing to route
const MIN_ROUTE_METERS: f64 = 1.0;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Cannot read catalog '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid catalog '{path}'")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// In-memory list of places searched by name or category
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    places: Vec<Place>,
}

impl Catalog {
    pub fn new(places: Vec<Place>) -> Self {
        Catalog { places }
    }

    /// Load a JSON array of places
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let file = File::open(path).map_err(|source| CatalogError::Io {
            path: path.to_owned(),
            source,
        })?;
        let places: Vec<Place> =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| CatalogError::Parse {
                path: path.to_owned(),
                source,
            })?;
        debug!("Loaded {} places from {}", places.len(), path.display());
        Ok(Catalog { places })
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    /// Case-insensitive substring match on name or category.
    ///
    /// With a `near` point, only places inside the radius are kept and they
    /// come back nearest first with their distance filled in.
    pub fn matching(&self, request: &SearchRequest) -> Vec<Place> {
        let needle = request.query.to_lowercase();
        let mut found: Vec<Place> = self
            .places
            .iter()
            .filter(|place| {
                place.name.to_lowercase().contains(&needle)
                    || place
                        .category
                        .as_ref()
                        .is_some_and(|c| c.to_lowercase().contains(&needle))
            })
            .filter_map(|place| match request.near {
                Some(near) => {
                    let place = place.clone().measured_from(&near);
                    match place.distance_meters {
                        Some(d) if d <= request.radius_meters => Some(place),
                        _ => None,
                    }
                }
                None => Some(place.clone()),
            })
            .collect();

        if request.near.is_some() {
            sort_by_distance(&mut found);
        }
        found.truncate(request.limit);
        found
    }
}

#[async_trait]
impl SearchProvider for Catalog {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Place>, ServiceError> {
        Ok(self.matching(request))
    }
}

/// Directions along the great circle, timed at a typical speed per mode
#[derive(Debug, Clone, Copy, Default)]
pub struct StraightLineDirections;

#[async_trait]
impl DirectionsProvider for StraightLineDirections {
    async fn route(
        &self,
        from: Coordinate,
        to: Coordinate,
        mode: TransportMode,
    ) -> Result<Route, ServiceError> {
        let distance = distance_meters(&from, &to);
        if distance < MIN_ROUTE_METERS {
            return Err(ServiceError::NoRoute);
        }
        Ok(Route {
            polyline: vec![from, to],
            distance_meters: distance,
            duration_seconds: distance / mode.typical_speed_mps(),
        })
    }
}
