//! User-visible notices.
//!
//! The presentation layer announces these; the wording is its business.

use serde::{Deserialize, Serialize};

use crate::places::{Place, Route};
use crate::radar::RadarStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Notice {
    RadarStarted,
    RadarStopped,
    TargetNotSet,
    SearchResults { count: usize },
    NothingFound,
    SearchFailed,
    NearbyUpdated { count: usize },
    RouteBuilt {
        distance_meters: f64,
        duration_seconds: f64,
    },
    RouteFailed,
    PositionUnavailable,
}

impl Notice {
    /// Notice for the outcome of a free-text search
    pub fn for_search<E>(result: &Result<Vec<Place>, E>) -> Notice {
        match result {
            Ok(places) if places.is_empty() => Notice::NothingFound,
            Ok(places) => Notice::SearchResults {
                count: places.len(),
            },
            Err(_) => Notice::SearchFailed,
        }
    }

    pub fn for_route(route: &Route) -> Notice {
        Notice::RouteBuilt {
            distance_meters: route.distance_meters,
            duration_seconds: route.duration_seconds,
        }
    }

    /// Notice after a start request; None if nothing worth announcing
    pub fn for_radar_start(status: RadarStatus) -> Option<Notice> {
        match status {
            RadarStatus::Running => Some(Notice::RadarStarted),
            RadarStatus::TargetNotSet => Some(Notice::TargetNotSet),
            RadarStatus::Inactive | RadarStatus::Stopped => None,
        }
    }
}
