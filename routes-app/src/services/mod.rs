//! Place search, nearby lookup and route building.
//!
//! Providers sit behind async traits so a geocoding service, the offline
//! [`Catalog`] or a test double can back the same front ends.

use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use routes_core::format::{format_distance, format_duration};
use routes_core::places::sort_by_distance;
use routes_core::{Coordinate, Notice, Place, Route, TransportMode};

use crate::settings::SearchSettings;

mod offline;

pub use offline::{Catalog, CatalogError, StraightLineDirections};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("Search failed: {0}")]
    SearchFailed(String),
    #[error("No route found")]
    NoRoute,
    #[error("Current position is unavailable")]
    PositionUnavailable,
    #[error("Network error: {0}")]
    Network(String),
}

impl From<&ServiceError> for Notice {
    fn from(error: &ServiceError) -> Self {
        match error {
            ServiceError::SearchFailed(_) | ServiceError::Network(_) => Notice::SearchFailed,
            ServiceError::NoRoute => Notice::RouteFailed,
            ServiceError::PositionUnavailable => Notice::PositionUnavailable,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    /// Bias results toward this point
    pub near: Option<Coordinate>,
    pub limit: usize,
    /// Size of the region around `near`
    pub radius_meters: f64,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Place>, ServiceError>;
}

#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    async fn route(
        &self,
        from: Coordinate,
        to: Coordinate,
        mode: TransportMode,
    ) -> Result<Route, ServiceError>;
}

/// Free-text search front end
pub struct PlaceSearch {
    provider: Arc<dyn SearchProvider>,
    settings: SearchSettings,
}

impl PlaceSearch {
    pub fn new(provider: Arc<dyn SearchProvider>, settings: SearchSettings) -> Self {
        PlaceSearch { provider, settings }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Search with the configured result limit
    pub async fn search(
        &self,
        query: &str,
        near: Option<Coordinate>,
    ) -> Result<Vec<Place>, ServiceError> {
        self.search_limited(query, near, self.settings.limit).await
    }

    /// Search returning at most `limit` places.
    ///
    /// Surrounding whitespace is ignored; a blank query yields no results and
    /// never reaches the provider.
    pub async fn search_limited(
        &self,
        query: &str,
        near: Option<Coordinate>,
        limit: usize,
    ) -> Result<Vec<Place>, ServiceError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let request = SearchRequest {
            query: query.to_string(),
            near,
            limit,
            radius_meters: self.settings.radius_meters,
        };
        debug!("Searching for '{}' near {:?}", query, near);
        let mut places = self.provider.search(&request).await?;
        places.truncate(limit);
        Ok(places)
    }
}

/// Outcome of one debounced search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchUpdate {
    pub query: String,
    pub result: Result<Vec<Place>, ServiceError>,
}

impl SearchUpdate {
    /// Announcement for this update; blank queries clear results silently
    pub fn notice(&self) -> Option<Notice> {
        if self.query.trim().is_empty() {
            None
        } else {
            Some(Notice::for_search(&self.result))
        }
    }
}

/// Runs a search only once the query has been quiet for a while.
///
/// Consecutive identical edits are dropped before the quiet timer, so
/// re-sending the same text does not delay or repeat a search.
pub struct SearchDebouncer {
    edits: mpsc::UnboundedSender<(String, Option<Coordinate>)>,
    task: JoinHandle<()>,
}

impl SearchDebouncer {
    pub fn spawn(search: Arc<PlaceSearch>) -> (Self, mpsc::UnboundedReceiver<SearchUpdate>) {
        let quiet = Duration::from_millis(search.settings().debounce_ms);
        let (edits, edit_rx) = mpsc::unbounded_channel();
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(debounce(search, quiet, edit_rx, update_tx));
        (SearchDebouncer { edits, task }, update_rx)
    }

    /// Record the latest query text
    pub fn update(&self, query: impl Into<String>, near: Option<Coordinate>) {
        let _ = self.edits.send((query.into(), near));
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn debounce(
    search: Arc<PlaceSearch>,
    quiet: Duration,
    mut edits: mpsc::UnboundedReceiver<(String, Option<Coordinate>)>,
    updates: mpsc::UnboundedSender<SearchUpdate>,
) {
    let mut last_edit: Option<String> = None;
    let mut pending: Option<(String, Option<Coordinate>)> = None;
    let timer = tokio::time::sleep(quiet);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            edit = edits.recv() => {
                let Some((query, near)) = edit else { break };
                if last_edit.as_deref() == Some(query.as_str()) {
                    continue;
                }
                last_edit = Some(query.clone());
                pending = Some((query, near));
                timer.as_mut().reset(Instant::now() + quiet);
            }
            _ = &mut timer, if pending.is_some() => {
                let Some((query, near)) = pending.take() else { continue };
                let result = search.search(&query, near).await;
                if let Err(e) = &result {
                    warn!("Search for '{}' failed: {}", query.trim(), e);
                }
                if updates.send(SearchUpdate { query, result }).is_err() {
                    break;
                }
            }
        }
    }
}

/// One-per-category lookup of places around the user
pub struct NearbyFinder {
    search: Arc<PlaceSearch>,
    categories: Vec<String>,
}

impl NearbyFinder {
    pub fn new(search: Arc<PlaceSearch>) -> Self {
        let categories = search.settings().nearby_categories.clone();
        NearbyFinder { search, categories }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Closest match of each category, nearest first.
    ///
    /// Categories are queried concurrently. A category that fails or finds
    /// nothing is left out.
    pub async fn find(&self, near: Coordinate) -> Vec<Place> {
        let lookups = self.categories.iter().map(|category| async move {
            match self.search.search_limited(category, Some(near), 1).await {
                Ok(places) => places
                    .into_iter()
                    .next()
                    .map(|place| place.with_category(category).measured_from(&near)),
                Err(e) => {
                    warn!("Nearby lookup for '{}' failed: {}", category, e);
                    None
                }
            }
        });

        let mut places: Vec<Place> = join_all(lookups).await.into_iter().flatten().collect();
        sort_by_distance(&mut places);
        info!("Found {} nearby places", places.len());
        places
    }
}

/// Builds a route from the user's position to a chosen place
pub struct RoutePlanner {
    directions: Arc<dyn DirectionsProvider>,
    mode: TransportMode,
}

impl RoutePlanner {
    pub fn new(directions: Arc<dyn DirectionsProvider>, mode: TransportMode) -> Self {
        RoutePlanner { directions, mode }
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    pub async fn build_route(
        &self,
        from: Option<Coordinate>,
        place: &Place,
    ) -> Result<Route, ServiceError> {
        let from = from.ok_or(ServiceError::PositionUnavailable)?;
        let route = self
            .directions
            .route(from, place.coordinate, self.mode)
            .await?;
        info!(
            "Route to {} ({}): {}, {}",
            place.name,
            self.mode,
            format_distance(route.distance_meters),
            format_duration(route.duration_seconds)
        );
        Ok(route)
    }
}
