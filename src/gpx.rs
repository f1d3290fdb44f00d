//! GPX 1.1 ingestion.
//!
//! Wraps the `gpx` crate and extracts routes, tracks and waypoints as
//! plain coordinates, and turns a GPX route or track into a navigable
//! [`Route`] for the engine.

use serde::{Deserialize, Serialize};
use std::io::Read;
use thiserror::Error;

use crate::geo::Coordinate;
use crate::maneuver::{build_route, RouteBuildOptions};
use crate::route::{Route, RouteError};

#[derive(Debug, Error)]
pub enum GpxError {
    #[error("GPX parse error: {0}")]
    Parse(String),

    #[error("GPX file contains no route or track with at least 2 points")]
    NoPath,

    #[error(transparent)]
    Route(#[from] RouteError),
}

/// A named sequence of points (a GPX route or a flattened track).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpxPath {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub points: Vec<Coordinate>,
}

/// A single named point of interest.
///
/// The `icon` field is populated from the GPX `<sym>` element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpxWaypoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub location: Coordinate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl crate::corridor::HasCoordinate for GpxWaypoint {
    fn coordinate(&self) -> Coordinate {
        self.location
    }
}

/// All data extracted from a GPX file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpxData {
    pub tracks: Vec<GpxPath>,
    pub routes: Vec<GpxPath>,
    pub waypoints: Vec<GpxWaypoint>,
}

impl GpxData {
    /// The path to navigate: the first route with at least 2 points,
    /// otherwise the first such track.
    pub fn primary_path(&self) -> Option<&GpxPath> {
        self.routes
            .iter()
            .chain(self.tracks.iter())
            .find(|p| p.points.len() >= 2)
    }
}

fn to_coordinate(wp: &gpx::Waypoint) -> Coordinate {
    Coordinate::new(wp.point().y(), wp.point().x())
}

/// Parse a GPX file from any reader and return structured data.
pub fn parse<R: Read>(reader: R) -> Result<GpxData, GpxError> {
    let gpx = gpx::read(reader).map_err(|e| GpxError::Parse(e.to_string()))?;

    let tracks = gpx
        .tracks
        .iter()
        .map(|t| GpxPath {
            name: t.name.clone(),
            // Multi-segment tracks are flattened into a single point list
            points: t
                .segments
                .iter()
                .flat_map(|seg| seg.points.iter())
                .map(to_coordinate)
                .collect(),
        })
        .collect();

    let routes = gpx
        .routes
        .iter()
        .map(|r| GpxPath {
            name: r.name.clone(),
            points: r.points.iter().map(to_coordinate).collect(),
        })
        .collect();

    let waypoints = gpx
        .waypoints
        .iter()
        .map(|wp| GpxWaypoint {
            name: wp.name.clone(),
            location: to_coordinate(wp),
            icon: wp.symbol.clone(),
        })
        .collect();

    Ok(GpxData {
        tracks,
        routes,
        waypoints,
    })
}

/// Parse GPX and build a route from its primary path.
///
/// The path name becomes the destination label unless `options`
/// already carries one.
pub fn route_from_gpx<R: Read>(reader: R, options: &RouteBuildOptions) -> Result<Route, GpxError> {
    let data = parse(reader)?;
    let path = data.primary_path().ok_or(GpxError::NoPath)?;

    let mut options = options.clone();
    if options.destination_name.is_none() {
        options.destination_name = path.name.clone();
    }

    Ok(build_route(path.points.clone(), &options)?)
}
