//! Route data model.
//!
//! A [`Route`] is produced by an external routing provider (or by
//! [`crate::maneuver::build_route`]) and handed to the navigation engine,
//! which owns it until the route is replaced by a recalculation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::Coordinate;

/// Maneuver categories for a single navigation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManeuverKind {
    Straight,
    Left,
    Right,
    SlightLeft,
    SlightRight,
    SharpLeft,
    SharpRight,
    UTurn,
    Merge,
    Exit,
    Roundabout,
    Ferry,
    Arrive,
    Depart,
}

/// One maneuver of a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavStep {
    /// Human-readable instruction text.
    pub instruction: String,
    pub maneuver: ManeuverKind,
    /// Length of the step in meters, from the previous maneuver point.
    pub distance_m: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_name: Option<String>,
    /// Where the maneuver takes place.
    pub location: Coordinate,
}

/// A complete route: maneuvers, geometry and declared totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub steps: Vec<NavStep>,
    pub polyline: Vec<Coordinate>,
    pub total_distance_m: f64,
    pub total_duration_s: i64,
    #[serde(default)]
    pub is_truck_route: bool,
    #[serde(default)]
    pub is_fallback: bool,
}

/// Reasons a route is rejected at ingestion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    #[error("route has no steps")]
    NoSteps,

    #[error("route polyline needs at least 2 points, got {0}")]
    TooFewPolylinePoints(usize),

    #[error("invalid coordinate ({latitude}, {longitude}) in {context}")]
    InvalidCoordinate {
        context: &'static str,
        latitude: f64,
        longitude: f64,
    },

    #[error("invalid step distance {0} m")]
    InvalidStepDistance(f64),

    #[error("route totals must be finite and non-negative")]
    InvalidTotals,
}

impl Route {
    /// Build a route, checking the routing provider contract.
    pub fn new(
        steps: Vec<NavStep>,
        polyline: Vec<Coordinate>,
        total_distance_m: f64,
        total_duration_s: i64,
    ) -> Result<Self, RouteError> {
        let route = Self {
            steps,
            polyline,
            total_distance_m,
            total_duration_s,
            is_truck_route: false,
            is_fallback: false,
        };
        route.validate()?;
        Ok(route)
    }

    /// Check the invariants the engine relies on.
    pub fn validate(&self) -> Result<(), RouteError> {
        if self.steps.is_empty() {
            return Err(RouteError::NoSteps);
        }
        if self.polyline.len() < 2 {
            return Err(RouteError::TooFewPolylinePoints(self.polyline.len()));
        }
        if let Some(c) = self.polyline.iter().find(|c| !c.is_valid()) {
            return Err(invalid_coordinate("polyline", c));
        }
        for step in &self.steps {
            if !step.location.is_valid() {
                return Err(invalid_coordinate("step location", &step.location));
            }
            if !step.distance_m.is_finite() || step.distance_m < 0.0 {
                return Err(RouteError::InvalidStepDistance(step.distance_m));
            }
        }
        if !self.total_distance_m.is_finite()
            || self.total_distance_m < 0.0
            || self.total_duration_s < 0
        {
            return Err(RouteError::InvalidTotals);
        }
        Ok(())
    }

    /// Street name of the final step, used as the destination label.
    pub fn destination_name(&self) -> Option<&str> {
        self.steps.last().and_then(|s| s.street_name.as_deref())
    }

    pub fn with_truck_route(mut self, is_truck_route: bool) -> Self {
        self.is_truck_route = is_truck_route;
        self
    }

    pub fn with_fallback(mut self, is_fallback: bool) -> Self {
        self.is_fallback = is_fallback;
        self
    }
}

fn invalid_coordinate(context: &'static str, c: &Coordinate) -> RouteError {
    RouteError::InvalidCoordinate {
        context,
        latitude: c.latitude,
        longitude: c.longitude,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon)
    }

    fn step(maneuver: ManeuverKind, location: Coordinate) -> NavStep {
        NavStep {
            instruction: "Head east".into(),
            maneuver,
            distance_m: 100.0,
            street_name: Some("Main Street".into()),
            location,
        }
    }

    #[test]
    fn new_accepts_valid_route() {
        let route = Route::new(
            vec![step(ManeuverKind::Depart, pt(0.0, 0.0)), step(ManeuverKind::Arrive, pt(0.0, 0.01))],
            vec![pt(0.0, 0.0), pt(0.0, 0.01)],
            1113.0,
            120,
        )
        .unwrap();

        assert!(!route.is_truck_route);
        assert_eq!(route.destination_name(), Some("Main Street"));
    }

    #[test]
    fn new_rejects_empty_steps() {
        let err = Route::new(vec![], vec![pt(0.0, 0.0), pt(0.0, 1.0)], 0.0, 0).unwrap_err();
        assert_eq!(err, RouteError::NoSteps);
    }

    #[test]
    fn new_rejects_short_polyline() {
        let err = Route::new(
            vec![step(ManeuverKind::Arrive, pt(0.0, 0.0))],
            vec![pt(0.0, 0.0)],
            0.0,
            0,
        )
        .unwrap_err();
        assert_eq!(err, RouteError::TooFewPolylinePoints(1));
    }

    #[test]
    fn new_rejects_out_of_range_coordinates() {
        let err = Route::new(
            vec![step(ManeuverKind::Arrive, pt(0.0, 0.0))],
            vec![pt(0.0, 0.0), pt(95.0, 0.0)],
            10.0,
            1,
        )
        .unwrap_err();
        assert!(matches!(err, RouteError::InvalidCoordinate { context: "polyline", .. }));
    }

    #[test]
    fn new_rejects_negative_totals() {
        let err = Route::new(
            vec![step(ManeuverKind::Arrive, pt(0.0, 0.0))],
            vec![pt(0.0, 0.0), pt(0.0, 1.0)],
            -1.0,
            0,
        )
        .unwrap_err();
        assert_eq!(err, RouteError::InvalidTotals);
    }

    #[test]
    fn deserializes_with_defaults() {
        let json = r#"{
            "steps": [{
                "instruction": "Arrive",
                "maneuver": "arrive",
                "distance_m": 0.0,
                "location": {"latitude": 1.0, "longitude": 2.0}
            }],
            "polyline": [
                {"latitude": 1.0, "longitude": 1.0},
                {"latitude": 1.0, "longitude": 2.0}
            ],
            "total_distance_m": 111000.0,
            "total_duration_s": 3600
        }"#;

        let route: Route = serde_json::from_str(json).unwrap();
        assert!(route.validate().is_ok());
        assert_eq!(route.steps[0].maneuver, ManeuverKind::Arrive);
        assert_eq!(route.steps[0].street_name, None);
        assert!(!route.is_fallback);
    }

    #[test]
    fn maneuver_serializes_snake_case() {
        let json = serde_json::to_string(&ManeuverKind::SlightLeft).unwrap();
        assert_eq!(json, "\"slight_left\"");
    }
}
