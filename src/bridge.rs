//! JSON façade for the app layer.
//!
//! Everything that crosses the JNI boundary goes through here as JSON
//! strings, which keeps the `extern "system"` functions trivial and
//! lets the whole surface be exercised on the host.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::corridor::{contains_along_route_phrasing, filter_along_route, HasCoordinate};
use crate::engine::{
    EventReceiver, GateFlags, NavConfig, NavigationEngine, NavigationEvent, SharedEngine,
    SystemClock,
};
use crate::geo::Coordinate;
use crate::gpx::{self, GpxError};
use crate::maneuver::RouteBuildOptions;
use crate::polyline::{self, DecodeError};
use crate::route::{Route, RouteError};

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no usable route data: {0}")]
    Decode(#[from] DecodeError),

    #[error("invalid route: {0}")]
    Route(#[from] RouteError),

    #[error(transparent)]
    Gpx(#[from] GpxError),
}

/// A search result to be tested against the route corridor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoiCandidate {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub location: Coordinate,
}

impl HasCoordinate for PoiCandidate {
    fn coordinate(&self) -> Coordinate {
        self.location
    }
}

/// Decode an encoded polyline into a JSON array of coordinates.
pub fn decode_polyline_json(encoded: &str) -> Result<String, BridgeError> {
    let points = polyline::decode(encoded)?;
    Ok(serde_json::to_string(&points)?)
}

/// Encode a JSON array of coordinates as a polyline string.
pub fn encode_polyline_json(coordinates_json: &str) -> Result<String, BridgeError> {
    let points: Vec<Coordinate> = serde_json::from_str(coordinates_json)?;
    Ok(polyline::encode(&points))
}

/// Simplify an encoded polyline and return it re-encoded.
pub fn simplify_polyline(encoded: &str, tolerance_m: f64) -> Result<String, BridgeError> {
    let points = polyline::decode(encoded)?;
    Ok(polyline::encode(&polyline::simplify(&points, tolerance_m)))
}

/// Filter a JSON array of [`PoiCandidate`]s to those along an encoded
/// route polyline, ordered by progress along the route.
pub fn filter_along_route_json(
    candidates_json: &str,
    encoded_polyline: &str,
    tolerance_m: f64,
) -> Result<String, BridgeError> {
    let route = polyline::decode(encoded_polyline)?;
    let candidates: Vec<PoiCandidate> = serde_json::from_str(candidates_json)?;
    let kept = filter_along_route(candidates, &route, tolerance_m);
    Ok(serde_json::to_string(&kept)?)
}

/// True if a search query asks for results along the route.
pub fn wants_along_route(query: &str) -> bool {
    contains_along_route_phrasing(query)
}

/// Build a route from GPX bytes and return it as JSON.
pub fn route_from_gpx_json(data: &[u8], simplify_tolerance_m: f64) -> Result<String, BridgeError> {
    let options = RouteBuildOptions {
        simplify_tolerance_m,
        ..Default::default()
    };
    let route = gpx::route_from_gpx(data, &options)?;
    Ok(serde_json::to_string(&route)?)
}

fn parse_route(route_json: &str) -> Result<Route, BridgeError> {
    let route: Route = serde_json::from_str(route_json)?;
    route.validate()?;
    Ok(route)
}

/// One navigation session owned by the app.
///
/// Holds the engine, the start preconditions the app keeps current,
/// and an event subscription the app polls.
pub struct NavigationSession {
    engine: SharedEngine,
    gate: Arc<GateFlags>,
    events: EventReceiver,
}

impl NavigationSession {
    pub fn new(config: NavConfig) -> Self {
        let gate = Arc::new(GateFlags::default());
        let engine = NavigationEngine::with_parts(
            config,
            Box::new(Arc::clone(&gate)),
            Box::new(SystemClock),
        );
        let engine = SharedEngine::new(engine);
        let events = engine.subscribe_events();

        Self { engine, gate, events }
    }

    /// Session from a JSON config; an empty string means defaults.
    pub fn from_config_json(config_json: &str) -> Result<Self, BridgeError> {
        let config = if config_json.trim().is_empty() {
            NavConfig::default()
        } else {
            NavConfig::from_json(config_json)?
        };
        Ok(Self::new(config))
    }

    pub fn engine(&self) -> &SharedEngine {
        &self.engine
    }

    /// Start guidance. Returns Ok(false) if the engine refused to start.
    ///
    /// A route without steps is not an error here: the engine refuses it
    /// and publishes `Blocked` with the invalid-route reason.
    pub fn start(
        &self,
        route_json: &str,
        safety_blocked: bool,
        entitled: bool,
    ) -> Result<bool, BridgeError> {
        let route: Route = serde_json::from_str(route_json)?;
        self.gate.set_safety_blocked(safety_blocked);
        self.gate.set_entitled(entitled);
        match route.validate() {
            Ok(()) | Err(RouteError::NoSteps) => {}
            Err(e) => return Err(e.into()),
        }
        Ok(self.engine.start(route))
    }

    /// Feed a location and return the resulting state as JSON.
    pub fn update(&self, latitude: f64, longitude: f64) -> Result<String, BridgeError> {
        self.engine.update(Coordinate::new(latitude, longitude));
        self.state_json()
    }

    pub fn stop(&self) {
        self.engine.stop();
    }

    pub fn request_recalculation(&self) {
        self.engine.request_recalculation();
    }

    pub fn update_route(&self, route_json: &str) -> Result<(), BridgeError> {
        let route = parse_route(route_json)?;
        self.engine.update_route(route);
        Ok(())
    }

    pub fn state_json(&self) -> Result<String, BridgeError> {
        Ok(serde_json::to_string(&self.engine.state())?)
    }

    /// Pending events as a JSON array, oldest first.
    pub fn poll_events(&self) -> Vec<NavigationEvent> {
        self.events.drain()
    }

    pub fn poll_events_json(&self) -> Result<String, BridgeError> {
        Ok(serde_json::to_string(&self.poll_events())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    const ROUTE_JSON: &str = r#"{
        "steps": [
            {"instruction": "Head east", "maneuver": "depart", "distance_m": 0.0,
             "location": {"latitude": 0.0, "longitude": 0.0}},
            {"instruction": "Arrive", "maneuver": "arrive", "distance_m": 1112.0,
             "street_name": "Pier 9",
             "location": {"latitude": 0.0, "longitude": 0.01}}
        ],
        "polyline": [
            {"latitude": 0.0, "longitude": 0.0},
            {"latitude": 0.0, "longitude": 0.01}
        ],
        "total_distance_m": 1112.0,
        "total_duration_s": 100
    }"#;

    #[test]
    fn decode_polyline_to_json() {
        let json = decode_polyline_json("_p~iF~ps|U").unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["latitude"], 38.5);
        assert_eq!(value[0]["longitude"], -120.2);
    }

    #[test]
    fn decode_failure_is_an_error() {
        assert!(matches!(decode_polyline_json("_p~i"), Err(BridgeError::Decode(_))));
    }

    #[test]
    fn encode_polyline_from_json() {
        let encoded = encode_polyline_json(r#"[{"latitude": 38.5, "longitude": -120.2}]"#).unwrap();
        assert_eq!(encoded, "_p~iF~ps|U");
    }

    #[test]
    fn simplify_encoded_polyline() {
        let line = [
            Coordinate::new(48.0, 16.0),
            Coordinate::new(48.0, 16.01),
            Coordinate::new(48.0, 16.02),
        ];
        let simplified = simplify_polyline(&polyline::encode(&line), 10.0).unwrap();
        assert_eq!(polyline::decode(&simplified).unwrap().len(), 2);
    }

    #[test]
    fn filter_candidates_along_encoded_route() {
        let route = polyline::encode(&[
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 1.0),
            Coordinate::new(0.0, 2.0),
        ]);
        let candidates = r#"[
            {"id": "far", "location": {"latitude": 2.0, "longitude": 1.0}},
            {"id": "late", "location": {"latitude": 0.5, "longitude": 1.5}},
            {"id": "early", "name": "Fuel", "location": {"latitude": 0.2, "longitude": 0.5}}
        ]"#;

        let json = filter_along_route_json(candidates, &route, 111_000.0).unwrap();
        let kept: Vec<PoiCandidate> = serde_json::from_str(&json).unwrap();
        let ids: Vec<_> = kept.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);
    }

    #[test]
    fn filter_with_broken_polyline_is_an_error() {
        let err = filter_along_route_json("[]", "_p~iF", 1000.0).unwrap_err();
        assert!(matches!(err, BridgeError::Decode(DecodeError::MissingLongitude { .. })));
    }

    #[test]
    fn along_route_queries() {
        assert!(wants_along_route("Cheap diesel along my route"));
        assert!(!wants_along_route("Cheap diesel nearby"));
    }

    #[test]
    fn session_lifecycle() {
        let session = NavigationSession::from_config_json("").unwrap();
        assert!(session.start(ROUTE_JSON, false, true).unwrap());

        let state: Value = serde_json::from_str(&session.update(0.0, 0.0).unwrap()).unwrap();
        assert_eq!(state["type"], "navigating");

        let state: Value = serde_json::from_str(&session.update(0.0, 0.0099).unwrap()).unwrap();
        assert_eq!(state["type"], "finished");
        assert_eq!(state["destination_name"], "Pier 9");

        let events: Value = serde_json::from_str(&session.poll_events_json().unwrap()).unwrap();
        let types: Vec<_> = events
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["type"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(types.first().map(String::as_str), Some("navigation_started"));
        assert_eq!(types.last().map(String::as_str), Some("arrived"));
    }

    #[test]
    fn session_start_blocked() {
        let session = NavigationSession::new(NavConfig::default());
        assert!(!session.start(ROUTE_JSON, true, true).unwrap());

        let state: Value = serde_json::from_str(&session.state_json().unwrap()).unwrap();
        assert_eq!(state["type"], "blocked");

        session.stop();
        let state: Value = serde_json::from_str(&session.state_json().unwrap()).unwrap();
        assert_eq!(state["type"], "idle");
    }

    #[test]
    fn session_rejects_invalid_route_json() {
        let session = NavigationSession::new(NavConfig::default());
        let bad_location = ROUTE_JSON.replacen(r#""latitude": 0.0"#, r#""latitude": 95.0"#, 1);

        assert!(matches!(session.start("{", false, true), Err(BridgeError::Json(_))));
        assert!(matches!(
            session.start(&bad_location, false, true),
            Err(BridgeError::Route(RouteError::InvalidCoordinate { .. }))
        ));
        assert_eq!(session.engine().state().name(), "idle");
    }

    #[test]
    fn session_start_without_steps_is_blocked() {
        let session = NavigationSession::new(NavConfig::default());
        let no_steps = r#"{"steps": [], "polyline": [], "total_distance_m": 0, "total_duration_s": 0}"#;

        assert!(!session.start(no_steps, false, true).unwrap());
        let state: Value = serde_json::from_str(&session.state_json().unwrap()).unwrap();
        assert_eq!(state["type"], "blocked");
        assert_eq!(state["reason"], "Invalid route");
    }

    #[test]
    fn session_checks_gate_before_route() {
        let session = NavigationSession::new(NavConfig::default());
        let no_steps = r#"{"steps": [], "polyline": [], "total_distance_m": 0, "total_duration_s": 0}"#;

        assert!(!session.start(no_steps, false, false).unwrap());
        let state: Value = serde_json::from_str(&session.state_json().unwrap()).unwrap();
        assert_eq!(state["type"], "blocked");
        assert_ne!(state["reason"], "Invalid route");
    }

    #[test]
    fn session_recalculation() {
        let session = NavigationSession::new(NavConfig::default());
        assert!(session.start(ROUTE_JSON, false, true).unwrap());

        session.request_recalculation();
        let state: Value = serde_json::from_str(&session.state_json().unwrap()).unwrap();
        assert_eq!(state["type"], "recalculating");

        session.update_route(ROUTE_JSON).unwrap();
        let state: Value = serde_json::from_str(&session.state_json().unwrap()).unwrap();
        assert_eq!(state["type"], "navigating");
        assert!(session
            .poll_events()
            .contains(&NavigationEvent::RouteRecalculated));
    }

    #[test]
    fn session_config_json() {
        let session = NavigationSession::from_config_json(r#"{"arrival_radius_m": 5.0}"#).unwrap();
        assert_eq!(session.engine().with(|e| e.config().arrival_radius_m), 5.0);
        assert!(NavigationSession::from_config_json("[1]").is_err());
    }

    #[test]
    fn gpx_to_route_json() {
        let gpx = br#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <rte>
    <name>Ferry Terminal</name>
    <rtept lat="0.0" lon="0.0"></rtept>
    <rtept lat="0.0" lon="0.01"></rtept>
  </rte>
</gpx>"#;

        let json = route_from_gpx_json(gpx, 50.0).unwrap();
        let route: Route = serde_json::from_str(&json).unwrap();
        assert_eq!(route.destination_name(), Some("Ferry Terminal"));
        assert_eq!(route.steps.len(), 2);
    }
}
