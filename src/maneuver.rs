//! Maneuver generation for bare polylines.
//!
//! Routes that arrive without turn-by-turn steps (GPX routes, recorded
//! tracks) get their steps derived here: the polyline is simplified into
//! maneuver waypoints and each waypoint is classified by the change of
//! bearing between the incoming and outgoing legs.

use crate::geo::{bearing_deg, haversine_distance_m, polyline_length_m, Coordinate};
use crate::polyline::simplify;
use crate::route::{ManeuverKind, NavStep, Route, RouteError};

/// Parameters for [`build_route`].
#[derive(Debug, Clone)]
pub struct RouteBuildOptions {
    /// RDP tolerance used to pick maneuver waypoints, in meters.
    pub simplify_tolerance_m: f64,
    /// Speed used to estimate the route duration, in m/s.
    pub nominal_speed_mps: f64,
    pub is_truck_route: bool,
    /// Label for the arrival step.
    pub destination_name: Option<String>,
}

impl Default for RouteBuildOptions {
    fn default() -> Self {
        Self {
            simplify_tolerance_m: 50.0,
            nominal_speed_mps: 13.9,
            is_truck_route: false,
            destination_name: None,
        }
    }
}

/// Build a navigable route from a polyline.
///
/// The full polyline is kept for off-route checks; only the simplified
/// waypoints become steps.
pub fn build_route(polyline: Vec<Coordinate>, options: &RouteBuildOptions) -> Result<Route, RouteError> {
    if polyline.len() < 2 {
        return Err(RouteError::TooFewPolylinePoints(polyline.len()));
    }

    let waypoints = simplify(&polyline, options.simplify_tolerance_m);
    let steps = generate_steps(&waypoints, options.destination_name.as_deref());

    let total_distance_m = polyline_length_m(&polyline);
    let total_duration_s = if options.nominal_speed_mps > 0.0 {
        (total_distance_m / options.nominal_speed_mps).round() as i64
    } else {
        0
    };

    Ok(Route::new(steps, polyline, total_distance_m, total_duration_s)?
        .with_truck_route(options.is_truck_route))
}

/// Generate one step per waypoint.
///
/// The first step departs, the last arrives, and every step in between
/// carries the turn made at its waypoint. Step distances are measured
/// from the previous waypoint. Returns no steps for fewer than 2 points.
pub fn generate_steps(points: &[Coordinate], destination: Option<&str>) -> Vec<NavStep> {
    if points.len() < 2 {
        return Vec::new();
    }

    let mut steps = Vec::with_capacity(points.len());

    steps.push(NavStep {
        instruction: format!("Head {}", compass_direction(bearing_deg(&points[0], &points[1]))),
        maneuver: ManeuverKind::Depart,
        distance_m: 0.0,
        street_name: None,
        location: points[0],
    });

    for i in 1..points.len() - 1 {
        let dist = haversine_distance_m(&points[i - 1], &points[i]);
        let maneuver = compute_turn(&points[i - 1], &points[i], &points[i + 1]);

        steps.push(NavStep {
            instruction: format!("In {}, {}", format_distance(dist), maneuver_text(maneuver)),
            maneuver,
            distance_m: dist,
            street_name: None,
            location: points[i],
        });
    }

    let last = points.len() - 1;
    let dist = haversine_distance_m(&points[last - 1], &points[last]);
    let instruction = match destination {
        Some(name) => format!("In {}, arrive at {name}", format_distance(dist)),
        None => format!("In {}, arrive at destination", format_distance(dist)),
    };
    steps.push(NavStep {
        instruction,
        maneuver: ManeuverKind::Arrive,
        distance_m: dist,
        street_name: destination.map(str::to_string),
        location: points[last],
    });

    steps
}

/// Compute the maneuver at point B given the approach from A
/// and the exit toward C.
fn compute_turn(a: &Coordinate, b: &Coordinate, c: &Coordinate) -> ManeuverKind {
    let bearing_ab = bearing_deg(a, b);
    let bearing_bc = bearing_deg(b, c);

    // Relative angle: positive = right turn, negative = left turn
    let mut angle = bearing_bc - bearing_ab;

    // Normalize to [-180, 180]
    while angle > 180.0 {
        angle -= 360.0;
    }
    while angle < -180.0 {
        angle += 360.0;
    }

    classify_turn(angle)
}

/// Classify a relative bearing angle into a maneuver.
fn classify_turn(angle: f64) -> ManeuverKind {
    let abs_angle = angle.abs();

    if abs_angle > 170.0 {
        ManeuverKind::UTurn
    } else if abs_angle > 120.0 {
        if angle > 0.0 { ManeuverKind::SharpRight } else { ManeuverKind::SharpLeft }
    } else if abs_angle > 60.0 {
        if angle > 0.0 { ManeuverKind::Right } else { ManeuverKind::Left }
    } else if abs_angle > 20.0 {
        if angle > 0.0 { ManeuverKind::SlightRight } else { ManeuverKind::SlightLeft }
    } else {
        ManeuverKind::Straight
    }
}

/// Spoken/displayed phrase for a maneuver.
pub fn maneuver_text(maneuver: ManeuverKind) -> &'static str {
    match maneuver {
        ManeuverKind::Depart => "start navigation",
        ManeuverKind::Straight => "continue straight",
        ManeuverKind::SlightLeft => "keep slightly left",
        ManeuverKind::Left => "turn left",
        ManeuverKind::SharpLeft => "turn sharp left",
        ManeuverKind::SlightRight => "keep slightly right",
        ManeuverKind::Right => "turn right",
        ManeuverKind::SharpRight => "turn sharp right",
        ManeuverKind::UTurn => "make a U-turn",
        ManeuverKind::Merge => "merge",
        ManeuverKind::Exit => "take the exit",
        ManeuverKind::Roundabout => "enter the roundabout",
        ManeuverKind::Ferry => "take the ferry",
        ManeuverKind::Arrive => "arrive at destination",
    }
}

fn compass_direction(bearing: f64) -> &'static str {
    const NAMES: [&str; 8] = [
        "north", "northeast", "east", "southeast",
        "south", "southwest", "west", "northwest",
    ];
    let sector = ((bearing + 22.5) / 45.0).floor() as usize % NAMES.len();
    NAMES[sector]
}

/// Format a distance for instructions: 10 m steps below 1 km,
/// one decimal in km above.
pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.1} km", meters / 1000.0)
    } else {
        format!("{} m", (meters / 10.0).round() as i64 * 10)
    }
}
