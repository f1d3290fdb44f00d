//! Geodesic computations.
//!
//! Platform-agnostic distance, bearing and projection helpers shared by
//! the polyline codec, the route corridor and the navigation engine.
//! All coordinates use WGS84 (lat/lon in degrees).

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// True if both components are finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self { latitude, longitude }
    }
}

/// Result of projecting a position onto a polyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Nearest point on the polyline.
    pub point: Coordinate,
    /// Index of the start point of the nearest segment (0-based).
    pub segment_index: usize,
    /// Distance from the position to the nearest point, in meters.
    pub distance_m: f64,
}

/// Haversine distance between two points in meters.
pub fn haversine_distance_m(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    // Rounding can push h marginally above 1 for antipodal points.
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Initial bearing from `from` to `to` in degrees [0, 360).
pub fn bearing_deg(from: &Coordinate, to: &Coordinate) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let dlon = (to.longitude - from.longitude).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    let bearing = y.atan2(x).to_degrees().rem_euclid(360.0);
    // rem_euclid can return exactly 360.0 for tiny negative inputs
    if bearing >= 360.0 {
        0.0
    } else {
        bearing
    }
}

/// Total length of a polyline in meters.
pub fn polyline_length_m(points: &[Coordinate]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_distance_m(&w[0], &w[1]))
        .sum()
}

/// Distance from `point` to the segment `seg_start`-`seg_end` in meters.
///
/// The point is projected onto the segment in a planar approximation
/// scaled by latitude cosine, and the haversine distance to the
/// projected location is returned.
pub fn distance_point_to_segment_m(
    point: &Coordinate,
    seg_start: &Coordinate,
    seg_end: &Coordinate,
) -> f64 {
    let projected = project_on_segment(point, seg_start, seg_end);
    haversine_distance_m(point, &projected)
}

/// Minimum distance from `point` to any segment of `polyline`, in meters.
///
/// An empty polyline is infinitely far away; a single-point polyline
/// degenerates to the distance to that point.
pub fn distance_point_to_polyline_m(point: &Coordinate, polyline: &[Coordinate]) -> f64 {
    match polyline {
        [] => f64::INFINITY,
        [only] => haversine_distance_m(point, only),
        _ => project_on_polyline(point, polyline)
            .map(|p| p.distance_m)
            .unwrap_or(f64::INFINITY),
    }
}

/// Project a position onto the nearest segment of a polyline.
///
/// Returns None if the polyline has fewer than 2 points. Ties keep the
/// earliest segment.
pub fn project_on_polyline(position: &Coordinate, polyline: &[Coordinate]) -> Option<Projection> {
    if polyline.len() < 2 {
        return None;
    }

    let mut best: Option<Projection> = None;

    for (i, segment) in polyline.windows(2).enumerate() {
        let projected = project_on_segment(position, &segment[0], &segment[1]);
        let dist = haversine_distance_m(position, &projected);

        let is_better = match &best {
            Some(prev) => dist < prev.distance_m,
            None => true,
        };

        if is_better {
            best = Some(Projection {
                point: projected,
                segment_index: i,
                distance_m: dist,
            });
        }
    }

    best
}

/// Project a point onto a line segment defined by two endpoints.
///
/// Uses a planar approximation scaled by latitude cosine, which is
/// accurate enough for short segments (< 10 km).
fn project_on_segment(p: &Coordinate, a: &Coordinate, b: &Coordinate) -> Coordinate {
    let cos_lat = ((a.latitude + b.latitude) / 2.0).to_radians().cos();

    let dx = (b.longitude - a.longitude) * cos_lat;
    let dy = b.latitude - a.latitude;
    let px = (p.longitude - a.longitude) * cos_lat;
    let py = p.latitude - a.latitude;

    let seg_len_sq = dx * dx + dy * dy;

    if seg_len_sq < 1e-20 {
        // Degenerate segment, return endpoint
        return *a;
    }

    // Clamp parameter t to [0, 1] to stay on the segment
    let t = ((px * dx + py * dy) / seg_len_sq).clamp(0.0, 1.0);

    Coordinate {
        latitude: a.latitude + t * (b.latitude - a.latitude),
        longitude: a.longitude + t * (b.longitude - a.longitude),
    }
}
