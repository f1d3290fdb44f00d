//! Route corridor filtering.
//!
//! Decides which points of interest lie within a tolerance of a route
//! polyline and orders them by approximate progress along the route.

use log::debug;

use crate::geo::{distance_point_to_polyline_m, project_on_polyline, Coordinate};

/// Default corridor half-width in meters.
pub const DEFAULT_CORRIDOR_TOLERANCE_M: f64 = 2000.0;

/// Phrases indicating that a search is meant to be restricted to the
/// active route. Matched case-insensitively as substrings.
const ALONG_ROUTE_PHRASES: &[&str] = &[
    "along my route",
    "along the route",
    "along the way",
    "on my way",
    "on the way",
    "on my route",
    "next ",
    "upcoming",
    "ahead",
    "coming up",
];

/// Anything with a position that can be tested against a corridor.
pub trait HasCoordinate {
    fn coordinate(&self) -> Coordinate;
}

impl HasCoordinate for Coordinate {
    fn coordinate(&self) -> Coordinate {
        *self
    }
}

impl<T: HasCoordinate> HasCoordinate for &T {
    fn coordinate(&self) -> Coordinate {
        (**self).coordinate()
    }
}

/// True if `point` is within `tolerance_m` of the polyline.
///
/// Always false for polylines with fewer than 2 points.
pub fn is_point_along_route(point: &Coordinate, polyline: &[Coordinate], tolerance_m: f64) -> bool {
    if polyline.len() < 2 {
        return false;
    }
    distance_point_to_polyline_m(point, polyline) <= tolerance_m
}

/// Keep the points within `tolerance_m` of the polyline, ordered by the
/// index of their nearest route segment.
///
/// The ordering is stable: points sharing a nearest segment keep their
/// input order.
pub fn filter_along_route<T: HasCoordinate>(
    points: Vec<T>,
    polyline: &[Coordinate],
    tolerance_m: f64,
) -> Vec<T> {
    let total = points.len();

    let mut survivors: Vec<(usize, T)> = points
        .into_iter()
        .filter_map(|p| {
            let projection = project_on_polyline(&p.coordinate(), polyline)?;
            (projection.distance_m <= tolerance_m).then_some((projection.segment_index, p))
        })
        .collect();

    // sort_by_key is stable
    survivors.sort_by_key(|(segment, _)| *segment);

    debug!("corridor filter kept {} of {} points", survivors.len(), total);
    survivors.into_iter().map(|(_, p)| p).collect()
}

/// True if `text` asks for results along the active route.
pub fn contains_along_route_phrasing(text: &str) -> bool {
    let lower = text.to_lowercase();
    ALONG_ROUTE_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon)
    }

    #[derive(Debug, PartialEq)]
    struct Poi {
        name: &'static str,
        at: Coordinate,
    }

    impl HasCoordinate for Poi {
        fn coordinate(&self) -> Coordinate {
            self.at
        }
    }

    fn line() -> Vec<Coordinate> {
        vec![pt(0.0, 0.0), pt(0.0, 1.0), pt(0.0, 2.0)]
    }

    #[test]
    fn point_along_route_needs_two_points() {
        assert!(!is_point_along_route(&pt(0.0, 0.0), &[], 1000.0));
        assert!(!is_point_along_route(&pt(0.0, 0.0), &[pt(0.0, 0.0)], 1000.0));
    }

    #[test]
    fn point_along_route_tolerance() {
        let route = line();
        assert!(is_point_along_route(&pt(0.01, 1.5), &route, DEFAULT_CORRIDOR_TOLERANCE_M));
        assert!(!is_point_along_route(&pt(0.1, 1.5), &route, DEFAULT_CORRIDOR_TOLERANCE_M));
    }

    #[test]
    fn filter_includes_near_and_excludes_far() {
        let kept = filter_along_route(vec![pt(0.5, 1.0), pt(2.0, 1.0)], &line(), 111_000.0);
        assert_eq!(kept, vec![pt(0.5, 1.0)]);
    }

    #[test]
    fn filter_orders_by_segment() {
        let pois = vec![
            Poi { name: "late", at: pt(0.01, 1.8) },
            Poi { name: "early", at: pt(0.01, 0.2) },
            Poi { name: "far", at: pt(1.0, 0.5) },
        ];

        let kept = filter_along_route(pois, &line(), 5000.0);
        let names: Vec<_> = kept.iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["early", "late"]);
    }

    #[test]
    fn filter_is_stable_within_segment() {
        let pois = vec![
            Poi { name: "b", at: pt(0.01, 0.9) },
            Poi { name: "a", at: pt(0.01, 0.1) },
            Poi { name: "c", at: pt(-0.01, 0.5) },
        ];

        let kept = filter_along_route(pois, &line(), 5000.0);
        let names: Vec<_> = kept.iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn filter_with_degenerate_polyline_is_empty() {
        let kept = filter_along_route(vec![pt(0.0, 0.0)], &[pt(0.0, 0.0)], 5000.0);
        assert!(kept.is_empty());
    }

    #[test]
    fn filter_accepts_references() {
        let pois = [pt(0.0, 0.5), pt(3.0, 0.5)];
        let kept = filter_along_route(pois.iter().collect(), &line(), 1000.0);
        assert_eq!(kept.len(), 1);
        assert_eq!(*kept[0], pois[0]);
    }

    #[test]
    fn along_route_phrasing() {
        assert!(contains_along_route_phrasing("Gas stations ALONG MY ROUTE"));
        assert!(contains_along_route_phrasing("coffee on my way"));
        assert!(contains_along_route_phrasing("next rest area"));
        assert!(contains_along_route_phrasing("truck stop coming up"));
        assert!(!contains_along_route_phrasing("pizza near me"));
        assert!(!contains_along_route_phrasing("next"));
    }
}
