//! Turn-by-turn navigation core for the mobile app.
//!
//! Platform-agnostic geometry ([`geo`], [`polyline`], [`corridor`]), the
//! route model and ingestion ([`route`], [`maneuver`], [`gpx`]) and the
//! navigation state machine ([`engine`]). The Android app reaches all of
//! it through [`android_jni`], which delegates to the JSON [`bridge`].

pub mod android_jni;
pub mod bridge;
pub mod corridor;
pub mod engine;
pub mod geo;
pub mod gpx;
pub mod maneuver;
pub mod polyline;
pub mod route;

pub use engine::{NavConfig, NavigationEngine, NavigationEvent, NavigationState};
pub use geo::Coordinate;
pub use route::{ManeuverKind, NavStep, Route};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
