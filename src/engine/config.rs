//! Tunable engine thresholds.
//!
//! The defaults are empirical values carried over from field use; none
//! of them is derived, so every one is exposed here for tuning.

use serde::{Deserialize, Serialize};

/// Distance and speed thresholds used by [`super::NavigationEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    /// A step is completed when the device comes closer than this to
    /// the step location.
    pub step_completion_radius_m: f64,
    /// An approach notice is emitted inside this distance.
    pub approaching_threshold_m: f64,
    /// Deviation from the polyline that counts as off route.
    pub off_route_threshold_m: f64,
    /// Deviation reported as "significantly" off route.
    pub severe_off_route_threshold_m: f64,
    /// Arrival is declared inside this distance of the final step.
    pub arrival_radius_m: f64,
    /// Speed assumed for ETA while no time has elapsed yet.
    pub fallback_speed_mps: f64,
    /// Per-subscriber event queue size before old events are evicted.
    pub event_buffer_capacity: usize,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            step_completion_radius_m: 30.0,
            approaching_threshold_m: 150.0,
            off_route_threshold_m: 50.0,
            severe_off_route_threshold_m: 150.0,
            arrival_radius_m: 25.0,
            fallback_speed_mps: 10.0,
            event_buffer_capacity: 64,
        }
    }
}

impl NavConfig {
    /// Load from JSON; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
