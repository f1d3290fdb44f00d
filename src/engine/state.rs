//! Published navigation state and discrete navigation events.

use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;
use crate::maneuver::{format_distance, maneuver_text};
use crate::route::NavStep;

/// Reason published when the off-route deviation exceeds the severe threshold.
pub const SEVERE_OFF_ROUTE_REASON: &str = "Significantly off route";
/// Reason published for an ordinary off-route deviation.
pub const OFF_ROUTE_REASON: &str = "Off route - recalculating";
/// Reason published on an explicit recalculation request.
pub const USER_RECALCULATION_REASON: &str = "User requested recalculation";
/// Reason published when `start` receives a route without steps.
pub const INVALID_ROUTE_REASON: &str = "Invalid route";
/// Reason published when safety mode blocks navigation.
pub const SAFETY_BLOCKED_REASON: &str = "Navigation is blocked while safety mode is active";
/// Reason published when the tier does not include in-app navigation.
pub const NOT_ENTITLED_REASON: &str = "In-app navigation is not included in the current plan";

/// Snapshot of an ongoing guidance session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guidance {
    pub current_step: NavStep,
    pub next_step: Option<NavStep>,
    pub current_step_index: usize,
    pub total_steps: usize,
    /// Fraction of the route travelled, in [0, 1].
    pub progress_pct: f64,
    pub distance_to_next_m: f64,
    pub distance_remaining_m: f64,
    pub eta_s: i64,
    /// Bearing from the device to the current maneuver, in [0, 360).
    pub current_bearing_deg: Option<f64>,
}

/// Engine state as seen by the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NavigationState {
    /// No active route.
    #[default]
    Idle,
    Navigating(Guidance),
    OffRoute {
        reason: String,
        deviation_m: f64,
        last_known_location: Coordinate,
    },
    Recalculating {
        reason: String,
    },
    Finished {
        total_distance_traveled_m: f64,
        total_time_s: i64,
        destination_name: Option<String>,
    },
    /// A start precondition failed. Left only by `start` or `stop`.
    Blocked {
        reason: String,
    },
}

impl NavigationState {
    pub fn name(&self) -> &'static str {
        match self {
            NavigationState::Idle => "idle",
            NavigationState::Navigating(_) => "navigating",
            NavigationState::OffRoute { .. } => "off_route",
            NavigationState::Recalculating { .. } => "recalculating",
            NavigationState::Finished { .. } => "finished",
            NavigationState::Blocked { .. } => "blocked",
        }
    }

    /// True for states that `update` can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NavigationState::Idle | NavigationState::Finished { .. } | NavigationState::Blocked { .. }
        )
    }

    pub fn guidance(&self) -> Option<&Guidance> {
        match self {
            NavigationState::Navigating(guidance) => Some(guidance),
            _ => None,
        }
    }
}

/// Fire-and-forget signals for voice guidance and analytics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NavigationEvent {
    NavigationStarted,
    StepChanged { step: NavStep, index: usize },
    ApproachingStep { step: NavStep, distance_m: f64 },
    OffRouteDetected { deviation_m: f64 },
    RouteRecalculated,
    Arrived { destination_name: Option<String> },
    NavigationStopped,
}

impl NavigationEvent {
    /// Events that subscribers must always receive, even under backpressure.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            NavigationEvent::NavigationStarted | NavigationEvent::Arrived { .. }
        )
    }

    /// The phrase a voice guidance component speaks for this event.
    pub fn announcement(&self) -> Option<String> {
        match self {
            NavigationEvent::NavigationStarted => Some("Starting navigation".to_string()),
            NavigationEvent::StepChanged { step, .. } => Some(step.instruction.clone()),
            NavigationEvent::ApproachingStep { step, distance_m } => {
                let distance = format_distance(*distance_m);
                let action = maneuver_text(step.maneuver);
                Some(match &step.street_name {
                    Some(street) => format!("In {distance}, {action} onto {street}"),
                    None => format!("In {distance}, {action}"),
                })
            }
            NavigationEvent::OffRouteDetected { .. } => Some("Off route, recalculating".to_string()),
            NavigationEvent::RouteRecalculated => Some("Route updated".to_string()),
            NavigationEvent::Arrived { destination_name: Some(name) } => {
                Some(format!("You have arrived at {name}"))
            }
            NavigationEvent::Arrived { destination_name: None } => {
                Some("You have arrived at your destination".to_string())
            }
            NavigationEvent::NavigationStopped => None,
        }
    }
}
