//! Turn-by-turn navigation state machine.
//!
//! [`NavigationEngine`] consumes a [`Route`] and a stream of device
//! locations and publishes a [`NavigationState`] plus discrete
//! [`NavigationEvent`]s. All computation is synchronous; the engine
//! expects a single writer (see [`session::SharedEngine`] for hosts that
//! call in from several threads).
//!
//! Lifecycle:
//!
//! ```text
//! Idle --start--> Navigating --deviation--> OffRoute --request_recalculation--> Recalculating
//!   |                 |  ^                                                            |
//!   |                 |  +----------------------- update_route ----------------------+
//!   |                 +--arrival--> Finished
//!   +--failed start--> Blocked
//! any --stop--> Idle
//! ```

pub mod clock;
pub mod config;
pub mod events;
pub mod gate;
pub mod session;
pub mod state;

use log::{debug, info, warn};
use std::time::Instant;
use tokio::sync::watch;

use crate::geo::{bearing_deg, distance_point_to_polyline_m, haversine_distance_m, Coordinate};
use crate::route::Route;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::NavConfig;
pub use events::{EventBus, EventReceiver};
pub use gate::{FnGate, GateFlags, NavigationGate, Preconditions};
pub use session::SharedEngine;
pub use state::{Guidance, NavigationEvent, NavigationState};

pub struct NavigationEngine {
    config: NavConfig,
    gate: Box<dyn NavigationGate>,
    clock: Box<dyn Clock>,
    state_tx: watch::Sender<NavigationState>,
    events: EventBus,

    is_active: bool,
    route: Option<Route>,
    step_index: usize,
    distance_traveled_m: f64,
    last_location: Option<Coordinate>,
    started_at: Option<Instant>,
}

impl NavigationEngine {
    /// Engine with default thresholds, no start restrictions and the
    /// system clock.
    pub fn new() -> Self {
        Self::with_parts(NavConfig::default(), Box::new(Preconditions::OPEN), Box::new(SystemClock))
    }

    pub fn with_parts(config: NavConfig, gate: Box<dyn NavigationGate>, clock: Box<dyn Clock>) -> Self {
        let events = EventBus::new(config.event_buffer_capacity);
        let (state_tx, _) = watch::channel(NavigationState::Idle);

        Self {
            config,
            gate,
            clock,
            state_tx,
            events,
            is_active: false,
            route: None,
            step_index: 0,
            distance_traveled_m: 0.0,
            last_location: None,
            started_at: None,
        }
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    /// Current state snapshot.
    pub fn state(&self) -> NavigationState {
        self.state_tx.borrow().clone()
    }

    /// Observe state changes. The receiver sees the current state
    /// immediately, whenever it subscribes.
    pub fn subscribe_state(&self) -> watch::Receiver<NavigationState> {
        self.state_tx.subscribe()
    }

    /// Observe events emitted from now on.
    pub fn subscribe_events(&self) -> EventReceiver {
        self.events.subscribe()
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    pub fn current_step_index(&self) -> usize {
        self.step_index
    }

    pub fn distance_traveled_m(&self) -> f64 {
        self.distance_traveled_m
    }

    /// Begin guidance along `route`.
    ///
    /// Returns false and publishes [`NavigationState::Blocked`] when a
    /// precondition fails or the route has no steps. A failed start
    /// while a session is running leaves that session untouched. From a
    /// finished or blocked session the engine passes through `Idle` first.
    pub fn start(&mut self, route: Route) -> bool {
        if let Some(reason) = self.precondition_failure(&route) {
            if self.is_active {
                warn!("start rejected during active session: {reason}");
            } else {
                warn!("navigation blocked: {reason}");
                if !matches!(*self.state_tx.borrow(), NavigationState::Idle) {
                    self.clear_session();
                    self.publish(NavigationState::Idle);
                }
                self.publish(NavigationState::Blocked {
                    reason: reason.to_string(),
                });
            }
            return false;
        }

        info!(
            "starting navigation: {} steps, {:.0} m, {} s",
            route.steps.len(),
            route.total_distance_m,
            route.total_duration_s
        );

        self.is_active = true;
        self.step_index = 0;
        self.distance_traveled_m = 0.0;
        self.last_location = None;
        self.started_at = Some(self.clock.now());

        let seeded = seed_guidance(&route, 0.0);
        self.route = Some(route);
        self.publish(NavigationState::Navigating(seeded));
        self.events.emit(NavigationEvent::NavigationStarted);
        true
    }

    fn precondition_failure(&self, route: &Route) -> Option<&'static str> {
        if self.gate.is_safety_blocked() {
            Some(state::SAFETY_BLOCKED_REASON)
        } else if !self.gate.is_navigation_entitled() {
            Some(state::NOT_ENTITLED_REASON)
        } else if route.steps.is_empty() {
            Some(state::INVALID_ROUTE_REASON)
        } else {
            None
        }
    }

    /// Feed a device location. No-op unless a session is active.
    pub fn update(&mut self, location: Coordinate) {
        if !self.is_active {
            return;
        }
        let Some(route) = self.route.as_ref() else {
            return;
        };

        if self.step_index >= route.steps.len() {
            self.finish();
            return;
        }

        if let Some(last) = self.last_location {
            self.distance_traveled_m += haversine_distance_m(&last, &location);
        }
        self.last_location = Some(location);

        // Waiting for a replacement route
        if matches!(*self.state_tx.borrow(), NavigationState::Recalculating { .. }) {
            return;
        }

        let step_count = route.steps.len();
        let current = &route.steps[self.step_index];
        let distance_to_step = haversine_distance_m(&location, &current.location);
        let distance_from_route = distance_point_to_polyline_m(&location, &route.polyline);

        if distance_from_route > self.config.off_route_threshold_m {
            let reason = if distance_from_route > self.config.severe_off_route_threshold_m {
                state::SEVERE_OFF_ROUTE_REASON
            } else {
                state::OFF_ROUTE_REASON
            };
            warn!("off route by {:.0} m", distance_from_route);

            self.publish(NavigationState::OffRoute {
                reason: reason.to_string(),
                deviation_m: distance_from_route,
                last_known_location: location,
            });
            self.events.emit(NavigationEvent::OffRouteDetected {
                deviation_m: distance_from_route,
            });
            return;
        }

        let is_last_step = self.step_index + 1 == step_count;

        if is_last_step && distance_to_step < self.config.arrival_radius_m {
            self.finish();
            return;
        }

        if distance_to_step < self.config.step_completion_radius_m && !is_last_step {
            // The new step is evaluated on the next update
            self.step_index += 1;
            let step = route.steps[self.step_index].clone();
            debug!("advanced to step {}/{}: {}", self.step_index + 1, step_count, step.instruction);
            self.events.emit(NavigationEvent::StepChanged {
                step,
                index: self.step_index,
            });
            return;
        }

        if distance_to_step < self.config.approaching_threshold_m {
            self.events.emit(NavigationEvent::ApproachingStep {
                step: current.clone(),
                distance_m: distance_to_step,
            });
        }

        let distance_remaining_m = distance_to_step
            + route.steps[self.step_index + 1..]
                .iter()
                .map(|s| s.distance_m)
                .sum::<f64>();

        let progress_pct = progress(self.distance_traveled_m, route.total_distance_m);

        let elapsed_s = self.elapsed_s();
        let average_speed = if elapsed_s > 0 {
            self.distance_traveled_m / elapsed_s as f64
        } else {
            self.config.fallback_speed_mps
        };
        let eta_s = if average_speed > 0.0 {
            (distance_remaining_m / average_speed).round() as i64
        } else {
            route.total_duration_s
        };

        let guidance = Guidance {
            current_step: current.clone(),
            next_step: route.steps.get(self.step_index + 1).cloned(),
            current_step_index: self.step_index,
            total_steps: step_count,
            progress_pct,
            distance_to_next_m: distance_to_step,
            distance_remaining_m,
            eta_s: eta_s.max(0),
            current_bearing_deg: Some(bearing_deg(&location, &current.location)),
        };
        self.publish(NavigationState::Navigating(guidance));
    }

    /// End the session and return to Idle.
    ///
    /// From Finished or Blocked this only resets the state to Idle;
    /// from Idle it does nothing.
    pub fn stop(&mut self) {
        if !self.is_active {
            if !matches!(*self.state_tx.borrow(), NavigationState::Idle) {
                self.clear_session();
                self.publish(NavigationState::Idle);
            }
            return;
        }

        info!("navigation stopped after {:.0} m", self.distance_traveled_m);
        self.is_active = false;
        self.clear_session();
        self.publish(NavigationState::Idle);
        self.events.emit(NavigationEvent::NavigationStopped);
    }

    /// Ask for a new route. The current route stays in place until
    /// [`update_route`](Self::update_route) replaces it.
    pub fn request_recalculation(&mut self) {
        if !self.is_active {
            return;
        }
        info!("recalculation requested");
        self.publish(NavigationState::Recalculating {
            reason: state::USER_RECALCULATION_REASON.to_string(),
        });
    }

    /// Replace the route of the running session.
    ///
    /// Travelled distance and elapsed time carry over; the step index
    /// starts again at 0.
    pub fn update_route(&mut self, route: Route) {
        if !self.is_active {
            return;
        }
        if route.steps.is_empty() {
            warn!("ignoring replacement route without steps");
            return;
        }

        info!(
            "route replaced: {} steps, {:.0} m",
            route.steps.len(),
            route.total_distance_m
        );
        self.step_index = 0;

        let seeded = seed_guidance(&route, self.distance_traveled_m);
        self.route = Some(route);
        self.publish(NavigationState::Navigating(seeded));
        self.events.emit(NavigationEvent::RouteRecalculated);
    }

    fn finish(&mut self) {
        let destination_name = self
            .route
            .as_ref()
            .and_then(|r| r.destination_name())
            .map(str::to_string);
        let total_time_s = self.elapsed_s();

        info!(
            "arrived after {:.0} m in {} s",
            self.distance_traveled_m, total_time_s
        );
        self.is_active = false;
        self.publish(NavigationState::Finished {
            total_distance_traveled_m: self.distance_traveled_m,
            total_time_s,
            destination_name: destination_name.clone(),
        });
        self.events.emit(NavigationEvent::Arrived { destination_name });
    }

    fn clear_session(&mut self) {
        self.route = None;
        self.step_index = 0;
        self.last_location = None;
    }

    /// Whole seconds since the session started.
    fn elapsed_s(&self) -> i64 {
        self.started_at
            .map(|start| {
                let secs = self.clock.now().saturating_duration_since(start).as_secs();
                i64::try_from(secs).unwrap_or(i64::MAX)
            })
            .unwrap_or(0)
    }

    fn publish(&self, state: NavigationState) {
        debug!("state -> {}", state.name());
        self.state_tx.send_replace(state);
    }
}

impl Default for NavigationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Fraction travelled, 0 for routes without length.
fn progress(traveled_m: f64, total_m: f64) -> f64 {
    if total_m > 0.0 {
        let pct = traveled_m / total_m;
        if pct.is_finite() { pct.clamp(0.0, 1.0) } else { 0.0 }
    } else {
        0.0
    }
}

/// Guidance published right after a route is (re)installed, before any
/// location is evaluated against it. `route.steps` must not be empty.
fn seed_guidance(route: &Route, traveled_m: f64) -> Guidance {
    Guidance {
        current_step: route.steps[0].clone(),
        next_step: route.steps.get(1).cloned(),
        current_step_index: 0,
        total_steps: route.steps.len(),
        progress_pct: progress(traveled_m, route.total_distance_m),
        distance_to_next_m: route.steps[0].distance_m,
        distance_remaining_m: route.total_distance_m,
        eta_s: route.total_duration_s,
        current_bearing_deg: None,
    }
}
