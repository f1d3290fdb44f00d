//! Thread-safe handle around a [`NavigationEngine`].
//!
//! Location callbacks and UI calls may arrive on different threads;
//! every call goes through one mutex so the engine keeps a single writer.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

use super::{EventReceiver, NavigationEngine, NavigationState};
use crate::geo::Coordinate;
use crate::route::Route;

#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<NavigationEngine>>,
}

impl SharedEngine {
    pub fn new(engine: NavigationEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, NavigationEngine> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn start(&self, route: Route) -> bool {
        self.lock().start(route)
    }

    pub fn update(&self, location: Coordinate) {
        self.lock().update(location);
    }

    pub fn stop(&self) {
        self.lock().stop();
    }

    pub fn request_recalculation(&self) {
        self.lock().request_recalculation();
    }

    pub fn update_route(&self, route: Route) {
        self.lock().update_route(route);
    }

    pub fn state(&self) -> NavigationState {
        self.lock().state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<NavigationState> {
        self.lock().subscribe_state()
    }

    pub fn subscribe_events(&self) -> EventReceiver {
        self.lock().subscribe_events()
    }

    /// Run `f` with exclusive access to the engine.
    pub fn with<R>(&self, f: impl FnOnce(&mut NavigationEngine) -> R) -> R {
        f(&mut self.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NavigationEvent;
    use crate::route::{ManeuverKind, NavStep};
    use std::thread;

    fn route() -> Route {
        let step = |maneuver, lon: f64| NavStep {
            instruction: String::new(),
            maneuver,
            distance_m: 0.0,
            street_name: None,
            location: Coordinate::new(0.0, lon),
        };
        Route::new(
            vec![step(ManeuverKind::Depart, 0.0), step(ManeuverKind::Arrive, 0.01)],
            vec![Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.01)],
            1112.0,
            100,
        )
        .unwrap()
    }

    #[test]
    fn updates_from_another_thread() {
        let shared = SharedEngine::new(NavigationEngine::new());
        let events = shared.subscribe_events();
        assert!(shared.start(route()));

        let worker = shared.clone();
        thread::spawn(move || {
            for i in 0..=100u32 {
                worker.update(Coordinate::new(0.0, 0.0001 * f64::from(i)));
            }
        })
        .join()
        .unwrap();

        assert_eq!(shared.state().name(), "finished");
        assert!(events
            .drain()
            .iter()
            .any(|e| matches!(e, NavigationEvent::Arrived { .. })));
    }

    #[test]
    fn state_receiver_outlives_calls() {
        let shared = SharedEngine::new(NavigationEngine::new());
        let rx = shared.subscribe_state();

        assert!(shared.start(route()));
        shared.request_recalculation();
        assert_eq!(rx.borrow().name(), "recalculating");

        shared.stop();
        assert_eq!(rx.borrow().name(), "idle");
        assert!(shared.with(|engine| engine.route().is_none()));
    }
}
