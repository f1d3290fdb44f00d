//! Event fan-out to independent subscribers.
//!
//! Each subscriber owns a bounded queue. Emitting never waits on a
//! subscriber: when a queue is full, its oldest non-critical event is
//! evicted. Critical events (see [`NavigationEvent::is_critical`]) are
//! never evicted, so a queue holding only critical events may grow past
//! its capacity.

use log::debug;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::Notify;

use super::state::NavigationEvent;

struct Queue {
    events: Mutex<VecDeque<NavigationEvent>>,
    notify: Notify,
    closed: AtomicBool,
    dropped: AtomicU64,
}

impl Queue {
    fn lock(&self) -> MutexGuard<'_, VecDeque<NavigationEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Publishing side, owned by the engine.
pub struct EventBus {
    capacity: usize,
    subscribers: Mutex<Vec<Weak<Queue>>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Register a new subscriber. It receives events emitted from now on.
    pub fn subscribe(&self) -> EventReceiver {
        let queue = Arc::new(Queue {
            events: Mutex::new(VecDeque::with_capacity(self.capacity)),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
        });
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::downgrade(&queue));
        EventReceiver { queue }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|q| q.strong_count() > 0)
            .count()
    }

    /// Deliver `event` to every live subscriber.
    pub fn emit(&self, event: NavigationEvent) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|q| q.strong_count() > 0);

        for queue in subscribers.iter().filter_map(Weak::upgrade) {
            {
                let mut events = queue.lock();
                events.push_back(event.clone());

                if events.len() > self.capacity {
                    if let Some(pos) = events.iter().position(|e| !e.is_critical()) {
                        if let Some(evicted) = events.remove(pos) {
                            queue.dropped.fetch_add(1, Ordering::Relaxed);
                            debug!("event queue full, evicted {:?}", evicted);
                        }
                    }
                }
            }
            queue.notify.notify_one();
        }
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        let subscribers = self.subscribers.get_mut().unwrap_or_else(PoisonError::into_inner);
        for queue in subscribers.iter().filter_map(Weak::upgrade) {
            queue.closed.store(true, Ordering::SeqCst);
            queue.notify.notify_one();
        }
    }
}

/// Receiving side of one subscription.
pub struct EventReceiver {
    queue: Arc<Queue>,
}

impl EventReceiver {
    /// Take the oldest pending event, if any.
    pub fn try_recv(&self) -> Option<NavigationEvent> {
        self.queue.lock().pop_front()
    }

    /// Take all pending events in emission order.
    pub fn drain(&self) -> Vec<NavigationEvent> {
        self.queue.lock().drain(..).collect()
    }

    /// Wait for the next event. Returns None once the bus is gone and
    /// the queue is empty.
    pub async fn recv(&self) -> Option<NavigationEvent> {
        loop {
            if let Some(event) = self.try_recv() {
                return Some(event);
            }
            if self.queue.closed.load(Ordering::SeqCst) {
                return self.try_recv();
            }
            self.queue.notify.notified().await;
        }
    }

    /// Number of events evicted from this subscription under backpressure.
    pub fn dropped(&self) -> u64 {
        self.queue.dropped.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.queue.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn off_route(deviation_m: f64) -> NavigationEvent {
        NavigationEvent::OffRouteDetected { deviation_m }
    }

    #[test]
    fn every_subscriber_gets_every_event() {
        let bus = EventBus::new(8);
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.emit(NavigationEvent::NavigationStarted);
        bus.emit(NavigationEvent::RouteRecalculated);

        let expected = vec![NavigationEvent::NavigationStarted, NavigationEvent::RouteRecalculated];
        assert_eq!(a.drain(), expected);
        assert_eq!(b.drain(), expected);
        assert_eq!(a.try_recv(), None);
    }

    #[test]
    fn late_subscriber_sees_only_new_events() {
        let bus = EventBus::new(8);
        bus.emit(NavigationEvent::NavigationStarted);

        let late = bus.subscribe();
        bus.emit(NavigationEvent::NavigationStopped);
        assert_eq!(late.drain(), vec![NavigationEvent::NavigationStopped]);
    }

    #[test]
    fn overflow_evicts_oldest_non_critical() {
        let bus = EventBus::new(3);
        let rx = bus.subscribe();

        bus.emit(NavigationEvent::NavigationStarted);
        bus.emit(off_route(60.0));
        bus.emit(off_route(70.0));
        bus.emit(off_route(80.0));

        assert_eq!(rx.dropped(), 1);
        assert_eq!(
            rx.drain(),
            vec![NavigationEvent::NavigationStarted, off_route(70.0), off_route(80.0)]
        );
    }

    #[test]
    fn critical_events_are_never_evicted() {
        let bus = EventBus::new(1);
        let rx = bus.subscribe();

        bus.emit(NavigationEvent::NavigationStarted);
        bus.emit(NavigationEvent::Arrived { destination_name: None });

        assert_eq!(rx.dropped(), 0);
        assert_eq!(
            rx.drain(),
            vec![
                NavigationEvent::NavigationStarted,
                NavigationEvent::Arrived { destination_name: None },
            ]
        );
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let bus = EventBus::new(4);
        let keep = bus.subscribe();
        drop(bus.subscribe());

        bus.emit(NavigationEvent::RouteRecalculated);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(keep.drain().len(), 1);
    }

    #[tokio::test]
    async fn recv_waits_for_events() {
        let bus = EventBus::new(4);
        let rx = bus.subscribe();

        bus.emit(NavigationEvent::NavigationStarted);
        assert_eq!(rx.recv().await, Some(NavigationEvent::NavigationStarted));
    }

    #[tokio::test]
    async fn recv_ends_after_bus_drop() {
        let bus = EventBus::new(4);
        let rx = bus.subscribe();

        bus.emit(NavigationEvent::NavigationStopped);
        drop(bus);

        assert!(rx.is_closed());
        assert_eq!(rx.recv().await, Some(NavigationEvent::NavigationStopped));
        assert_eq!(rx.recv().await, None);
    }
}
