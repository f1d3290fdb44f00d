//! Preconditions checked when navigation starts.
//!
//! Safety mode and subscription tier are owned by the host app; the
//! engine only asks two questions, once per `start`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub trait NavigationGate: Send + Sync {
    /// True while navigation must not start (e.g. driving safety mode).
    fn is_safety_blocked(&self) -> bool;

    /// True if the current tier includes in-app navigation.
    fn is_navigation_entitled(&self) -> bool;
}

impl<T: NavigationGate + ?Sized> NavigationGate for Arc<T> {
    fn is_safety_blocked(&self) -> bool {
        (**self).is_safety_blocked()
    }

    fn is_navigation_entitled(&self) -> bool {
        (**self).is_navigation_entitled()
    }
}

/// Fixed answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preconditions {
    pub safety_blocked: bool,
    pub entitled: bool,
}

impl Preconditions {
    /// Nothing blocks navigation.
    pub const OPEN: Self = Self {
        safety_blocked: false,
        entitled: true,
    };
}

impl Default for Preconditions {
    fn default() -> Self {
        Self::OPEN
    }
}

impl NavigationGate for Preconditions {
    fn is_safety_blocked(&self) -> bool {
        self.safety_blocked
    }

    fn is_navigation_entitled(&self) -> bool {
        self.entitled
    }
}

/// Flags the host flips as safety mode or tier change.
#[derive(Debug)]
pub struct GateFlags {
    safety_blocked: AtomicBool,
    entitled: AtomicBool,
}

impl GateFlags {
    pub fn new(safety_blocked: bool, entitled: bool) -> Self {
        Self {
            safety_blocked: AtomicBool::new(safety_blocked),
            entitled: AtomicBool::new(entitled),
        }
    }

    pub fn set_safety_blocked(&self, blocked: bool) {
        self.safety_blocked.store(blocked, Ordering::SeqCst);
    }

    pub fn set_entitled(&self, entitled: bool) {
        self.entitled.store(entitled, Ordering::SeqCst);
    }
}

impl Default for GateFlags {
    fn default() -> Self {
        Self::new(false, true)
    }
}

impl NavigationGate for GateFlags {
    fn is_safety_blocked(&self) -> bool {
        self.safety_blocked.load(Ordering::SeqCst)
    }

    fn is_navigation_entitled(&self) -> bool {
        self.entitled.load(Ordering::SeqCst)
    }
}

/// Adapter for a pair of closures.
pub struct FnGate<B, E> {
    safety_blocked: B,
    entitled: E,
}

impl<B, E> FnGate<B, E>
where
    B: Fn() -> bool + Send + Sync,
    E: Fn() -> bool + Send + Sync,
{
    pub fn new(safety_blocked: B, entitled: E) -> Self {
        Self {
            safety_blocked,
            entitled,
        }
    }
}

impl<B, E> NavigationGate for FnGate<B, E>
where
    B: Fn() -> bool + Send + Sync,
    E: Fn() -> bool + Send + Sync,
{
    fn is_safety_blocked(&self) -> bool {
        (self.safety_blocked)()
    }

    fn is_navigation_entitled(&self) -> bool {
        (self.entitled)()
    }
}
