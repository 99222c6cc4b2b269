//! Injected time source and the one-shot deferred timer built on it.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Monotonic time since an arbitrary epoch.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall clock, counting from construction.
#[derive(Clone, Debug)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, to: Duration) {
        self.now.set(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// One-shot timer polled from the frame loop.
///
/// Arming an already pending timer pushes its deadline back, which is what
/// gives the drag debounce its "since the last move" behaviour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Deferred {
    #[default]
    Idle,
    Pending {
        deadline: Duration,
    },
    Fired,
}

impl Deferred {
    pub fn arm(&mut self, now: Duration, delay: Duration) {
        *self = Deferred::Pending {
            deadline: now + delay,
        };
    }

    pub fn cancel(&mut self) {
        *self = Deferred::Idle;
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Deferred::Pending { .. })
    }

    /// Move to `Fired` once the deadline has passed. Returns true exactly
    /// once per arming.
    pub fn poll(&mut self, now: Duration) -> bool {
        match *self {
            Deferred::Pending { deadline } if now >= deadline => {
                *self = Deferred::Fired;
                true
            }
            _ => false,
        }
    }
}
