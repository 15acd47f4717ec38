//! Rate limiting for high-frequency UI events and URL synchronisation.
//!
//! A [`Throttle`] lets the first value of a burst through immediately, then
//! holds back further values until `min_interval` has elapsed.  Only the most
//! recent held-back value is kept, and [`Throttle::poll`] releases it once the
//! interval is over, so the last value of a burst is never lost.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.  Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// Leading-edge throttle with a trailing "last value wins" release.
#[derive(Debug, Clone)]
pub struct Throttle<T> {
    min_interval: Duration,
    last_fire: Option<Instant>,
    pending: Option<T>,
}

impl<T> Throttle<T> {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_fire: None,
            pending: None,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    fn ready(&self, now: Instant) -> bool {
        match self.last_fire {
            None => true,
            Some(t) => now.saturating_duration_since(t) >= self.min_interval,
        }
    }

    /// Offer a value.  Returns it back if it may be applied right now,
    /// otherwise stores it (replacing any older pending value).
    pub fn offer(&mut self, now: Instant, value: T) -> Option<T> {
        if self.pending.is_none() && self.ready(now) {
            self.last_fire = Some(now);
            Some(value)
        } else {
            self.pending = Some(value);
            None
        }
    }

    /// Release the pending value if the interval has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        if self.pending.is_some() && self.ready(now) {
            self.last_fire = Some(now);
            self.pending.take()
        } else {
            None
        }
    }

    /// Release the pending value regardless of the interval.
    pub fn flush(&mut self, now: Instant) -> Option<T> {
        let value = self.pending.take();
        if value.is_some() {
            self.last_fire = Some(now);
        }
        value
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}
