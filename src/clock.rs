// Clock: time source for debounce deadlines and cache expiry

use std::cell::Cell;
use std::rc::Rc;

use crate::types::Timestamp;
use crate::utils;

/// Source of the current time in milliseconds
pub trait Clock {
    fn now_ms(&self) -> Timestamp;
}

/// Wall clock (`Date.now()` in the browser)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> Timestamp {
        utils::now()
    }
}

/// Manually advanced clock.
///
/// Clones share the same instant, so a test can keep one handle and pass
/// another into the session.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Timestamp>>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        ManualClock { now: Rc::new(Cell::new(start)) }
    }

    pub fn advance(&self, ms: i64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, at: Timestamp) {
        self.now.set(at);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Timestamp {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared() {
        let clock = ManualClock::new(1_000);
        let handle = clock.clone();

        handle.advance(500);
        assert_eq!(clock.now_ms(), 1_500);

        clock.set(10);
        assert_eq!(handle.now_ms(), 10);
    }
}
