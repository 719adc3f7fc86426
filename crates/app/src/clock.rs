//! Clock implementations: the system clock and a settable manual clock.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use chrono::{Local, TimeDelta};
use tripwire_domain::time::WallClock;

use crate::ports::Clock;

/// Local wall-clock time from the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> WallClock {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give
/// another to the runtime.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<WallClock>>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: WallClock) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, at: WallClock) {
        self.now.set(at);
    }

    /// Move forward by `by`; saturates instead of overflowing.
    pub fn advance(&self, by: Duration) {
        self.now.set(add(self.now.get(), by));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> WallClock {
        self.now.get()
    }
}

/// `at + by`, saturating at the end of representable time.
pub(crate) fn add(at: WallClock, by: Duration) -> WallClock {
    TimeDelta::from_std(by)
        .ok()
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(WallClock::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn start() -> WallClock {
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn should_share_time_between_clones() {
        let clock = ManualClock::new(start());
        let other = clock.clone();
        clock.advance(Duration::from_secs(90));
        assert_eq!(other.now(), start() + TimeDelta::seconds(90));
    }

    #[test]
    fn should_saturate_instead_of_overflowing() {
        assert_eq!(add(start(), Duration::MAX), WallClock::MAX);
    }

    #[test]
    fn should_read_system_time() {
        let before = Local::now().naive_local();
        assert!(SystemClock.now() >= before);
    }
}
