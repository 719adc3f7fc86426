//! Clock port — the only way the runtime reads the time.

use std::rc::Rc;

use tripwire_domain::time::WallClock;

/// Source of local wall-clock time.
pub trait Clock {
    fn now(&self) -> WallClock;
}

impl<T: Clock + ?Sized> Clock for Rc<T> {
    fn now(&self) -> WallClock {
        (**self).now()
    }
}
