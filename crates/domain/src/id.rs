//! Typed handles for subscriptions, jobs and timers.
//!
//! Handles never leave the process, so each kind draws from its own
//! monotonic counter.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident, $prefix:literal) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u64);

        impl Default for $name {
            fn default() -> Self {
                static NEXT: AtomicU64 = AtomicU64::new(1);
                Self(NEXT.fetch_add(1, Ordering::Relaxed))
            }
        }

        impl $name {
            /// Allocate the next identifier.
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }

            #[must_use]
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Handle returned when subscribing to an event-bus topic.
    SubscriptionId,
    "subscription"
);

define_id!(
    /// Handle for a periodic scheduler job.
    JobId,
    "job"
);

define_id!(
    /// Handle for a one-shot timer, used to cancel it before it fires.
    TimerId,
    "timer"
);
