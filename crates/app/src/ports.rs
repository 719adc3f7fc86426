//! Port definitions — traits that infrastructure implements.
//!
//! Ports are the boundaries between the runtime core and the outside world.
//! Production code uses the system clock and the in-process bus; tests swap
//! in a manual clock and spy publishers.

pub mod clock;
pub mod event_bus;

pub use clock::Clock;
pub use event_bus::EventPublisher;
