//! Event bus port — publish notifications to interested subscribers.

use std::rc::Rc;

use serde_json::Value;
use tripwire_domain::error::TripwireError;

/// Publishes notifications on a named topic.
///
/// Delivery is synchronous: when `publish` returns, every subscriber has
/// run. A subscriber failure is returned to the publisher.
pub trait EventPublisher {
    /// Publish `args` on `topic` to all current subscribers.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a subscriber.
    fn publish(&self, topic: &str, args: &[Value]) -> Result<(), TripwireError>;
}

impl<T: EventPublisher + ?Sized> EventPublisher for Rc<T> {
    fn publish(&self, topic: &str, args: &[Value]) -> Result<(), TripwireError> {
        (**self).publish(topic, args)
    }
}
