//! In-process event bus — topic name → ordered subscriber list.
//!
//! Topics need no declaration. Emitting calls every subscriber of the
//! topic synchronously, in subscription order, with the same arguments.
//! Emitting a topic nobody listens to is a no-op.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use tracing::trace;
use tripwire_domain::error::TripwireError;
use tripwire_domain::id::SubscriptionId;

use crate::ports::EventPublisher;

/// A topic subscriber.
pub type Handler = Rc<dyn Fn(&[Value]) -> Result<(), TripwireError>>;

#[derive(Clone)]
struct Subscription {
    id: SubscriptionId,
    handler: Handler,
}

/// Synchronous publish/subscribe bus. Clones share the same subscriptions.
#[derive(Clone, Default)]
pub struct EventBus {
    topics: Rc<RefCell<HashMap<String, Vec<Subscription>>>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to `topic`.
    pub fn on(
        &self,
        topic: impl Into<String>,
        handler: impl Fn(&[Value]) -> Result<(), TripwireError> + 'static,
    ) -> SubscriptionId {
        let topic = topic.into();
        let id = SubscriptionId::new();
        trace!(%topic, subscription = %id, "subscribing");
        self.topics
            .borrow_mut()
            .entry(topic)
            .or_default()
            .push(Subscription {
                id,
                handler: Rc::new(handler),
            });
        id
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut topics = self.topics.borrow_mut();
        for subscriptions in topics.values_mut() {
            if let Some(pos) = subscriptions.iter().position(|s| s.id == id) {
                subscriptions.remove(pos);
                return true;
            }
        }
        false
    }

    /// Call every subscriber of `topic` in subscription order.
    ///
    /// The subscriber list is snapshotted first, so handlers may subscribe,
    /// unsubscribe or emit while the dispatch is running; changes apply to
    /// the next emit.
    ///
    /// # Errors
    ///
    /// Stops at, and returns, the first handler error.
    pub fn emit(&self, topic: &str, args: &[Value]) -> Result<(), TripwireError> {
        let handlers: Vec<Handler> = match self.topics.borrow().get(topic) {
            Some(subscriptions) => subscriptions.iter().map(|s| Rc::clone(&s.handler)).collect(),
            None => return Ok(()),
        };
        trace!(topic, subscribers = handlers.len(), "emitting");
        for handler in handlers {
            handler(args)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.borrow().get(topic).map_or(0, Vec::len)
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, topic: &str, args: &[Value]) -> Result<(), TripwireError> {
        self.emit(topic, args)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let topics = self.topics.borrow();
        f.debug_map()
            .entries(topics.iter().map(|(topic, subs)| (topic, subs.len())))
            .finish()
    }
}
