//! Variable store — named values with optional time-to-live.
//!
//! Every write publishes `{name, value, previous}` on the `variable` topic.
//! A write with a TTL arms a one-shot timer that resets the value to `null`
//! (and publishes again) when it elapses; a later write to the same name
//! replaces both value and timer.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use serde_json::{Value, json};
use tracing::debug;
use tripwire_domain::error::TripwireError;
use tripwire_domain::id::TimerId;

use crate::ports::EventPublisher;
use crate::scheduler::Scheduler;

pub const VARIABLE_TOPIC: &str = "variable";

struct Slot {
    value: Value,
    expiry: Option<TimerId>,
}

struct StoreInner {
    slots: RefCell<HashMap<String, Slot>>,
    publisher: Rc<dyn EventPublisher>,
    scheduler: Scheduler,
}

#[derive(Clone)]
pub struct VariableStore {
    inner: Rc<StoreInner>,
}

impl VariableStore {
    pub fn new(publisher: Rc<dyn EventPublisher>, scheduler: Scheduler) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                slots: RefCell::default(),
                publisher,
                scheduler,
            }),
        }
    }

    /// Store `value` under `name` and publish the change.
    ///
    /// With a `ttl`, the value resets to `null` once it elapses.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a `variable` subscriber.
    pub fn set(
        &self,
        name: impl Into<String>,
        value: impl Into<Value>,
        ttl: Option<Duration>,
    ) -> Result<(), TripwireError> {
        let name = name.into();
        let value = value.into();
        let expiry = ttl.map(|ttl| self.arm_expiry(name.clone(), ttl));
        let previous = self.replace(&name, value.clone(), expiry);
        debug!(%name, %value, ?ttl, "variable set");
        self.publish(&name, value, previous)
    }

    /// Current value, `null` when unset or expired.
    #[must_use]
    pub fn get(&self, name: &str) -> Value {
        self.inner
            .slots
            .borrow()
            .get(name)
            .map_or(Value::Null, |slot| slot.value.clone())
    }

    /// Names currently holding a non-null value, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .slots
            .borrow()
            .iter()
            .filter(|(_, slot)| !slot.value.is_null())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    #[must_use]
    pub fn has_pending_expiry(&self, name: &str) -> bool {
        self.inner
            .slots
            .borrow()
            .get(name)
            .is_some_and(|slot| slot.expiry.is_some())
    }

    fn arm_expiry(&self, name: String, ttl: Duration) -> TimerId {
        let store = Rc::downgrade(&self.inner);
        self.inner.scheduler.once(ttl, move || expire(&store, &name))
    }

    fn replace(&self, name: &str, value: Value, expiry: Option<TimerId>) -> Value {
        let old = self
            .inner
            .slots
            .borrow_mut()
            .insert(name.to_string(), Slot { value, expiry });
        match old {
            Some(Slot { value, expiry }) => {
                if let Some(timer) = expiry {
                    self.inner.scheduler.cancel(timer);
                }
                value
            }
            None => Value::Null,
        }
    }

    fn publish(&self, name: &str, value: Value, previous: Value) -> Result<(), TripwireError> {
        let payload = json!({ "name": name, "value": value, "previous": previous });
        self.inner.publisher.publish(VARIABLE_TOPIC, &[payload])
    }
}

fn expire(store: &Weak<StoreInner>, name: &str) -> Result<(), TripwireError> {
    let Some(inner) = store.upgrade() else {
        return Ok(());
    };
    let store = VariableStore { inner };
    let previous = {
        let mut slots = store.inner.slots.borrow_mut();
        let Some(slot) = slots.get_mut(name) else {
            return Ok(());
        };
        slot.expiry = None;
        std::mem::take(&mut slot.value)
    };
    debug!(%name, "variable expired");
    store.publish(name, Value::Null, previous)
}

impl fmt::Debug for VariableStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableStore")
            .field("names", &self.names())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::event_bus::EventBus;
    use chrono::NaiveDate;

    fn setup() -> (ManualClock, EventBus, Scheduler, VariableStore) {
        let clock = ManualClock::new(
            NaiveDate::from_ymd_opt(2026, 10, 16)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        );
        let bus = EventBus::new();
        let scheduler = Scheduler::new(Rc::new(clock.clone()), Rc::new(bus.clone()));
        let store = VariableStore::new(Rc::new(bus.clone()), scheduler.clone());
        (clock, bus, scheduler, store)
    }

    fn capture(bus: &EventBus) -> Rc<RefCell<Vec<Value>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.on(VARIABLE_TOPIC, move |args| {
            sink.borrow_mut().push(args[0].clone());
            Ok(())
        });
        seen
    }

    #[test]
    fn should_return_null_for_unknown_variable() {
        let (_, _, _, store) = setup();
        assert_eq!(store.get("missing"), Value::Null);
    }

    #[test]
    fn should_publish_change_with_previous_value() {
        let (_, bus, _, store) = setup();
        let seen = capture(&bus);

        store.set("light", "purple", None).unwrap();
        store.set("light", "red", None).unwrap();

        assert_eq!(store.get("light"), json!("red"));
        assert_eq!(
            *seen.borrow(),
            vec![
                json!({"name": "light", "value": "purple", "previous": null}),
                json!({"name": "light", "value": "red", "previous": "purple"}),
            ]
        );
    }

    #[test]
    fn should_reset_to_null_and_publish_when_ttl_elapses() {
        let (clock, bus, scheduler, store) = setup();
        let seen = capture(&bus);
        scheduler.tick();

        store.set("motion", true, Some(Duration::from_secs(30))).unwrap();
        assert!(store.has_pending_expiry("motion"));

        clock.advance(Duration::from_secs(30));
        scheduler.tick();

        assert_eq!(store.get("motion"), Value::Null);
        assert!(!store.has_pending_expiry("motion"));
        assert_eq!(
            seen.borrow().last().unwrap(),
            &json!({"name": "motion", "value": null, "previous": true})
        );
        assert!(store.names().is_empty());
    }

    #[test]
    fn should_cancel_previous_expiry_when_set_again() {
        let (clock, _bus, scheduler, store) = setup();
        scheduler.tick();

        store.set("motion", true, Some(Duration::from_secs(10))).unwrap();
        clock.advance(Duration::from_secs(5));
        scheduler.tick();
        store.set("motion", "still", None).unwrap();

        clock.advance(Duration::from_secs(10));
        scheduler.tick();

        assert_eq!(store.get("motion"), json!("still"));
        assert_eq!(scheduler.pending_timers(), 0);
    }

    #[test]
    fn should_restart_ttl_on_each_write() {
        let (clock, _bus, scheduler, store) = setup();
        scheduler.tick();

        store.set("motion", 1, Some(Duration::from_secs(10))).unwrap();
        clock.advance(Duration::from_secs(8));
        scheduler.tick();
        store.set("motion", 2, Some(Duration::from_secs(10))).unwrap();
        clock.advance(Duration::from_secs(8));
        scheduler.tick();

        assert_eq!(store.get("motion"), json!(2));
        assert_eq!(scheduler.pending_timers(), 1);
    }

    #[test]
    fn should_list_defined_names_in_order() {
        let (_, _, _, store) = setup();
        store.set("b", 1, None).unwrap();
        store.set("a", 2, None).unwrap();
        store.set("c", Value::Null, None).unwrap();
        assert_eq!(store.names(), vec!["a", "b"]);
    }
}
