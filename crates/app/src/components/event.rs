//! Event component — assert a scenario whenever a bus topic is emitted.

use serde_json::Value;
use tripwire_domain::error::TripwireError;

use crate::component::Component;
use crate::runtime::Services;
use crate::scenario::Scenario;
use crate::vocabulary::{TriggerVocabulary, Vocabulary, str_arg};

pub const EVENT: &str = "event";

#[derive(Debug, Default, Clone, Copy)]
pub struct EventComponent;

impl Component for EventComponent {
    fn name(&self) -> &'static str {
        "event"
    }

    fn triggers(&self, services: &Services, scenario: &Scenario) -> Vocabulary {
        let bus = services.bus().clone();
        let scenario = scenario.clone();
        Vocabulary::new().with(EVENT, move |args| {
            let topic = str_arg(EVENT, args, 0)?;
            let scenario = scenario.clone();
            bus.on(topic, move |payload| scenario.assert(payload.first()).map(drop));
            Ok(())
        })
    }
}

/// `when()?.event(topic)`.
pub trait EventTriggers: Sized {
    /// Assert on every emit of `topic`, with the first emitted argument.
    ///
    /// # Errors
    ///
    /// Fails when the event component is not registered.
    fn event(self, topic: &str) -> Result<Self, TripwireError>;
}

impl EventTriggers for TriggerVocabulary {
    fn event(self, topic: &str) -> Result<Self, TripwireError> {
        self.invoke(EVENT, &[Value::from(topic)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::runtime::Runtime;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn runtime() -> Runtime {
        Runtime::builder()
            .clock(ManualClock::new(chrono::NaiveDateTime::default()))
            .builtin_components()
            .build()
            .unwrap()
    }

    #[test]
    fn should_assert_with_first_argument() {
        let runtime = runtime();
        let scenario = runtime.scenario("doorbell").unwrap();
        scenario.when().unwrap().event("doorbell").unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        scenario.then(move |_, payload| {
            sink.borrow_mut().push(payload.cloned());
            Ok(())
        });

        runtime.bus().emit("doorbell", &[json!("front"), json!(1)]).unwrap();
        runtime.bus().emit("doorbell", &[]).unwrap();

        assert_eq!(*seen.borrow(), vec![Some(json!("front")), None]);
    }

    #[test]
    fn should_assert_once_per_trigger_registration() {
        let runtime = runtime();
        let scenario = runtime.scenario("either").unwrap();
        scenario
            .when()
            .unwrap()
            .event("arrive")
            .unwrap()
            .event("leave")
            .unwrap();
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        scenario.then(move |_, _| {
            *sink.borrow_mut() += 1;
            Ok(())
        });

        runtime.bus().emit("arrive", &[]).unwrap();
        runtime.bus().emit("leave", &[]).unwrap();
        runtime.bus().emit("other", &[]).unwrap();

        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn should_propagate_callback_failure_to_emitter() {
        let runtime = runtime();
        let scenario = runtime.scenario("faulty").unwrap();
        scenario.when().unwrap().event("go").unwrap();
        scenario.then(|_, _| anyhow::bail!("nope"));

        let result = runtime.bus().emit("go", &[]);

        assert!(matches!(result, Err(TripwireError::Callback { .. })));
    }
}
