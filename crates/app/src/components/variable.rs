//! Variable component — react to and gate on variable store values.

use serde_json::Value;
use tripwire_domain::error::TripwireError;
use tripwire_domain::expect::expect_with;

use crate::component::Component;
use crate::runtime::Services;
use crate::scenario::Scenario;
use crate::variables::VARIABLE_TOPIC;
use crate::vocabulary::{
    ConstraintVocabulary, Constraints, TriggerVocabulary, Vocabulary, str_arg, value_arg,
};

pub const CHANGES: &str = "variable.changes";
pub const IS: &str = "variable.is";
pub const DEFINED: &str = "variable.defined";

#[derive(Debug, Default, Clone, Copy)]
pub struct VariableComponent;

impl Component for VariableComponent {
    fn name(&self) -> &'static str {
        "variable"
    }

    fn triggers(&self, services: &Services, scenario: &Scenario) -> Vocabulary {
        let bus = services.bus().clone();
        let scenario = scenario.clone();
        Vocabulary::new().with(CHANGES, move |args| {
            let name = Value::from(str_arg(CHANGES, args, 0)?);
            let scenario = scenario.clone();
            bus.on(VARIABLE_TOPIC, move |change| match change.first() {
                Some(payload) if payload["name"] == name => {
                    scenario.assert(Some(&payload["value"])).map(drop)
                }
                _ => Ok(()),
            });
            Ok(())
        })
    }

    fn constraints(
        &self,
        services: &Services,
        _scenario: &Scenario,
        constraints: &Constraints,
    ) -> Vocabulary {
        let is_store = services.variables().clone();
        let is_group = constraints.clone();
        let defined_store = services.variables().clone();
        let defined_group = constraints.clone();

        Vocabulary::new()
            .with(IS, move |args| {
                let name = str_arg(IS, args, 0)?.to_string();
                let store = is_store.clone();
                let verdict = expect_with(move || store.get(&name)).eql(value_arg(args, 1));
                is_group.push(move || Ok(verdict.evaluate()));
                Ok(())
            })
            .with(DEFINED, move |args| {
                let name = str_arg(DEFINED, args, 0)?.to_string();
                let store = defined_store.clone();
                let verdict = expect_with(move || store.get(&name)).defined();
                defined_group.push(move || Ok(verdict.evaluate()));
                Ok(())
            })
    }
}

/// `when()?.variable(name).changes()`.
pub trait VariableTriggers {
    fn variable(self, name: &str) -> VariableTrigger;
}

impl VariableTriggers for TriggerVocabulary {
    fn variable(self, name: &str) -> VariableTrigger {
        VariableTrigger {
            vocabulary: self,
            name: name.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct VariableTrigger {
    vocabulary: TriggerVocabulary,
    name: String,
}

impl VariableTrigger {
    /// Assert whenever the variable is written, with its new value.
    ///
    /// # Errors
    ///
    /// Fails when the variable component is not registered.
    pub fn changes(self) -> Result<TriggerVocabulary, TripwireError> {
        self.vocabulary.invoke(CHANGES, &[Value::from(self.name)])
    }
}

/// `constraint()?.variable(name).is(..)` / `.defined()`.
pub trait VariableConstraints {
    fn variable(self, name: &str) -> VariableConstraint;
}

impl VariableConstraints for ConstraintVocabulary {
    fn variable(self, name: &str) -> VariableConstraint {
        VariableConstraint {
            vocabulary: self,
            name: name.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct VariableConstraint {
    vocabulary: ConstraintVocabulary,
    name: String,
}

impl VariableConstraint {
    /// The variable deep-equals `value` at assert time.
    ///
    /// # Errors
    ///
    /// Fails when the variable component is not registered.
    pub fn is(self, value: impl Into<Value>) -> Result<ConstraintVocabulary, TripwireError> {
        self.vocabulary
            .invoke(IS, &[Value::from(self.name), value.into()])
    }

    /// The variable holds a non-null value at assert time.
    ///
    /// # Errors
    ///
    /// Fails when the variable component is not registered.
    pub fn defined(self) -> Result<ConstraintVocabulary, TripwireError> {
        self.vocabulary.invoke(DEFINED, &[Value::from(self.name)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::runtime::Runtime;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    fn runtime() -> (ManualClock, Runtime) {
        let clock = ManualClock::new(
            NaiveDate::from_ymd_opt(2026, 10, 16)
                .unwrap()
                .and_hms_opt(18, 0, 0)
                .unwrap(),
        );
        let runtime = Runtime::builder()
            .clock(clock.clone())
            .builtin_components()
            .build()
            .unwrap();
        (clock, runtime)
    }

    fn recorder(scenario: &Scenario) -> Rc<RefCell<Vec<Value>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        scenario.then(move |_, value| {
            sink.borrow_mut().push(value.cloned().unwrap_or(Value::Null));
            Ok(())
        });
        seen
    }

    #[test]
    fn should_only_react_to_the_named_variable() {
        let (_, runtime) = runtime();
        let scenario = runtime.scenario("watch").unwrap();
        scenario.when().unwrap().variable("door").changes().unwrap();
        let seen = recorder(&scenario);

        runtime.variables().set("window", "open", None).unwrap();
        runtime.variables().set("door", "open", None).unwrap();

        assert_eq!(*seen.borrow(), vec![json!("open")]);
    }

    #[test]
    fn should_react_to_expiry_with_null() {
        let (clock, runtime) = runtime();
        let scenario = runtime.scenario("motion").unwrap();
        scenario.when().unwrap().variable("motion").changes().unwrap();
        let seen = recorder(&scenario);
        runtime.tick();

        runtime
            .variables()
            .set("motion", true, Some(Duration::from_secs(5)))
            .unwrap();
        clock.advance(Duration::from_secs(5));
        runtime.tick();

        assert_eq!(*seen.borrow(), vec![json!(true), Value::Null]);
    }

    #[test]
    fn should_compare_structured_values_deeply() {
        let (_, runtime) = runtime();
        let scenario = runtime.scenario("scene").unwrap();
        let seen = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&seen);
        scenario
            .constraint()
            .unwrap()
            .variable("scene")
            .is(json!({"name": "movie", "dim": 20}))
            .unwrap()
            .then(move |_, _| {
                *sink.borrow_mut() += 1;
                Ok(())
            });

        scenario.assert(None).unwrap();
        runtime
            .variables()
            .set("scene", json!({"dim": 20, "name": "movie"}), None)
            .unwrap();
        scenario.assert(None).unwrap();

        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn should_gate_on_defined_variable() {
        let (_, runtime) = runtime();
        let scenario = runtime.scenario("guest").unwrap();
        let seen = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&seen);
        scenario
            .constraint()
            .unwrap()
            .variable("guest")
            .defined()
            .unwrap()
            .then(move |_, _| {
                *sink.borrow_mut() += 1;
                Ok(())
            });

        scenario.assert(None).unwrap();
        runtime.variables().set("guest", "alice", None).unwrap();
        scenario.assert(None).unwrap();
        runtime.variables().set("guest", Value::Null, None).unwrap();
        scenario.assert(None).unwrap();

        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn should_allow_callbacks_to_set_other_variables() {
        let (_, runtime) = runtime();
        let scenario = runtime.scenario("mirror").unwrap();
        scenario.when().unwrap().variable("source").changes().unwrap();
        let variables = runtime.variables().clone();
        scenario.then(move |_, value| {
            variables.set("copy", value.cloned().unwrap_or(Value::Null), None)?;
            Ok(())
        });

        runtime.variables().set("source", 42, None).unwrap();

        assert_eq!(runtime.variables().get("copy"), json!(42));
    }
}
