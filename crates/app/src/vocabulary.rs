//! Trigger and constraint vocabularies — the names a scenario can use in
//! `when()` and `constraint()` blocks, contributed by components.
//!
//! A [`Vocabulary`] maps a name (`"every"`, `"day.is"`, …) to a factory.
//! Components return one from [`Component::triggers`] and
//! [`Component::constraints`]; the runtime merges them, refusing a name
//! contributed twice.
//!
//! [`Component::triggers`]: crate::component::Component::triggers
//! [`Component::constraints`]: crate::component::Component::constraints

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;
use tripwire_domain::error::{TripwireError, ValidationError, VocabularyKind};
use tripwire_domain::expect::Verdict;

use crate::scenario::Scenario;

/// Declaration-time action behind a vocabulary name.
///
/// Trigger factories register a stimulus binding; constraint factories push
/// a predicate onto their group's [`Constraints`].
pub type Factory = Rc<dyn Fn(&[Value]) -> Result<(), TripwireError>>;

/// A constraint check, evaluated on every assert.
pub type Predicate = Rc<dyn Fn() -> Result<bool, TripwireError>>;

/// Ordered name → factory map.
#[derive(Clone, Default)]
pub struct Vocabulary {
    factories: IndexMap<String, Factory>,
}

impl Vocabulary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(
        mut self,
        name: impl Into<String>,
        factory: impl Fn(&[Value]) -> Result<(), TripwireError> + 'static,
    ) -> Self {
        self.factories.insert(name.into(), Rc::new(factory));
        self
    }

    /// Add every entry of `other`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::VocabularyCollision`] if a name is already
    /// present; nothing is merged in that case.
    pub fn merge(&mut self, other: Self, kind: VocabularyKind) -> Result<(), ValidationError> {
        if let Some(name) = other.factories.keys().find(|name| self.factories.contains_key(*name)) {
            return Err(ValidationError::VocabularyCollision {
                kind,
                name: name.clone(),
            });
        }
        self.factories.extend(other.factories);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Factory> {
        self.factories.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    fn invoke(
        &self,
        kind: VocabularyKind,
        name: &str,
        args: &[Value],
    ) -> Result<(), TripwireError> {
        let factory = self.get(name).ok_or_else(|| ValidationError::UnknownVocabulary {
            kind,
            name: name.to_string(),
        })?;
        factory(args)
    }
}

impl fmt::Debug for Vocabulary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Predicates accumulated by one `constraint()` block.
///
/// Each block gets a fresh accumulator, so two blocks on the same scenario
/// never share predicates.
#[derive(Clone, Default)]
pub struct Constraints {
    predicates: Rc<RefCell<Vec<Predicate>>>,
}

impl Constraints {
    pub fn push(&self, predicate: impl Fn() -> Result<bool, TripwireError> + 'static) {
        self.predicates.borrow_mut().push(Rc::new(predicate));
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<Predicate> {
        self.predicates.borrow().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.predicates.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates.borrow().is_empty()
    }
}

impl fmt::Debug for Constraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraints").field("len", &self.len()).finish()
    }
}

/// Returned by [`Scenario::when`]. Every trigger call registers one more
/// stimulus; any of them firing asserts the scenario.
#[derive(Debug)]
pub struct TriggerVocabulary {
    scenario: Scenario,
    factories: Vocabulary,
}

impl TriggerVocabulary {
    pub(crate) fn new(scenario: Scenario, factories: Vocabulary) -> Self {
        Self {
            scenario,
            factories,
        }
    }

    /// Call the trigger named `name` with declaration-time arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownVocabulary`] for a name no
    /// component contributes, or whatever the trigger rejects.
    pub fn invoke(self, name: &str, args: &[Value]) -> Result<Self, TripwireError> {
        self.factories.invoke(VocabularyKind::Trigger, name, args)?;
        Ok(self)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.names()
    }

    #[must_use]
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }
}

/// Returned by [`Scenario::constraint`]. Every constraint call adds one
/// predicate to the group; all must hold for the group's callback to run.
#[derive(Debug)]
pub struct ConstraintVocabulary {
    scenario: Scenario,
    factories: Vocabulary,
    constraints: Constraints,
}

impl ConstraintVocabulary {
    pub(crate) fn new(scenario: Scenario, factories: Vocabulary, constraints: Constraints) -> Self {
        Self {
            scenario,
            factories,
            constraints,
        }
    }

    /// Call the constraint named `name` with declaration-time arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownVocabulary`] for a name no
    /// component contributes, or whatever the constraint rejects.
    pub fn invoke(self, name: &str, args: &[Value]) -> Result<Self, TripwireError> {
        self.factories.invoke(VocabularyKind::Constraint, name, args)?;
        Ok(self)
    }

    /// Add an ad-hoc predicate.
    #[must_use]
    pub fn check(self, predicate: impl Fn() -> bool + 'static) -> Self {
        self.constraints.push(move || Ok(predicate()));
        self
    }

    /// Add an ad-hoc predicate that may fail.
    #[must_use]
    pub fn try_check(self, predicate: impl Fn() -> Result<bool, TripwireError> + 'static) -> Self {
        self.constraints.push(predicate);
        self
    }

    /// Gate the group on a matcher verdict. A deferred verdict is
    /// re-evaluated on every assert.
    #[must_use]
    pub fn expect(self, verdict: Verdict) -> Self {
        self.constraints.push(move || Ok(verdict.evaluate()));
        self
    }

    /// Close the group with its callback.
    pub fn then(
        self,
        callback: impl Fn(&Scenario, Option<&Value>) -> anyhow::Result<()> + 'static,
    ) -> Scenario {
        self.scenario
            .push_entry(Rc::new(callback), Some(self.constraints.snapshot()));
        self.scenario
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.names()
    }

    #[must_use]
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }
}

/// String argument at `index`.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidArguments`] when missing or not a string.
pub fn str_arg<'a>(
    name: &str,
    args: &'a [Value],
    index: usize,
) -> Result<&'a str, ValidationError> {
    args.get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| ValidationError::arguments(name, "expected a string argument"))
}

/// Argument at `index`, `null` when missing.
#[must_use]
pub fn value_arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Null)
}
