//! Runtime — the context object owning every shared service, the component
//! list and the scenario registry.
//!
//! Built once at startup with [`Runtime::builder`]; tests build a fresh one
//! per case instead of resetting global state.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, info};
use tripwire_domain::error::{TripwireError, ValidationError, VocabularyKind};
use tripwire_domain::options::ScenarioOptions;

use crate::clock::SystemClock;
use crate::component::Component;
use crate::components;
use crate::event_bus::EventBus;
use crate::ports::Clock;
use crate::scenario::Scenario;
use crate::scheduler::Scheduler;
use crate::variables::VariableStore;
use crate::vocabulary::{Constraints, Vocabulary};

/// Shared services handed to components.
#[derive(Clone)]
pub struct Services {
    clock: Rc<dyn Clock>,
    bus: EventBus,
    scheduler: Scheduler,
    variables: VariableStore,
}

impl Services {
    fn new(clock: Rc<dyn Clock>, max_catch_up: Option<u32>) -> Self {
        let bus = EventBus::new();
        let scheduler = Scheduler::new(Rc::clone(&clock), Rc::new(bus.clone()));
        if let Some(seconds) = max_catch_up {
            scheduler.set_max_catch_up(seconds);
        }
        let variables = VariableStore::new(Rc::new(bus.clone()), scheduler.clone());
        Self {
            clock,
            bus,
            scheduler,
            variables,
        }
    }

    #[must_use]
    pub fn clock(&self) -> &Rc<dyn Clock> {
        &self.clock
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("bus", &self.bus)
            .field("scheduler", &self.scheduler)
            .field("variables", &self.variables)
            .finish_non_exhaustive()
    }
}

pub(crate) struct RuntimeInner {
    services: Services,
    components: Vec<Rc<dyn Component>>,
    scenarios: RefCell<IndexMap<String, Scenario>>,
}

/// Shared runtime handle. Clones refer to the same runtime.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

/// Builder for [`Runtime`].
#[derive(Default)]
pub struct RuntimeBuilder {
    clock: Option<Rc<dyn Clock>>,
    components: Vec<Rc<dyn Component>>,
    max_catch_up: Option<u32>,
}

impl RuntimeBuilder {
    /// Defaults to [`SystemClock`].
    #[must_use]
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Rc::new(clock));
        self
    }

    #[must_use]
    pub fn component(mut self, component: impl Component + 'static) -> Self {
        self.components.push(Rc::new(component));
        self
    }

    /// Register the timer, variable and event components.
    #[must_use]
    pub fn builtin_components(mut self) -> Self {
        self.components.extend(components::builtin());
        self
    }

    /// See [`Scheduler::set_max_catch_up`].
    #[must_use]
    pub fn max_catch_up(mut self, seconds: u32) -> Self {
        self.max_catch_up = Some(seconds);
        self
    }

    /// Create the services and initialise every component in order.
    ///
    /// # Errors
    ///
    /// Returns the first component `init` failure.
    pub fn build(self) -> Result<Runtime, TripwireError> {
        let clock = self.clock.unwrap_or_else(|| Rc::new(SystemClock));
        let services = Services::new(clock, self.max_catch_up);
        for component in &self.components {
            component.init(&services)?;
            debug!(component = component.name(), "component initialised");
        }
        info!(components = self.components.len(), "runtime ready");
        Ok(Runtime {
            inner: Rc::new(RuntimeInner {
                services,
                components: self.components,
                scenarios: RefCell::default(),
            }),
        })
    }
}

impl Runtime {
    #[must_use]
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    pub(crate) fn from_inner(inner: Rc<RuntimeInner>) -> Self {
        Self { inner }
    }

    #[must_use]
    pub fn services(&self) -> &Services {
        &self.inner.services
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.inner.services.bus
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.services.scheduler
    }

    #[must_use]
    pub fn variables(&self) -> &VariableStore {
        &self.inner.services.variables
    }

    #[must_use]
    pub fn clock(&self) -> &Rc<dyn Clock> {
        &self.inner.services.clock
    }

    /// Names of the registered components, in registration order.
    #[must_use]
    pub fn component_names(&self) -> Vec<&'static str> {
        self.inner.components.iter().map(|c| c.name()).collect()
    }

    /// Create a scenario with default options.
    ///
    /// # Errors
    ///
    /// See [`Runtime::scenario_with`].
    pub fn scenario(&self, description: impl Into<String>) -> Result<Scenario, TripwireError> {
        self.scenario_with(description, ScenarioOptions::default())
    }

    /// Create and register a scenario.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyName`] for a blank description,
    /// [`ValidationError::DuplicateScenario`] when the description is taken,
    /// or [`ValidationError::VocabularyCollision`] when two components
    /// contribute the same name.
    pub fn scenario_with(
        &self,
        description: impl Into<String>,
        options: ScenarioOptions,
    ) -> Result<Scenario, TripwireError> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if self.inner.scenarios.borrow().contains_key(&description) {
            return Err(ValidationError::DuplicateScenario(description).into());
        }

        let scenario = Scenario::new(
            description.clone(),
            options.suppress_for,
            Rc::clone(self.clock()),
            Rc::downgrade(&self.inner),
        );
        self.trigger_vocabulary(&scenario)?;
        self.constraint_vocabulary(&scenario, &Constraints::default())?;

        self.inner
            .scenarios
            .borrow_mut()
            .insert(description.clone(), scenario.clone());
        if options.only {
            scenario.set_test_mode(true)?;
        } else {
            self.refresh_runnable();
        }
        info!(
            scenario = %description,
            suppress_for = ?options.suppress_for,
            only = options.only,
            "scenario created"
        );
        Ok(scenario)
    }

    #[must_use]
    pub fn get(&self, description: &str) -> Option<Scenario> {
        self.inner.scenarios.borrow().get(description).cloned()
    }

    /// Every scenario, in creation order.
    #[must_use]
    pub fn scenarios(&self) -> Vec<Scenario> {
        self.inner.scenarios.borrow().values().cloned().collect()
    }

    /// Drop every scenario from the registry.
    ///
    /// Removed scenarios stop running; their trigger bindings stay
    /// registered but no longer do anything.
    pub fn clear_scenarios(&self) {
        let removed: Vec<Scenario> = self
            .inner
            .scenarios
            .borrow_mut()
            .drain(..)
            .map(|(_, scenario)| scenario)
            .collect();
        for scenario in &removed {
            scenario.set_runnable(false);
        }
        debug!(count = removed.len(), "scenarios cleared");
    }

    /// Advance the scheduler to the current time. See [`Scheduler::tick`].
    pub fn tick(&self) -> usize {
        self.scheduler().tick()
    }

    /// A scenario runs when no scenario is in test mode, or it is itself in
    /// test mode.
    pub(crate) fn refresh_runnable(&self) {
        let scenarios = self.scenarios();
        let isolating = scenarios.iter().any(Scenario::is_test_mode);
        for scenario in &scenarios {
            scenario.set_runnable(!isolating || scenario.is_test_mode());
        }
    }

    pub(crate) fn trigger_vocabulary(
        &self,
        scenario: &Scenario,
    ) -> Result<Vocabulary, ValidationError> {
        let mut merged = Vocabulary::new();
        for component in &self.inner.components {
            merged.merge(
                component.triggers(self.services(), scenario),
                VocabularyKind::Trigger,
            )?;
        }
        Ok(merged)
    }

    pub(crate) fn constraint_vocabulary(
        &self,
        scenario: &Scenario,
        constraints: &Constraints,
    ) -> Result<Vocabulary, ValidationError> {
        let mut merged = Vocabulary::new();
        for component in &self.inner.components {
            merged.merge(
                component.constraints(self.services(), scenario, constraints),
                VocabularyKind::Constraint,
            )?;
        }
        Ok(merged)
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("components", &self.component_names())
            .field("scenarios", &self.inner.scenarios.borrow().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::NaiveDate;
    use serde_json::Value;
    use std::cell::Cell;
    use tripwire_domain::error::VocabularyKind;

    fn clock() -> ManualClock {
        ManualClock::new(
            NaiveDate::from_ymd_opt(2026, 10, 16)
                .unwrap()
                .and_hms_opt(7, 0, 0)
                .unwrap(),
        )
    }

    struct Counter {
        inits: Rc<Cell<u32>>,
    }

    impl Component for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }

        fn init(&self, _services: &Services) -> Result<(), TripwireError> {
            self.inits.set(self.inits.get() + 1);
            Ok(())
        }
    }

    /// Contributes a trigger name already provided by the timer component.
    struct Shadow;

    impl Component for Shadow {
        fn name(&self) -> &'static str {
            "shadow"
        }

        fn triggers(&self, _services: &Services, _scenario: &Scenario) -> Vocabulary {
            Vocabulary::new().with("every", |_: &[Value]| Ok(()))
        }
    }

    struct Failing;

    impl Component for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn init(&self, _services: &Services) -> Result<(), TripwireError> {
            Err(ValidationError::EmptyName.into())
        }
    }

    #[test]
    fn should_init_each_component_once() {
        let inits = Rc::new(Cell::new(0));
        let runtime = Runtime::builder()
            .clock(clock())
            .builtin_components()
            .component(Counter {
                inits: Rc::clone(&inits),
            })
            .build()
            .unwrap();

        assert_eq!(inits.get(), 1);
        assert_eq!(
            runtime.component_names(),
            vec!["timer", "variable", "event", "counter"]
        );
    }

    #[test]
    fn should_abort_build_when_component_init_fails() {
        let result = Runtime::builder().clock(clock()).component(Failing).build();
        assert!(result.is_err());
    }

    #[test]
    fn should_reject_scenario_when_components_collide() {
        let runtime = Runtime::builder()
            .clock(clock())
            .builtin_components()
            .component(Shadow)
            .build()
            .unwrap();

        let result = runtime.scenario("collides");

        assert!(matches!(
            result,
            Err(TripwireError::Validation(ValidationError::VocabularyCollision {
                kind: VocabularyKind::Trigger,
                ..
            }))
        ));
        assert!(runtime.get("collides").is_none());
    }

    #[test]
    fn should_reject_blank_description() {
        let runtime = Runtime::builder().clock(clock()).build().unwrap();
        assert!(matches!(
            runtime.scenario("  "),
            Err(TripwireError::Validation(ValidationError::EmptyName))
        ));
    }

    #[test]
    fn should_list_scenarios_in_creation_order() {
        let runtime = Runtime::builder().clock(clock()).build().unwrap();
        runtime.scenario("b").unwrap();
        runtime.scenario("a").unwrap();

        let names: Vec<String> = runtime
            .scenarios()
            .iter()
            .map(|s| s.description().to_string())
            .collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn should_disable_cleared_scenarios_and_free_descriptions() {
        let runtime = Runtime::builder().clock(clock()).build().unwrap();
        let old = runtime.scenario("porch").unwrap();
        old.test().unwrap();

        runtime.clear_scenarios();

        assert!(!old.is_runnable());
        assert!(runtime.scenarios().is_empty());
        let fresh = runtime.scenario("porch").unwrap();
        assert!(fresh.is_runnable());
    }

    #[test]
    fn should_share_services_with_scenarios() {
        let runtime = Runtime::builder().clock(clock()).build().unwrap();
        let scenario = runtime.scenario("shared").unwrap();
        let handle = scenario.runtime().unwrap();

        handle.variables().set("x", 1, None).unwrap();

        assert_eq!(runtime.variables().get("x"), Value::from(1));
    }
}
