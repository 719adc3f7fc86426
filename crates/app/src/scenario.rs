//! Scenario — a named automation rule and its evaluation pass.
//!
//! A scenario is declared with a fluent chain:
//!
//! ```text
//! scenario.when()?.variable("light").changes()?;
//! scenario
//!     .constraint()?.variable("light").is("purple")?.then(purple)
//!     .constraint()?.variable("light").is("red")?.then(red)
//!     .otherwise().then(neither);
//! ```
//!
//! Triggers call [`Scenario::assert`], which walks the callback entries in
//! declaration order:
//!
//! - a constrained entry runs when every predicate of its group holds;
//!   several constrained entries may run in the same pass;
//! - an unconstrained (else) entry runs only if no constrained entry has
//!   run earlier in that pass.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, trace, warn};
use tripwire_domain::error::TripwireError;
use tripwire_domain::time::WallClock;

use crate::clock::add;
use crate::ports::Clock;
use crate::runtime::{Runtime, RuntimeInner};
use crate::vocabulary::{ConstraintVocabulary, Constraints, Predicate, TriggerVocabulary};

/// Work run when a scenario's entry matches. Receives the scenario and the
/// stimulus payload, if the trigger carried one.
pub type Callback = Rc<dyn Fn(&Scenario, Option<&Value>) -> anyhow::Result<()>>;

#[derive(Clone)]
struct CallbackEntry {
    callback: Callback,
    /// `None` marks an else entry.
    constraints: Option<Vec<Predicate>>,
}

pub(crate) struct ScenarioInner {
    description: String,
    test_mode: Cell<bool>,
    runnable: Cell<bool>,
    evaluating: Cell<bool>,
    suppress_for: Option<Duration>,
    suppressed_until: Cell<Option<WallClock>>,
    entries: RefCell<Vec<CallbackEntry>>,
    clock: Rc<dyn Clock>,
    runtime: Weak<RuntimeInner>,
}

/// Shared scenario handle. Clones refer to the same scenario.
#[derive(Clone)]
pub struct Scenario {
    inner: Rc<ScenarioInner>,
}

impl Scenario {
    pub(crate) fn new(
        description: String,
        suppress_for: Option<Duration>,
        clock: Rc<dyn Clock>,
        runtime: Weak<RuntimeInner>,
    ) -> Self {
        Self {
            inner: Rc::new(ScenarioInner {
                description,
                test_mode: Cell::new(false),
                runnable: Cell::new(true),
                evaluating: Cell::new(false),
                suppress_for,
                suppressed_until: Cell::new(None),
                entries: RefCell::default(),
                clock,
                runtime,
            }),
        }
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.inner.description
    }

    #[must_use]
    pub fn is_test_mode(&self) -> bool {
        self.inner.test_mode.get()
    }

    /// Whether asserts currently do anything. Derived from the test mode of
    /// every scenario in the runtime.
    #[must_use]
    pub fn is_runnable(&self) -> bool {
        self.inner.runnable.get()
    }

    pub(crate) fn set_runnable(&self, runnable: bool) {
        self.inner.runnable.set(runnable);
    }

    /// Number of callback entries declared so far.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    /// End of the current suppression window, if one is active.
    #[must_use]
    pub fn suppressed_until(&self) -> Option<WallClock> {
        self.inner
            .suppressed_until
            .get()
            .filter(|until| self.inner.clock.now() < *until)
    }

    /// The runtime this scenario belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`TripwireError::RuntimeDropped`] once the runtime is gone.
    pub fn runtime(&self) -> Result<Runtime, TripwireError> {
        self.inner
            .runtime
            .upgrade()
            .map(Runtime::from_inner)
            .ok_or(TripwireError::RuntimeDropped)
    }

    /// Trigger vocabulary merged from every component.
    ///
    /// # Errors
    ///
    /// Fails if the runtime is gone or two components contribute the same
    /// trigger name.
    pub fn when(&self) -> Result<TriggerVocabulary, TripwireError> {
        let factories = self.runtime()?.trigger_vocabulary(self)?;
        Ok(TriggerVocabulary::new(self.clone(), factories))
    }

    /// Open a new constraint group.
    ///
    /// # Errors
    ///
    /// Fails if the runtime is gone or two components contribute the same
    /// constraint name.
    pub fn constraint(&self) -> Result<ConstraintVocabulary, TripwireError> {
        let constraints = Constraints::default();
        let factories = self.runtime()?.constraint_vocabulary(self, &constraints)?;
        Ok(ConstraintVocabulary::new(self.clone(), factories, constraints))
    }

    /// Append an unconstrained entry.
    pub fn then(
        &self,
        callback: impl Fn(&Scenario, Option<&Value>) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.push_entry(Rc::new(callback), None);
        self.clone()
    }

    /// Fallback branch, runs when no constrained entry ran before it.
    #[must_use]
    pub fn otherwise(&self) -> Otherwise {
        Otherwise {
            scenario: self.clone(),
        }
    }

    pub(crate) fn push_entry(&self, callback: Callback, constraints: Option<Vec<Predicate>>) {
        self.inner.entries.borrow_mut().push(CallbackEntry {
            callback,
            constraints,
        });
    }

    /// Put this scenario in test mode: every scenario not in test mode stops
    /// running.
    ///
    /// # Errors
    ///
    /// Returns [`TripwireError::RuntimeDropped`] once the runtime is gone.
    pub fn test(&self) -> Result<Self, TripwireError> {
        self.set_test_mode(true)?;
        Ok(self.clone())
    }

    /// Enter or leave test mode and re-derive `runnable` runtime-wide.
    ///
    /// # Errors
    ///
    /// Returns [`TripwireError::RuntimeDropped`] once the runtime is gone.
    pub fn set_test_mode(&self, enabled: bool) -> Result<(), TripwireError> {
        let runtime = self.runtime()?;
        self.inner.test_mode.set(enabled);
        runtime.refresh_runnable();
        Ok(())
    }

    /// Evaluate the callback entries against the current state.
    ///
    /// Returns how many callbacks ran. Does nothing when the scenario is not
    /// runnable, is inside its suppression window, or is already being
    /// evaluated further up the stack.
    ///
    /// # Errors
    ///
    /// Predicate errors are returned as-is; callback errors are wrapped in
    /// [`TripwireError::Callback`]. Evaluation stops at the first error.
    pub fn assert(&self, result: Option<&Value>) -> Result<usize, TripwireError> {
        if !self.is_runnable() {
            trace!(scenario = %self.description(), "assert skipped, not runnable");
            return Ok(0);
        }
        if let Some(until) = self.suppressed_until() {
            trace!(scenario = %self.description(), %until, "assert suppressed");
            return Ok(0);
        }
        if self.inner.evaluating.replace(true) {
            warn!(scenario = %self.description(), "ignoring re-entrant assert");
            return Ok(0);
        }
        let _guard = EvaluationGuard(&self.inner.evaluating);

        let entries = self.inner.entries.borrow().clone();
        let mut matched = 0_usize;
        let mut executed = 0_usize;
        for entry in entries {
            let constrained = match &entry.constraints {
                None if matched > 0 => continue,
                None => false,
                Some(group) => {
                    if !all_hold(group)? {
                        continue;
                    }
                    !group.is_empty()
                }
            };
            (entry.callback)(self, result).map_err(|source| TripwireError::Callback {
                scenario: self.description().to_string(),
                source,
            })?;
            executed += 1;
            if constrained {
                matched += 1;
            }
        }

        if executed > 0 {
            if let Some(window) = self.inner.suppress_for {
                let until = add(self.inner.clock.now(), window);
                self.inner.suppressed_until.set(Some(until));
            }
        }
        debug!(scenario = %self.description(), executed, "asserted");
        Ok(executed)
    }
}

fn all_hold(group: &[Predicate]) -> Result<bool, TripwireError> {
    for predicate in group {
        if !predicate()? {
            return Ok(false);
        }
    }
    Ok(true)
}

struct EvaluationGuard<'a>(&'a Cell<bool>);

impl Drop for EvaluationGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl PartialEq for Scenario {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Scenario {}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("description", &self.inner.description)
            .field("test_mode", &self.is_test_mode())
            .field("runnable", &self.is_runnable())
            .field("entries", &self.entry_count())
            .finish_non_exhaustive()
    }
}

/// Returned by [`Scenario::otherwise`].
#[derive(Debug)]
pub struct Otherwise {
    scenario: Scenario,
}

impl Otherwise {
    pub fn then(
        self,
        callback: impl Fn(&Scenario, Option<&Value>) -> anyhow::Result<()> + 'static,
    ) -> Scenario {
        self.scenario.then(callback)
    }
}
