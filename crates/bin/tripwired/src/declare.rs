//! Declarative scenarios — turn `[[scenario]]` tables into live scenarios.
//!
//! Trigger and constraint calls are resolved by name against the runtime's
//! merged vocabulary, so a misspelled name fails at startup.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value;
use tracing::info;
use tripwire_app::event_bus::EventBus;
use tripwire_app::runtime::Runtime;
use tripwire_app::scenario::Scenario;
use tripwire_app::variables::VariableStore;
use tripwire_domain::error::TripwireError;
use tripwire_domain::options::ScenarioOptions;
use tripwire_domain::schedule::parse_duration;

use crate::config::{BranchConfig, ScenarioConfig, SetAction};

/// Set every initial variable, in name order.
///
/// # Errors
///
/// Returns the first error raised by a `variable` subscriber.
pub fn seed_variables(
    runtime: &Runtime,
    variables: &BTreeMap<String, Value>,
) -> Result<(), TripwireError> {
    for (name, value) in variables {
        runtime.variables().set(name.as_str(), value.clone(), None)?;
    }
    Ok(())
}

/// Declare every scenario, in file order.
///
/// # Errors
///
/// Returns the first declaration error; scenarios declared before it stay
/// registered.
pub fn declare_all(
    runtime: &Runtime,
    scenarios: &[ScenarioConfig],
) -> Result<Vec<Scenario>, TripwireError> {
    scenarios.iter().map(|decl| declare(runtime, decl)).collect()
}

/// Create one scenario with its triggers and branches.
///
/// # Errors
///
/// Fails on invalid options, a duplicate description, an unknown or
/// rejected vocabulary call, or an invalid TTL.
pub fn declare(runtime: &Runtime, decl: &ScenarioConfig) -> Result<Scenario, TripwireError> {
    let options = ScenarioOptions::from_value(&decl.options)?;
    let scenario = runtime.scenario_with(decl.description.as_str(), options)?;

    let mut triggers = scenario.when()?;
    for call in &decl.triggers {
        triggers = triggers.invoke(&call.name, &call.args)?;
    }

    for branch in &decl.branches {
        let action = Action::new(runtime, branch)?;
        match &branch.constraints {
            None => {
                scenario.otherwise().then(move |s, payload| action.run(s, payload));
            }
            Some(calls) => {
                let mut group = scenario.constraint()?;
                for call in calls {
                    group = group.invoke(&call.name, &call.args)?;
                }
                group.then(move |s, payload| action.run(s, payload));
            }
        }
    }

    info!(
        scenario = %decl.description,
        triggers = decl.triggers.len(),
        branches = decl.branches.len(),
        "scenario declared"
    );
    Ok(scenario)
}

/// What a branch does when it runs.
struct Action {
    bus: EventBus,
    variables: VariableStore,
    emit: Option<String>,
    set: Option<SetAction>,
    ttl: Option<Duration>,
    log: Option<String>,
}

impl Action {
    fn new(runtime: &Runtime, branch: &BranchConfig) -> Result<Self, TripwireError> {
        let ttl = branch
            .set
            .as_ref()
            .and_then(|set| set.ttl.as_deref())
            .map(parse_duration)
            .transpose()?;
        Ok(Self {
            bus: runtime.bus().clone(),
            variables: runtime.variables().clone(),
            emit: branch.emit.clone(),
            set: branch.set.clone(),
            ttl,
            log: branch.log.clone(),
        })
    }

    fn run(&self, scenario: &Scenario, payload: Option<&Value>) -> anyhow::Result<()> {
        if let Some(message) = &self.log {
            info!(scenario = %scenario.description(), "{message}");
        }
        if let Some(topic) = &self.emit {
            let args: Vec<Value> = payload.into_iter().cloned().collect();
            self.bus.emit(topic, &args)?;
        }
        if let Some(set) = &self.set {
            self.variables
                .set(set.name.as_str(), set.value.clone(), self.ttl)?;
        }
        Ok(())
    }
}
