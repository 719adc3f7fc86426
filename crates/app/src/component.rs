//! Component protocol — how a capability module extends every scenario.
//!
//! The runtime holds an explicit, ordered list of components. When a
//! scenario needs its trigger vocabulary it asks each component for its
//! [`triggers`](Component::triggers); each `constraint()` block asks for
//! [`constraints`](Component::constraints) with a fresh accumulator. A
//! component that contributes nothing to one side keeps the default.

use tripwire_domain::error::TripwireError;

use crate::runtime::Services;
use crate::scenario::Scenario;
use crate::vocabulary::{Constraints, Vocabulary};

pub trait Component {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Called once when the runtime is built.
    ///
    /// # Errors
    ///
    /// A failing component aborts the runtime build.
    fn init(&self, services: &Services) -> Result<(), TripwireError> {
        let _ = services;
        Ok(())
    }

    /// Trigger factories bound to `scenario`.
    fn triggers(&self, services: &Services, scenario: &Scenario) -> Vocabulary {
        let _ = (services, scenario);
        Vocabulary::new()
    }

    /// Constraint factories pushing onto `constraints`.
    fn constraints(
        &self,
        services: &Services,
        scenario: &Scenario,
        constraints: &Constraints,
    ) -> Vocabulary {
        let _ = (services, scenario, constraints);
        Vocabulary::new()
    }
}
