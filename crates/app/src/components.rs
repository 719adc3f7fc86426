//! Built-in components.
//!
//! The registry is an explicit list: adding a component means adding it
//! here (or passing it to [`RuntimeBuilder::component`]), never discovering
//! it at runtime.
//!
//! [`RuntimeBuilder::component`]: crate::runtime::RuntimeBuilder::component

use std::rc::Rc;

use crate::component::Component;

pub mod device;
pub mod event;
pub mod timer;
pub mod variable;

/// Components every runtime gets from [`RuntimeBuilder::builtin_components`].
///
/// The device component is opt-in because it needs a device registry.
///
/// [`RuntimeBuilder::builtin_components`]: crate::runtime::RuntimeBuilder::builtin_components
#[must_use]
pub fn builtin() -> Vec<Rc<dyn Component>> {
    vec![
        Rc::new(timer::TimerComponent),
        Rc::new(variable::VariableComponent),
        Rc::new(event::EventComponent),
    ]
}
