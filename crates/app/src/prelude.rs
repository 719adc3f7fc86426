//! Everything needed to declare scenarios.
//!
//! ```
//! use tripwire_app::prelude::*;
//!
//! # fn main() -> Result<(), tripwire_domain::error::TripwireError> {
//! let runtime = Runtime::builder().builtin_components().build()?;
//! let scenario = runtime.scenario("evening lights")?;
//! scenario.when()?.every("minute")?;
//! scenario
//!     .constraint()?
//!     .time()
//!     .between("18:00", "23:00")?
//!     .then(|_, _| Ok(()))
//!     .otherwise()
//!     .then(|_, _| Ok(()));
//! # Ok(())
//! # }
//! ```

pub use crate::clock::{ManualClock, SystemClock};
pub use crate::component::Component;
pub use crate::components::device::{DeviceComponent, DeviceConstraints, DeviceTriggers, Devices};
pub use crate::components::event::EventTriggers;
pub use crate::components::timer::{CalendarConstraints, TimerTriggers};
pub use crate::components::variable::{VariableConstraints, VariableTriggers};
pub use crate::runtime::{Runtime, Services};
pub use crate::scenario::Scenario;
pub use tripwire_domain::expect::{expect, expect_with};
pub use tripwire_domain::options::ScenarioOptions;
