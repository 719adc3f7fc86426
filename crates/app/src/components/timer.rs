//! Timer component — periodic and time-of-day triggers, day and time-window
//! constraints.
//!
//! | name           | kind       | arguments                        |
//! |----------------|------------|----------------------------------|
//! | `every`        | trigger    | duration string (`"2 seconds"`)  |
//! | `at`           | trigger    | `"HH:MM"`                        |
//! | `day.is`       | constraint | day, `[days]`, `weekday`/`weekend` |
//! | `time.between` | constraint | `"HH:MM"`, `"HH:MM"`             |

use serde_json::Value;
use tracing::debug;
use tripwire_domain::calendar::DaySet;
use tripwire_domain::error::TripwireError;
use tripwire_domain::schedule::{Schedule, Unit};
use tripwire_domain::time::{TimeOfDay, TimeWindow};

use crate::component::Component;
use crate::runtime::Services;
use crate::scenario::Scenario;
use crate::scheduler::tick_payload;
use crate::vocabulary::{
    ConstraintVocabulary, Constraints, TriggerVocabulary, Vocabulary, str_arg, value_arg,
};

pub const EVERY: &str = "every";
pub const AT: &str = "at";
pub const DAY_IS: &str = "day.is";
pub const TIME_BETWEEN: &str = "time.between";

#[derive(Debug, Default, Clone, Copy)]
pub struct TimerComponent;

impl Component for TimerComponent {
    fn name(&self) -> &'static str {
        "timer"
    }

    fn triggers(&self, services: &Services, scenario: &Scenario) -> Vocabulary {
        let scheduler = services.scheduler().clone();
        let periodic = scenario.clone();
        let minutely = services.scheduler().clone();
        let daily = scenario.clone();

        Vocabulary::new()
            .with(EVERY, move |args| {
                let schedule: Schedule = str_arg(EVERY, args, 0)?.parse()?;
                debug!(scenario = %periodic.description(), %schedule, "every trigger registered");
                let scenario = periodic.clone();
                scheduler.every(schedule, move || scenario.assert(None).map(drop));
                Ok(())
            })
            .with(AT, move |args| {
                let target: TimeOfDay = str_arg(AT, args, 0)?.parse()?;
                debug!(scenario = %daily.description(), %target, "at trigger registered");
                let scenario = daily.clone();
                minutely.every(Schedule::every(1, Unit::Minute)?, move || {
                    let now = scenario.runtime()?.scheduler().tick_time();
                    if TimeOfDay::of(now) == target {
                        scenario.assert(Some(&tick_payload(now))).map(drop)
                    } else {
                        Ok(())
                    }
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
        let day_clock = services.clock().clone();
        let day_group = constraints.clone();
        let time_clock = services.clock().clone();
        let time_group = constraints.clone();

        Vocabulary::new()
            .with(DAY_IS, move |args| {
                let days = DaySet::from_value(&value_arg(args, 0))?;
                let clock = day_clock.clone();
                day_group.push(move || Ok(days.matches(clock.now())));
                Ok(())
            })
            .with(TIME_BETWEEN, move |args| {
                let window = TimeWindow::parse(
                    str_arg(TIME_BETWEEN, args, 0)?,
                    str_arg(TIME_BETWEEN, args, 1)?,
                )?;
                let clock = time_clock.clone();
                time_group.push(move || Ok(window.contains(clock.now())));
                Ok(())
            })
    }
}

/// `when()?.every(..)` / `when()?.at(..)`.
pub trait TimerTriggers: Sized {
    /// Assert on every period of `duration`.
    ///
    /// # Errors
    ///
    /// Fails immediately on an unparsable duration.
    fn every(self, duration: &str) -> Result<Self, TripwireError>;

    /// Assert once a day at `time` (`HH:MM`), with the minute tick payload.
    ///
    /// # Errors
    ///
    /// Fails immediately on a malformed time.
    fn at(self, time: &str) -> Result<Self, TripwireError>;
}

impl TimerTriggers for TriggerVocabulary {
    fn every(self, duration: &str) -> Result<Self, TripwireError> {
        self.invoke(EVERY, &[Value::from(duration)])
    }

    fn at(self, time: &str) -> Result<Self, TripwireError> {
        self.invoke(AT, &[Value::from(time)])
    }
}

/// `constraint()?.day().is(..)` / `constraint()?.time().between(..)`.
pub trait CalendarConstraints {
    fn day(self) -> DayConstraint;
    fn time(self) -> TimeConstraint;
}

impl CalendarConstraints for ConstraintVocabulary {
    fn day(self) -> DayConstraint {
        DayConstraint(self)
    }

    fn time(self) -> TimeConstraint {
        TimeConstraint(self)
    }
}

#[derive(Debug)]
pub struct DayConstraint(ConstraintVocabulary);

impl DayConstraint {
    /// Today is one of `days`: a day name, a list of names, `"weekday"` or
    /// `"weekend"`.
    ///
    /// # Errors
    ///
    /// Fails immediately on an unknown day name.
    pub fn is(self, days: impl Into<Value>) -> Result<ConstraintVocabulary, TripwireError> {
        self.0.invoke(DAY_IS, &[days.into()])
    }
}

#[derive(Debug)]
pub struct TimeConstraint(ConstraintVocabulary);

impl TimeConstraint {
    /// Current `HH:MM` lies within `[start, end]`, both inclusive. A window
    /// with `start > end` never matches.
    ///
    /// # Errors
    ///
    /// Fails immediately on a malformed bound.
    pub fn between(self, start: &str, end: &str) -> Result<ConstraintVocabulary, TripwireError> {
        self.0
            .invoke(TIME_BETWEEN, &[Value::from(start), Value::from(end)])
    }
}
