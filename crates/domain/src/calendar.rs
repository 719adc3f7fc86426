//! Day sets — which days of the week a day constraint accepts.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{Datelike, Weekday};
use serde_json::Value;

use crate::error::ValidationError;
use crate::time::WallClock;

const WEEKDAYS: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];
const WEEKEND: [Weekday; 2] = [Weekday::Sat, Weekday::Sun];

/// A set of accepted days of the week.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DaySet {
    days: BTreeSet<u32>,
}

impl DaySet {
    /// Parse a single day name or alias.
    ///
    /// Accepts full or three-letter English day names in any case, plus the
    /// aliases `weekday` (Monday–Friday) and `weekend` (Saturday, Sunday).
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDay`] for anything else.
    pub fn parse(day: &str) -> Result<Self, ValidationError> {
        let mut set = Self::default();
        set.insert_name(day)?;
        Ok(set)
    }

    /// Parse a list of day names / aliases; the result is their union.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDay`] for the first unknown entry,
    /// or when the list is empty.
    pub fn parse_all<'a>(days: impl IntoIterator<Item = &'a str>) -> Result<Self, ValidationError> {
        let mut set = Self::default();
        for day in days {
            set.insert_name(day)?;
        }
        if set.days.is_empty() {
            return Err(ValidationError::InvalidDay(String::new()));
        }
        Ok(set)
    }

    /// Parse a JSON argument: either a string or an array of strings.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDay`] when the value has another
    /// shape or names an unknown day.
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        match value {
            Value::String(day) => Self::parse(day),
            Value::Array(items) => {
                let names = items
                    .iter()
                    .map(|item| {
                        item.as_str()
                            .ok_or_else(|| ValidationError::InvalidDay(item.to_string()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Self::parse_all(names)
            }
            other => Err(ValidationError::InvalidDay(other.to_string())),
        }
    }

    fn insert_name(&mut self, day: &str) -> Result<(), ValidationError> {
        let name = day.trim().to_ascii_lowercase();
        let expanded: Vec<Weekday> = match name.as_str() {
            "weekday" | "weekdays" => WEEKDAYS.to_vec(),
            "weekend" | "weekends" => WEEKEND.to_vec(),
            _ => vec![
                name.parse::<Weekday>()
                    .map_err(|_| ValidationError::InvalidDay(day.to_string()))?,
            ],
        };
        self.days
            .extend(expanded.into_iter().map(|d| d.num_days_from_monday()));
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, day: Weekday) -> bool {
        self.days.contains(&day.num_days_from_monday())
    }

    /// Whether the day of `at` is in the set.
    #[must_use]
    pub fn matches(&self, at: WallClock) -> bool {
        self.contains(at.weekday())
    }
}

impl fmt::Display for DaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .days
            .iter()
            .filter_map(|n| u8::try_from(*n).ok())
            .filter_map(|n| Weekday::try_from(n).ok())
            .map(|d| day_name(d).to_string())
            .collect();
        f.write_str(&names.join(","))
    }
}

/// Lower-case English name of a weekday (`"tuesday"`).
#[must_use]
pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}
