//! Wall-clock time helpers: timestamps, `HH:MM` times of day and windows.
//!
//! Scenario time is local wall-clock time ([`WallClock`]); the runtime reads
//! it through a clock port so tests can pin it.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, NaiveTime, Timelike};

use crate::error::ValidationError;

/// Local wall-clock date and time, as seen by schedules and constraints.
pub type WallClock = NaiveDateTime;

/// A minute-resolution time of day, written `HH:MM` (24-hour, zero padded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    /// The time of day of a wall-clock instant, truncated to the minute.
    #[must_use]
    pub fn of(at: WallClock) -> Self {
        let time = at.time();
        Self(NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or_default())
    }

    #[must_use]
    pub fn hour(self) -> u32 {
        self.0.hour()
    }

    #[must_use]
    pub fn minute(self) -> u32 {
        self.0.minute()
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidTimeOfDay(s.to_string());
        let bytes = s.as_bytes();
        if bytes.len() != 5 || bytes[2] != b':' {
            return Err(invalid());
        }
        let digits = |range: std::ops::Range<usize>| -> Option<u32> {
            let part = &s[range];
            if part.bytes().all(|b| b.is_ascii_digit()) {
                part.parse().ok()
            } else {
                None
            }
        };
        let hour = digits(0..2).ok_or_else(invalid)?;
        let minute = digits(3..5).ok_or_else(invalid)?;
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// An inclusive `[start, end]` window of times of day.
///
/// Bounds compare as zero-padded `HH:MM`, so a window whose `start` is
/// later than its `end` never contains anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl TimeWindow {
    /// Parse both bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTimeOfDay`] for the first malformed bound.
    pub fn parse(start: &str, end: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            start: start.parse()?,
            end: end.parse()?,
        })
    }

    /// Whether the minute containing `at` lies inside the window.
    #[must_use]
    pub fn contains(&self, at: WallClock) -> bool {
        let now = TimeOfDay::of(at);
        now >= self.start && now <= self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> WallClock {
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(hour, minute, 30)
            .unwrap()
    }

    #[test]
    fn should_parse_zero_padded_time_of_day() {
        let t: TimeOfDay = "07:05".parse().unwrap();
        assert_eq!((t.hour(), t.minute()), (7, 5));
        assert_eq!(t.to_string(), "07:05");
    }

    #[test]
    fn should_reject_malformed_time_of_day() {
        for input in ["7:05", "24:00", "12:60", "12-30", "ab:cd", "", "12:301"] {
            assert!(input.parse::<TimeOfDay>().is_err(), "{input} should fail");
        }
    }

    #[test]
    fn should_include_both_bounds_when_window_is_inclusive() {
        let window = TimeWindow::parse("22:07", "22:08").unwrap();
        assert!(window.contains(at(22, 7)));
        assert!(window.contains(at(22, 8)));
        assert!(!window.contains(at(22, 6)));
        assert!(!window.contains(at(22, 9)));
    }

    #[test]
    fn should_never_match_when_start_is_after_end() {
        let window = TimeWindow::parse("22:00", "06:00").unwrap();
        assert!(!window.contains(at(23, 0)));
        assert!(!window.contains(at(5, 59)));
        assert!(!window.contains(at(22, 0)));
        assert!(!window.contains(at(12, 0)));
    }

    #[test]
    fn should_fail_window_parse_when_a_bound_is_malformed() {
        assert!(matches!(
            TimeWindow::parse("22:07", "2208"),
            Err(ValidationError::InvalidTimeOfDay(bound)) if bound == "2208"
        ));
    }
}
