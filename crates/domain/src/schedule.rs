//! Schedule descriptors parsed from informal duration strings.
//!
//! The grammar is `<count>? <unit>s?` where `unit` is one of `second`,
//! `minute` or `hour` (case-insensitive). The count defaults to 1 and the
//! unit defaults to `second`, so `"minute"`, `"1 minute"` and `"1 minutes"`
//! are the same schedule and `"30"` means every thirty seconds.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use chrono::Timelike;
use regex::Regex;

use crate::error::ValidationError;
use crate::time::WallClock;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+)?\s*(?:(second|minute|hour)s?)?$").expect("duration pattern is valid")
});

/// Unit of a periodic schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Second,
    Minute,
    Hour,
}

impl Unit {
    #[must_use]
    pub fn seconds(self) -> u64 {
        match self {
            Self::Second => 1,
            Self::Minute => 60,
            Self::Hour => 3600,
        }
    }

    /// Largest step that still fits the unit's cron field.
    #[must_use]
    pub fn max_step(self) -> u32 {
        match self {
            Self::Second | Self::Minute => 59,
            Self::Hour => 23,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Second => f.write_str("second"),
            Self::Minute => f.write_str("minute"),
            Self::Hour => f.write_str("hour"),
        }
    }
}

/// Split a duration string into `(count, unit)` without range checks.
fn split(input: &str) -> Result<(u32, Unit), ValidationError> {
    let invalid = || ValidationError::InvalidDuration(input.to_string());
    let trimmed = input.trim();
    let caps = DURATION_RE.captures(trimmed).ok_or_else(invalid)?;
    let (count, unit) = (caps.get(1), caps.get(2));
    if count.is_none() && unit.is_none() {
        return Err(invalid());
    }
    let count = match count {
        Some(m) => m.as_str().parse::<u32>().map_err(|_| invalid())?,
        None => 1,
    };
    if count == 0 {
        return Err(invalid());
    }
    let unit = match unit.map(|m| m.as_str().to_ascii_lowercase()).as_deref() {
        None | Some("second") => Unit::Second,
        Some("minute") => Unit::Minute,
        Some("hour") => Unit::Hour,
        Some(_) => return Err(invalid()),
    };
    Ok((count, unit))
}

/// Parse a duration string into a [`Duration`] (used for debounce windows
/// and variable lifetimes, where no cron field limit applies).
///
/// # Errors
///
/// Returns [`ValidationError::InvalidDuration`] when the string does not
/// follow the grammar or the count is zero.
pub fn parse_duration(input: &str) -> Result<Duration, ValidationError> {
    let (count, unit) = split(input)?;
    Ok(Duration::from_secs(u64::from(count) * unit.seconds()))
}

/// A periodic schedule: fire every `count` units.
///
/// A count that fits the unit's cron field (see [`Unit::max_step`]) aligns
/// to wall-clock boundaries the way a cron step expression does. Longer
/// counts fire every whole period counted from the Unix epoch of the wall
/// clock, so `"90 seconds"` fires at `00:00:00`, `00:01:30`, `00:03:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Schedule {
    count: u32,
    unit: Unit,
}

impl Schedule {
    /// Build a schedule directly.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDuration`] when `count` is zero.
    pub fn every(count: u32, unit: Unit) -> Result<Self, ValidationError> {
        if count == 0 {
            return Err(ValidationError::InvalidDuration(format!("{count} {unit}")));
        }
        Ok(Self { count, unit })
    }

    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[must_use]
    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// Nominal period between two firings.
    #[must_use]
    pub fn period(&self) -> Duration {
        Duration::from_secs(u64::from(self.count) * self.unit.seconds())
    }

    /// Whether the count fits the unit's cron field.
    #[must_use]
    pub fn is_field_aligned(&self) -> bool {
        self.count <= self.unit.max_step()
    }

    /// Six-field cron expression (`sec min hour dom month dow`), or
    /// `@every <seconds>s` for counts that overflow the field.
    #[must_use]
    pub fn expression(&self) -> String {
        let n = self.count;
        if !self.is_field_aligned() {
            return format!("@every {}s", self.period().as_secs());
        }
        match self.unit {
            Unit::Second => format!("*/{n} * * * * *"),
            Unit::Minute => format!("0 */{n} * * * *"),
            Unit::Hour => format!("0 0 */{n} * * *"),
        }
    }

    /// Whether the schedule fires during the second containing `at`.
    #[must_use]
    pub fn is_due(&self, at: WallClock) -> bool {
        let n = self.count;
        if !self.is_field_aligned() {
            let period = i64::try_from(self.period().as_secs()).unwrap_or(i64::MAX);
            return at.and_utc().timestamp().rem_euclid(period) == 0;
        }
        match self.unit {
            Unit::Second => at.second() % n == 0,
            Unit::Minute => at.second() == 0 && at.minute() % n == 0,
            Unit::Hour => at.second() == 0 && at.minute() == 0 && at.hour() % n == 0,
        }
    }
}

impl FromStr for Schedule {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (count, unit) = split(s)?;
        Ok(Self { count, unit })
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 1 {
            write!(f, "every {}", self.unit)
        } else {
            write!(f, "every {} {}s", self.count, self.unit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32, second: u32) -> WallClock {
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap()
    }

    #[test]
    fn should_parse_two_seconds_into_two_second_step() {
        let schedule: Schedule = "2 seconds".parse().unwrap();
        assert_eq!(schedule.expression(), "*/2 * * * * *");
        assert_eq!(schedule.period(), Duration::from_secs(2));
        assert!(schedule.is_due(at(10, 0, 4)));
        assert!(!schedule.is_due(at(10, 0, 5)));
    }

    #[test]
    fn should_treat_minute_and_one_minute_as_equivalent() {
        let a: Schedule = "1 minute".parse().unwrap();
        let b: Schedule = "minute".parse().unwrap();
        let c: Schedule = "1 Minutes".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.expression(), "0 */1 * * * *");
    }

    #[test]
    fn should_default_unit_to_seconds() {
        let schedule: Schedule = "30".parse().unwrap();
        assert_eq!(schedule.unit(), Unit::Second);
        assert_eq!(schedule.count(), 30);
    }

    #[test]
    fn should_align_hourly_schedules_to_the_top_of_the_hour() {
        let schedule: Schedule = "3 hours".parse().unwrap();
        assert_eq!(schedule.expression(), "0 0 */3 * * *");
        assert!(schedule.is_due(at(6, 0, 0)));
        assert!(!schedule.is_due(at(6, 0, 1)));
        assert!(!schedule.is_due(at(7, 0, 0)));
    }

    #[test]
    fn should_reject_unparsable_strings() {
        for input in ["abc", "", "   ", "0 seconds", "2 days", "-1 second"] {
            assert!(input.parse::<Schedule>().is_err(), "{input:?} should fail");
        }
    }

    #[test]
    fn should_fall_back_to_elapsed_periods_when_count_overflows_the_field() {
        let schedule: Schedule = "90 seconds".parse().unwrap();
        assert!(!schedule.is_field_aligned());
        assert_eq!(schedule.expression(), "@every 90s");
        assert_eq!(schedule.period(), Duration::from_secs(90));
        assert!(schedule.is_due(at(0, 0, 0)));
        assert!(schedule.is_due(at(0, 1, 30)));
        assert!(schedule.is_due(at(0, 3, 0)));
        assert!(!schedule.is_due(at(0, 1, 0)));
        assert!(!schedule.is_due(at(0, 1, 31)));
    }

    #[test]
    fn should_accept_hour_counts_longer_than_a_day() {
        let schedule: Schedule = "30 hours".parse().unwrap();
        assert_eq!(schedule.expression(), "@every 108000s");
        // 2026-10-16T00:00 is 20742 days after the epoch; 20742 * 24 = 497808
        // hours, and 497808 = 30 * 16593 + 18, so the next firing is 12:00.
        assert!(!schedule.is_due(at(0, 0, 0)));
        assert!(schedule.is_due(at(12, 0, 0)));
        assert!(!schedule.is_due(at(12, 0, 1)));
    }

    #[test]
    fn should_parse_long_durations_without_field_limit() {
        assert_eq!(parse_duration("90 seconds").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("2 hours").unwrap(), Duration::from_secs(7200));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn should_display_schedule() {
        assert_eq!("minute".parse::<Schedule>().unwrap().to_string(), "every minute");
        assert_eq!(
            "5 minutes".parse::<Schedule>().unwrap().to_string(),
            "every 5 minutes"
        );
    }
}
