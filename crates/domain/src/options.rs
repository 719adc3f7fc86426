//! Scenario options — `suppress_for` debounce window and `only` isolation.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ValidationError;
use crate::schedule::parse_duration;

/// Options accepted when creating a scenario.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioOptions {
    /// After a run, ignore further asserts until this much time has passed.
    pub suppress_for: Option<Duration>,
    /// Create the scenario in test mode.
    pub only: bool,
}

/// A debounce window written either as milliseconds or as a duration string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawWindow {
    Millis(u64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOptions {
    #[serde(default, alias = "suppressFor")]
    suppress_for: Option<RawWindow>,
    #[serde(default)]
    only: bool,
}

impl ScenarioOptions {
    /// Validate a loosely typed options object.
    ///
    /// Recognises exactly `suppress_for` (alias `suppressFor`) and `only`;
    /// `null` means "no options".
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidOptions`] for unknown keys or
    /// mistyped values, and [`ValidationError::InvalidDuration`] for an
    /// unparsable window.
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        let raw: RawOptions =
            serde_json::from_value(value.clone()).map_err(ValidationError::InvalidOptions)?;
        let suppress_for = match raw.suppress_for {
            None => None,
            Some(RawWindow::Millis(ms)) => Some(Duration::from_millis(ms)),
            Some(RawWindow::Text(text)) => Some(parse_duration(&text)?),
        };
        Ok(Self {
            suppress_for,
            only: raw.only,
        })
    }

    #[must_use]
    pub fn suppress_for(mut self, window: Duration) -> Self {
        self.suppress_for = Some(window);
        self
    }

    #[must_use]
    pub fn only(mut self) -> Self {
        self.only = true;
        self
    }
}
