//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `tripwire.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "tripwire.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tick driver settings.
    pub scheduler: SchedulerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Initial variable values, set before any scenario is declared.
    pub variables: BTreeMap<String, Value>,
    /// Device names; a non-empty list enables the device component.
    pub devices: Vec<String>,
    /// Declarative scenarios.
    #[serde(rename = "scenario")]
    pub scenarios: Vec<ScenarioConfig>,
}

/// Upper bound for `scheduler.max_catch_up_secs`: one day.
pub const MAX_CATCH_UP_LIMIT_SECS: u32 = 86_400;

/// Tick driver configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// How often the driver calls `tick`, in milliseconds.
    pub tick_ms: u64,
    /// Largest clock jump replayed second by second.
    pub max_catch_up_secs: u32,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// One `[[scenario]]` table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    pub description: String,
    /// Loosely typed on purpose: unknown keys are rejected when the
    /// scenario is created, not here.
    #[serde(default)]
    pub options: Value,
    #[serde(default)]
    pub triggers: Vec<Call>,
    #[serde(default, rename = "branch")]
    pub branches: Vec<BranchConfig>,
}

/// A vocabulary call by name: `{ name = "at", args = ["07:30"] }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Call {
    pub name: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// One `[[scenario.branch]]` table. Without `constraints` it is the else
/// branch.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BranchConfig {
    pub constraints: Option<Vec<Call>>,
    /// Emit this topic with the stimulus payload.
    pub emit: Option<String>,
    /// Write a variable.
    pub set: Option<SetAction>,
    /// Log this message at info level.
    pub log: Option<String>,
}

/// `set = { name = "mode", value = "idle", ttl = "10 minutes" }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetAction {
    pub name: String,
    #[serde(default)]
    pub value: Value,
    pub ttl: Option<String>,
}

impl BranchConfig {
    fn has_action(&self) -> bool {
        self.emit.is_some() || self.set.is_some() || self.log.is_some()
    }
}

impl Config {
    /// Load configuration from `tripwire.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file(CONFIG_FILE)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] or [`ConfigError::Parse`].
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("TRIPWIRE_TICK_MS") {
            if let Ok(tick_ms) = val.parse() {
                self.scheduler.tick_ms = tick_ms;
            }
        }
        if let Ok(val) = std::env::var("TRIPWIRE_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    /// Check the values serde cannot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=1000).contains(&self.scheduler.tick_ms) {
            return Err(ConfigError::Validation(
                "scheduler.tick_ms must be between 1 and 1000".to_string(),
            ));
        }
        if self.scheduler.max_catch_up_secs > MAX_CATCH_UP_LIMIT_SECS {
            return Err(ConfigError::Validation(format!(
                "scheduler.max_catch_up_secs must be at most {MAX_CATCH_UP_LIMIT_SECS}"
            )));
        }
        for scenario in &self.scenarios {
            if let Some(index) = scenario.branches.iter().position(|b| !b.has_action()) {
                return Err(ConfigError::Validation(format!(
                    "branch {index} of scenario {:?} has no action",
                    scenario.description
                )));
            }
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_ms: 1000,
            max_catch_up_secs: 300,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "tripwired=info,tripwire=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
