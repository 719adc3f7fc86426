//! Common error types used across the workspace.
//!
//! Each failure class has its own typed enum and converts into
//! [`TripwireError`] via `#[from]`. Configuration mistakes are
//! [`ValidationError`]s and are raised while a scenario is being declared,
//! never later when a stimulus arrives.

/// Top-level error returned by the runtime.
#[derive(Debug, thiserror::Error)]
pub enum TripwireError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// A `then` callback failed while a scenario was being asserted.
    #[error("callback failed in scenario {scenario:?}")]
    Callback {
        scenario: String,
        #[source]
        source: anyhow::Error,
    },

    /// A scenario handle outlived the runtime that created it.
    #[error("the runtime owning this scenario has been dropped")]
    RuntimeDropped,
}

/// Declaration-time configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("scenario description must not be empty")]
    EmptyName,

    #[error("a scenario named {0:?} already exists")]
    DuplicateScenario(String),

    #[error("invalid scenario options")]
    InvalidOptions(#[source] serde_json::Error),

    #[error("invalid duration {0:?}")]
    InvalidDuration(String),

    #[error("invalid time of day {0:?}, expected HH:MM")]
    InvalidTimeOfDay(String),

    #[error("invalid day {0:?}")]
    InvalidDay(String),

    #[error("invalid pattern")]
    InvalidPattern(#[from] regex::Error),

    #[error("invalid arguments for {name:?}: {reason}")]
    InvalidArguments { name: String, reason: &'static str },

    #[error("unknown {kind} {name:?}")]
    UnknownVocabulary { kind: VocabularyKind, name: String },

    #[error("{kind} {name:?} is contributed by more than one component")]
    VocabularyCollision { kind: VocabularyKind, name: String },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::InvalidArguments`].
    #[must_use]
    pub fn arguments(name: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidArguments {
            name: name.into(),
            reason,
        }
    }
}

/// Which vocabulary a name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VocabularyKind {
    Trigger,
    Constraint,
}

impl std::fmt::Display for VocabularyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trigger => f.write_str("trigger"),
            Self::Constraint => f.write_str("constraint"),
        }
    }
}

/// A lookup by name found nothing.
#[derive(Debug, thiserror::Error)]
#[error("{entity} {id:?} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}
