//! Typed failures surfaced by scheduling operations.

use crate::config::ConfigError;
use crate::model::EntityRef;
use crate::repo::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Errors from scheduling operations.
///
/// Every variant is raised before commit, so a failed operation leaves no
/// partial position state behind.
#[derive(Debug)]
pub enum ScheduleError {
    /// Entity ID does not resolve.
    NotFound(EntityRef),
    /// Request is not valid for the entity's current state.
    InvalidState(String),
    /// Store reported contention; the whole operation may be retried.
    ConcurrencyConflict(StoreError),
    /// Store read/write/commit failed; nothing was persisted.
    Persistence(StoreError),
    /// Density or single-holder check failed after the mutation.
    InvariantViolation(String),
    InvalidConfig(ConfigError),
}

impl ScheduleError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict(_))
    }

    /// Stable code for `error_code=` log fields.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidState(_) => "invalid_state",
            Self::ConcurrencyConflict(_) => "concurrency_conflict",
            Self::Persistence(_) => "persistence_failure",
            Self::InvariantViolation(_) => "invariant_violation",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }
}

impl Display for ScheduleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(entity) => write!(f, "{entity} not found"),
            Self::InvalidState(message) => write!(f, "invalid state: {message}"),
            Self::ConcurrencyConflict(err) => write!(f, "concurrent modification: {err}"),
            Self::Persistence(err) => write!(f, "persistence failure: {err}"),
            Self::InvariantViolation(message) => write!(f, "invariant violated: {message}"),
            Self::InvalidConfig(err) => write!(f, "invalid config: {err}"),
        }
    }
}

impl Error for ScheduleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ConcurrencyConflict(err) | Self::Persistence(err) => Some(err),
            Self::InvalidConfig(err) => Some(err),
            Self::NotFound(_) | Self::InvalidState(_) | Self::InvariantViolation(_) => None,
        }
    }
}

impl From<StoreError> for ScheduleError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(entity) => Self::NotFound(entity),
            StoreError::Conflict(_) => Self::ConcurrencyConflict(value),
            StoreError::ItemValidation(err) => Self::InvalidState(err.to_string()),
            StoreError::TaskValidation(err) => Self::InvalidState(err.to_string()),
            other => Self::Persistence(other),
        }
    }
}

impl From<ConfigError> for ScheduleError {
    fn from(value: ConfigError) -> Self {
        Self::InvalidConfig(value)
    }
}
