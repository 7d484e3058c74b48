//! Item domain model.
//!
//! # Responsibility
//! - Define the task template that owns a sequence of occurrences.
//! - Validate item-local invariants before persistence.
//!
//! # Invariants
//! - A completed item never holds a backlog position.
//! - `cadence_days` is at least one day.
//! - Whether an incomplete item holds a position depends on its live task;
//!   see `lifecycle::check_single_holder`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for an item.
pub type ItemId = Uuid;

/// Default spacing between recurring occurrences.
pub const DEFAULT_CADENCE_DAYS: u32 = 7;

/// Task template/group. Owns its `ItemTask` rows (delete cascades).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub description: String,
    /// Completing a task of a recurring item spawns a successor task.
    pub recurring: bool,
    /// Days between recurring due dates. Ignored for one-off items.
    pub cadence_days: u32,
    /// Terminal flag; completed items leave every position group.
    pub completed: bool,
    /// Dense backlog position within the `(recurring)` group.
    pub position: Option<i64>,
}

/// Validation failures for `Item`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemValidationError {
    BlankDescription,
    ZeroCadence,
    NegativePosition(i64),
    CompletedWithPosition(i64),
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankDescription => write!(f, "item description must not be blank"),
            Self::ZeroCadence => write!(f, "item cadence must be at least one day"),
            Self::NegativePosition(position) => {
                write!(f, "item position must not be negative, got {position}")
            }
            Self::CompletedWithPosition(position) => {
                write!(f, "completed item must not hold position {position}")
            }
        }
    }
}

impl Error for ItemValidationError {}

impl Item {
    /// Creates an incomplete, unpositioned item with a generated ID.
    pub fn new(description: impl Into<String>, recurring: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            recurring,
            cadence_days: DEFAULT_CADENCE_DAYS,
            completed: false,
            position: None,
        }
    }

    pub fn with_cadence(mut self, cadence_days: u32) -> Self {
        self.cadence_days = cadence_days;
        self
    }

    /// Checks invariants that do not depend on the item's tasks.
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        if self.description.trim().is_empty() {
            return Err(ItemValidationError::BlankDescription);
        }
        if self.cadence_days == 0 {
            return Err(ItemValidationError::ZeroCadence);
        }
        match self.position {
            Some(position) if position < 0 => Err(ItemValidationError::NegativePosition(position)),
            Some(position) if self.completed => {
                Err(ItemValidationError::CompletedWithPosition(position))
            }
            _ => Ok(()),
        }
    }
}
