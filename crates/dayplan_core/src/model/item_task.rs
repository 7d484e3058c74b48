//! Item task (occurrence) domain model.
//!
//! # Responsibility
//! - Define one concrete occurrence of an `Item`.
//! - Derive the lifecycle state from persisted fields.
//!
//! # Invariants
//! - `position` is set iff the task is incomplete and committed to a date.
//! - A task references exactly one item for its whole lifetime.

use crate::model::item::{Item, ItemId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for an item task.
pub type TaskId = Uuid;

/// One occurrence of an item, optionally committed to a calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTask {
    pub id: TaskId,
    /// Owning item. Traversal only; the item owns the task, not vice versa.
    pub item_id: ItemId,
    /// Snapshot of the item description, editable per occurrence.
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub committed_date: Option<NaiveDate>,
    pub completion_date: Option<DateTime<Utc>>,
    /// Dense position within the committed date's group.
    pub position: Option<i64>,
}

/// Derived lifecycle state of an `ItemTask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// No committed date; the owning item holds the backlog position.
    Uncommitted,
    /// Committed to a date; the task holds a position in that day's group.
    Committed(NaiveDate),
    /// Terminal for this occurrence.
    Completed,
}

/// Validation failures for `ItemTask`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    NegativePosition(i64),
    PositionWithoutCommitment(i64),
    CompletedWithPosition(i64),
    CommittedWithoutPosition(NaiveDate),
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NegativePosition(position) => {
                write!(f, "task position must not be negative, got {position}")
            }
            Self::PositionWithoutCommitment(position) => {
                write!(f, "uncommitted task must not hold position {position}")
            }
            Self::CompletedWithPosition(position) => {
                write!(f, "completed task must not hold position {position}")
            }
            Self::CommittedWithoutPosition(date) => {
                write!(f, "task committed to {date} must hold a position")
            }
        }
    }
}

impl Error for TaskValidationError {}

impl ItemTask {
    /// Creates an uncommitted task for `item`, snapshotting its description.
    pub fn for_item(item: &Item) -> Self {
        Self {
            id: Uuid::new_v4(),
            item_id: item.id,
            description: item.description.clone(),
            due_date: None,
            committed_date: None,
            completion_date: None,
            position: None,
        }
    }

    pub fn state(&self) -> TaskState {
        match (self.completion_date, self.committed_date) {
            (Some(_), _) => TaskState::Completed,
            (None, Some(date)) => TaskState::Committed(date),
            (None, None) => TaskState::Uncommitted,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completion_date.is_some()
    }

    /// Checks the position-ownership invariant for this task alone.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        match (self.state(), self.position) {
            (_, Some(position)) if position < 0 => {
                Err(TaskValidationError::NegativePosition(position))
            }
            (TaskState::Completed, Some(position)) => {
                Err(TaskValidationError::CompletedWithPosition(position))
            }
            (TaskState::Uncommitted, Some(position)) => {
                Err(TaskValidationError::PositionWithoutCommitment(position))
            }
            (TaskState::Committed(date), None) => {
                Err(TaskValidationError::CommittedWithoutPosition(date))
            }
            _ => Ok(()),
        }
    }
}
