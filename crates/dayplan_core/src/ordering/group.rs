//! Position group derivation.
//!
//! Items are grouped by their `recurring` flag; tasks by the calendar date
//! they are committed to. Completed entities and uncommitted tasks belong to
//! no group.

use crate::model::item::Item;
use crate::model::item_task::{ItemTask, TaskState};
use chrono::NaiveDate;
use std::fmt::{Display, Formatter};

/// Namespace in which positions are kept dense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    /// Incomplete items with the given `recurring` flag.
    Backlog { recurring: bool },
    /// Incomplete tasks committed to the given date.
    Day(NaiveDate),
}

impl GroupKey {
    pub fn backlog(recurring: bool) -> Self {
        Self::Backlog { recurring }
    }

    /// Returns the group an item belongs to, or `None` once completed.
    pub fn for_item(item: &Item) -> Option<Self> {
        if item.completed {
            return None;
        }
        Some(Self::backlog(item.recurring))
    }

    /// Returns the day group a task belongs to, if it is live and committed.
    pub fn for_task(task: &ItemTask) -> Option<Self> {
        match task.state() {
            TaskState::Committed(date) => Some(Self::Day(date)),
            TaskState::Uncommitted | TaskState::Completed => None,
        }
    }
}

impl Display for GroupKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Backlog { recurring: true } => write!(f, "backlog:recurring"),
            Self::Backlog { recurring: false } => write!(f, "backlog:one_off"),
            Self::Day(date) => write!(f, "day:{date}"),
        }
    }
}
