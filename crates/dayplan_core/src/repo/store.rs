//! Store contract consumed by the scheduling core.
//!
//! # Responsibility
//! - Define lookup, write, and bulk position-shift primitives.
//! - Define the transaction boundary every public operation runs inside.
//!
//! # Invariants
//! - Write paths validate entities before mutating storage.
//! - `shift_positions` is equivalent to patching every matching live row.
//! - Everything executed inside `atomically` commits or rolls back as a unit.

use crate::db::DbError;
use crate::model::item::{Item, ItemId, ItemValidationError};
use crate::model::item_task::{ItemTask, TaskId, TaskValidationError};
use crate::model::{EntityRef, Occurrence};
use crate::ordering::group::GroupKey;
use crate::ordering::position::PositionShift;
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Another writer holds the data; the operation may be retried.
    Conflict(DbError),
    /// Target row does not exist.
    NotFound(EntityRef),
    /// Item rejected by validation before write.
    ItemValidation(ItemValidationError),
    /// Task rejected by validation before write.
    TaskValidation(TaskValidationError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid domain value.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Conflict(err) => write!(f, "store conflict: {err}"),
            Self::NotFound(entity) => write!(f, "{entity} not found"),
            Self::ItemValidation(err) => write!(f, "{err}"),
            Self::TaskValidation(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "store requires table `{table}`"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) | Self::Conflict(err) => Some(err),
            Self::ItemValidation(err) => Some(err),
            Self::TaskValidation(err) => Some(err),
            Self::NotFound(_)
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        if value.is_busy() {
            Self::Conflict(value)
        } else {
            Self::Db(value)
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        DbError::Sqlite(value).into()
    }
}

impl From<ItemValidationError> for StoreError {
    fn from(value: ItemValidationError) -> Self {
        Self::ItemValidation(value)
    }
}

impl From<TaskValidationError> for StoreError {
    fn from(value: TaskValidationError) -> Self {
        Self::TaskValidation(value)
    }
}

/// Commitment-date predicate for occurrence queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitmentFilter {
    #[default]
    Any,
    /// Committed strictly before the date.
    CommittedBefore(NaiveDate),
    /// Committed within `from..until`.
    CommittedBetween { from: NaiveDate, until: NaiveDate },
    /// Uncommitted, or committed on/after the date.
    UncommittedOrFrom(NaiveDate),
}

/// Result ordering for occurrence queries. Ties break on task ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OccurrenceOrder {
    /// Committed date, then position within the day.
    #[default]
    CommittedDateThenPosition,
    /// Due date (absent first), then the owning item's backlog position.
    DueDateThenItemPosition,
}

/// Query options for listing occurrences with their owning items.
#[derive(Debug, Clone, Default)]
pub struct OccurrenceQuery {
    pub recurring: Option<bool>,
    pub include_completed: bool,
    pub commitment: CommitmentFilter,
    pub order: OccurrenceOrder,
}

/// Persistence contract for items and item tasks.
pub trait Store {
    /// Runs `op` as one atomic unit: commit on `Ok`, rollback on `Err`.
    ///
    /// Calls must not nest.
    fn atomically<T, E, F>(&self, op: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<StoreError>;

    fn get_item(&self, id: ItemId) -> StoreResult<Option<Item>>;
    fn get_task(&self, id: TaskId) -> StoreResult<Option<ItemTask>>;
    /// Lists every task of one item, completed ones included.
    fn list_item_tasks(&self, item_id: ItemId) -> StoreResult<Vec<ItemTask>>;
    fn find_occurrences(&self, query: &OccurrenceQuery) -> StoreResult<Vec<Occurrence>>;

    /// Highest position held in `group`, or `None` when the group is empty.
    fn max_position(&self, group: GroupKey) -> StoreResult<Option<i64>>;
    /// Positions held in `group`, ascending.
    fn group_positions(&self, group: GroupKey) -> StoreResult<Vec<i64>>;

    fn insert_item(&self, item: &Item) -> StoreResult<()>;
    fn insert_task(&self, task: &ItemTask) -> StoreResult<()>;
    fn update_item(&self, item: &Item) -> StoreResult<()>;
    fn update_task(&self, task: &ItemTask) -> StoreResult<()>;
    /// Deletes the item and, by cascade, all of its tasks.
    fn delete_item(&self, id: ItemId) -> StoreResult<()>;

    /// Applies a bulk position patch; returns the number of rows changed.
    fn shift_positions(&self, shift: &PositionShift) -> StoreResult<usize>;
}
