//! Successor generation for recurring items.
//!
//! The next due date is the completed task's due date advanced by the item's
//! cadence, stepped forward until it is not in the past. A task without a due
//! date yields an undated successor.

use crate::model::item::Item;
use crate::model::item_task::ItemTask;
use chrono::{Days, NaiveDate};

/// Computes the successor's due date, or `None` for an undated successor.
pub fn next_due_date(item: &Item, completed: &ItemTask, today: NaiveDate) -> Option<NaiveDate> {
    let due = completed.due_date?;
    let cadence = i64::from(item.cadence_days.max(1));
    let mut steps = 1;

    let lag = (today - due).num_days();
    if lag > cadence {
        // ceil(lag / cadence) steps land on or after today.
        steps = (lag + cadence - 1) / cadence;
    }

    let offset = u64::try_from(steps * cadence).ok()?;
    due.checked_add_days(Days::new(offset))
}

/// Builds the unplaced successor of `completed`.
///
/// The successor snapshots the item's current description; positions and
/// the committed date are assigned when it is placed.
pub fn spawn_successor(item: &Item, completed: &ItemTask, today: NaiveDate) -> ItemTask {
    let mut successor = ItemTask::for_item(item);
    successor.due_date = next_due_date(item, completed, today);
    successor
}
