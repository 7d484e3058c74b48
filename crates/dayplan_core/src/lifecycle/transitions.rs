//! Task lifecycle transitions.
//!
//! # Responsibility
//! - Apply create/commit/uncommit/complete/delete/reorder transitions to an
//!   item and its task.
//! - Close gaps in groups an entity leaves and append it to groups it enters.
//!
//! # Invariants
//! - A row leaving a group is written through before any append query on a
//!   group it might still be counted in.
//! - Final item/task states are persisted by the caller, inside the same
//!   store transaction.

use crate::error::{ScheduleError, ScheduleResult};
use crate::lifecycle::recurrence::spawn_successor;
use crate::lifecycle::AffectedGroups;
use crate::model::item::Item;
use crate::model::item_task::{ItemTask, TaskState};
use crate::ordering::group::GroupKey;
use crate::ordering::position::{close_gap, move_within_group, next_position};
use crate::repo::store::Store;
use chrono::{DateTime, NaiveDate, Utc};

/// Gives a freshly built occurrence its initial position.
///
/// A due date commits the task to that date; otherwise the item enters its
/// backlog group.
pub fn place_new<S: Store>(
    store: &S,
    item: &mut Item,
    task: &mut ItemTask,
    affected: &mut AffectedGroups,
) -> ScheduleResult<()> {
    match task.due_date {
        Some(due) => {
            enter_day(store, task, due, affected)?;
            release_item(store, item, affected)
        }
        None => enter_backlog(store, item, affected),
    }
}

/// Commits `task` to `target`, or returns it to the backlog for `None`.
///
/// Returns `false` without touching anything when the task is already
/// committed to `target`.
pub fn commit_to<S: Store>(
    store: &S,
    item: &mut Item,
    task: &mut ItemTask,
    target: Option<NaiveDate>,
    affected: &mut AffectedGroups,
) -> ScheduleResult<bool> {
    ensure_live(task)?;
    if task.committed_date == target {
        return Ok(false);
    }

    leave_day(store, task, affected)?;

    match target {
        Some(date) => {
            enter_day(store, task, date, affected)?;
            release_item(store, item, affected)?;
        }
        None => {
            task.committed_date = None;
            task.due_date = None;
            task.description = item.description.clone();
            enter_backlog(store, item, affected)?;
        }
    }
    Ok(true)
}

/// Completes `task` and, for recurring items, returns the placed successor.
///
/// The completed task is written through here; the item and the successor
/// are left for the caller to persist.
pub fn complete<S: Store>(
    store: &S,
    item: &mut Item,
    task: &mut ItemTask,
    now: DateTime<Utc>,
    today: NaiveDate,
    affected: &mut AffectedGroups,
) -> ScheduleResult<Option<ItemTask>> {
    ensure_live(task)?;

    leave_day(store, task, affected)?;
    task.completion_date = Some(now);
    store.update_task(task)?;

    if !item.recurring {
        release_item(store, item, affected)?;
        item.completed = true;
        return Ok(None);
    }

    let mut successor = spawn_successor(item, task, today);
    place_new(store, item, &mut successor, affected)?;
    Ok(Some(successor))
}

/// Deletes `item` with its tasks and closes every gap they leave.
pub fn delete_item<S: Store>(
    store: &S,
    item: &Item,
    tasks: &[ItemTask],
    affected: &mut AffectedGroups,
) -> ScheduleResult<()> {
    store.delete_item(item.id)?;

    if let Some(group) = GroupKey::for_item(item) {
        if let Some(shift) = close_gap(group, item.position) {
            store.shift_positions(&shift)?;
            affected.insert(group);
        }
    }

    // Highest first, so each close sees positions not yet shifted by another.
    let mut live_committed: Vec<&ItemTask> = tasks
        .iter()
        .filter(|task| GroupKey::for_task(task).is_some())
        .collect();
    live_committed.sort_by(|a, b| b.position.cmp(&a.position));
    for task in live_committed {
        if let Some(group) = GroupKey::for_task(task) {
            if let Some(shift) = close_gap(group, task.position) {
                store.shift_positions(&shift)?;
            }
            affected.insert(group);
        }
    }
    Ok(())
}

/// Moves `item` to `target` within its backlog group.
pub fn reorder_item<S: Store>(
    store: &S,
    item: &mut Item,
    target: i64,
    affected: &mut AffectedGroups,
) -> ScheduleResult<()> {
    let group = GroupKey::for_item(item).ok_or_else(|| {
        ScheduleError::InvalidState(format!("item {} is completed", item.id))
    })?;
    let current = item.position.ok_or_else(|| {
        ScheduleError::InvalidState(format!(
            "item {} has no backlog position while its task is committed",
            item.id
        ))
    })?;

    move_member(store, group, current, target)?;
    item.position = Some(target);
    affected.insert(group);
    Ok(())
}

/// Moves `task` to `target` within the group of `date`.
pub fn reorder_task<S: Store>(
    store: &S,
    task: &mut ItemTask,
    date: NaiveDate,
    target: i64,
    affected: &mut AffectedGroups,
) -> ScheduleResult<()> {
    let current = match (task.state(), task.position) {
        (TaskState::Committed(committed), Some(position)) if committed == date => position,
        _ => {
            return Err(ScheduleError::InvalidState(format!(
                "item task {} is not a live task committed to {date}",
                task.id
            )));
        }
    };

    let group = GroupKey::Day(date);
    move_member(store, group, current, target)?;
    task.position = Some(target);
    affected.insert(group);
    Ok(())
}

/// Switches the item's `recurring` flag, migrating its backlog position
/// between the two backlog groups when it holds one.
pub fn change_recurring<S: Store>(
    store: &S,
    item: &mut Item,
    recurring: bool,
    affected: &mut AffectedGroups,
) -> ScheduleResult<()> {
    if item.recurring == recurring {
        return Ok(());
    }
    if item.position.is_none() {
        item.recurring = recurring;
        return Ok(());
    }

    release_item(store, item, affected)?;
    item.recurring = recurring;
    enter_backlog(store, item, affected)
}

fn ensure_live(task: &ItemTask) -> ScheduleResult<()> {
    if task.is_completed() {
        return Err(ScheduleError::InvalidState(format!(
            "item task {} is already completed",
            task.id
        )));
    }
    Ok(())
}

fn move_member<S: Store>(store: &S, group: GroupKey, current: i64, target: i64) -> ScheduleResult<()> {
    let size = store.group_positions(group)?.len() as i64;
    if target < 0 || target >= size {
        return Err(ScheduleError::InvalidState(format!(
            "position {target} is outside 0..{size} of group {group}"
        )));
    }
    if let Some(shift) = move_within_group(group, current, target) {
        store.shift_positions(&shift)?;
    }
    Ok(())
}

fn enter_day<S: Store>(
    store: &S,
    task: &mut ItemTask,
    date: NaiveDate,
    affected: &mut AffectedGroups,
) -> ScheduleResult<()> {
    let group = GroupKey::Day(date);
    task.committed_date = Some(date);
    task.position = Some(next_position(store.max_position(group)?));
    affected.insert(group);
    Ok(())
}

fn leave_day<S: Store>(
    store: &S,
    task: &mut ItemTask,
    affected: &mut AffectedGroups,
) -> ScheduleResult<()> {
    if let Some(group) = GroupKey::for_task(task) {
        if let Some(shift) = close_gap(group, task.position) {
            store.shift_positions(&shift)?;
        }
        affected.insert(group);
    }
    task.position = None;
    Ok(())
}

/// Appends the item to its backlog group; a held position is released first,
/// so the item always lands at the end.
fn enter_backlog<S: Store>(
    store: &S,
    item: &mut Item,
    affected: &mut AffectedGroups,
) -> ScheduleResult<()> {
    let group = GroupKey::for_item(item).ok_or_else(|| {
        ScheduleError::InvalidState(format!("item {} is completed", item.id))
    })?;
    release_item(store, item, affected)?;
    item.position = Some(next_position(store.max_position(group)?));
    affected.insert(group);
    Ok(())
}

/// Clears the item's backlog position and closes the gap. The cleared row is
/// persisted first so it no longer counts toward the group's maximum.
fn release_item<S: Store>(
    store: &S,
    item: &mut Item,
    affected: &mut AffectedGroups,
) -> ScheduleResult<()> {
    let Some(position) = item.position else {
        return Ok(());
    };
    item.position = None;

    let Some(group) = GroupKey::for_item(item) else {
        return Ok(());
    };
    store.update_item(item)?;
    if let Some(shift) = close_gap(group, Some(position)) {
        store.shift_positions(&shift)?;
    }
    affected.insert(group);
    Ok(())
}
