//! Occurrence lifecycle: transitions, recurrence, and expiry.
//!
//! # Responsibility
//! - Move tasks between uncommitted, committed, and completed states.
//! - Keep every touched position group dense and record which ones changed.
//! - Verify density and single-holder rules before a caller commits.
//!
//! # Invariants
//! - For an item with a live task, exactly one of {item, task} holds a
//!   position, decided by whether the task is committed.

pub mod expiry;
pub mod recurrence;
pub mod transitions;

use crate::error::{ScheduleError, ScheduleResult};
use crate::model::item::{Item, ItemId};
use crate::model::item_task::{ItemTask, TaskState};
use crate::ordering::group::GroupKey;
use crate::ordering::position::is_dense;
use crate::repo::store::Store;
use std::collections::BTreeSet;

/// Position groups touched by one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AffectedGroups(BTreeSet<GroupKey>);

impl AffectedGroups {
    pub fn insert(&mut self, group: GroupKey) {
        self.0.insert(group);
    }

    pub fn contains(&self, group: &GroupKey) -> bool {
        self.0.contains(group)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GroupKey> {
        self.0.iter()
    }
}

/// Checks that each affected group is still a dense permutation.
pub fn verify_groups<S: Store>(store: &S, affected: &AffectedGroups) -> ScheduleResult<()> {
    for group in affected.iter() {
        let positions = store.group_positions(*group)?;
        if !is_dense(&positions) {
            return Err(ScheduleError::InvariantViolation(format!(
                "group {group} has non-dense positions {positions:?}"
            )));
        }
    }
    Ok(())
}

/// Checks the single-holder rule for one item and all of its tasks.
pub fn check_single_holder(item: &Item, tasks: &[ItemTask]) -> Result<(), String> {
    let live: Vec<&ItemTask> = tasks.iter().filter(|task| !task.is_completed()).collect();

    if item.completed {
        if let Some(task) = live.first() {
            return Err(format!(
                "completed item {} still has live task {}",
                item.id, task.id
            ));
        }
        return Ok(());
    }

    for task in live {
        let task_holds = task.position.is_some();
        let item_holds = item.position.is_some();
        let expected_item_holds = task.state() == TaskState::Uncommitted;
        if task_holds == item_holds || item_holds != expected_item_holds {
            return Err(format!(
                "item {} (position {:?}) and task {} (committed {:?}, position {:?}) must have exactly one position holder",
                item.id, item.position, task.id, task.committed_date, task.position
            ));
        }
    }
    Ok(())
}

/// Reloads the item and its tasks and applies `check_single_holder`.
///
/// A deleted item passes trivially.
pub fn verify_item<S: Store>(store: &S, item_id: ItemId) -> ScheduleResult<()> {
    let Some(item) = store.get_item(item_id)? else {
        return Ok(());
    };
    let tasks = store.list_item_tasks(item_id)?;
    check_single_holder(&item, &tasks).map_err(ScheduleError::InvariantViolation)
}

#[cfg(test)]
mod tests {
    use super::{check_single_holder, AffectedGroups};
    use crate::model::item::Item;
    use crate::model::item_task::ItemTask;
    use crate::ordering::group::GroupKey;
    use chrono::{NaiveDate, Utc};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    #[test]
    fn uncommitted_task_requires_item_position() {
        let mut item = Item::new("journal", true);
        let task = ItemTask::for_item(&item);
        assert!(check_single_holder(&item, &[task.clone()]).is_err());

        item.position = Some(0);
        assert!(check_single_holder(&item, &[task]).is_ok());
    }

    #[test]
    fn committed_task_forbids_item_position() {
        let mut item = Item::new("journal", true);
        let mut task = ItemTask::for_item(&item);
        task.committed_date = Some(day());
        task.position = Some(3);
        assert!(check_single_holder(&item, &[task.clone()]).is_ok());

        item.position = Some(0);
        assert!(check_single_holder(&item, &[task]).is_err());
    }

    #[test]
    fn completed_tasks_are_ignored_and_completed_items_have_no_live_tasks() {
        let mut item = Item::new("passport", false);
        let mut task = ItemTask::for_item(&item);
        task.completion_date = Some(Utc::now());
        item.completed = true;
        assert!(check_single_holder(&item, &[task.clone()]).is_ok());

        task.completion_date = None;
        assert!(check_single_holder(&item, &[task]).is_err());
    }

    #[test]
    fn affected_groups_deduplicate() {
        let mut affected = AffectedGroups::default();
        affected.insert(GroupKey::Day(day()));
        affected.insert(GroupKey::Day(day()));
        affected.insert(GroupKey::backlog(false));
        assert_eq!(affected.iter().count(), 2);
        assert!(affected.contains(&GroupKey::backlog(false)));
    }
}
