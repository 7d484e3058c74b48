//! Rollover of overdue committed tasks onto today.
//!
//! # Invariants
//! - Rolled tasks are appended after today's existing members.
//! - Relative order is preserved: older committed date first, then prior
//!   position within that date.

use crate::error::ScheduleResult;
use crate::lifecycle::AffectedGroups;
use crate::model::item_task::ItemTask;
use crate::ordering::group::GroupKey;
use crate::ordering::position::next_position;
use crate::repo::store::{CommitmentFilter, OccurrenceOrder, OccurrenceQuery, Store};
use chrono::NaiveDate;
use log::debug;

/// Recommits `expired` to `today` at `start, start + 1, ..` in stable order.
///
/// Returns the day groups the tasks left.
pub fn assign_rolled_positions(
    expired: &mut [ItemTask],
    today: NaiveDate,
    start: i64,
) -> Vec<GroupKey> {
    expired.sort_by_key(|task| (task.committed_date, task.position));

    let mut left = Vec::new();
    let mut next = start;
    for task in expired.iter_mut() {
        if let Some(group) = GroupKey::for_task(task) {
            if !left.contains(&group) {
                left.push(group);
            }
        }
        task.committed_date = Some(today);
        task.position = Some(next);
        next += 1;
    }
    left
}

/// Moves every live task committed before `today` into today's group.
///
/// Writes nothing when no task is overdue. Returns the number of rolled tasks.
pub fn roll_expired<S: Store>(
    store: &S,
    today: NaiveDate,
    affected: &mut AffectedGroups,
) -> ScheduleResult<usize> {
    let query = OccurrenceQuery {
        commitment: CommitmentFilter::CommittedBefore(today),
        order: OccurrenceOrder::CommittedDateThenPosition,
        ..OccurrenceQuery::default()
    };
    let mut expired: Vec<ItemTask> = store
        .find_occurrences(&query)?
        .into_iter()
        .map(|occurrence| occurrence.task)
        .collect();
    if expired.is_empty() {
        return Ok(0);
    }

    let today_group = GroupKey::Day(today);
    let start = next_position(store.max_position(today_group)?);
    for group in assign_rolled_positions(&mut expired, today, start) {
        affected.insert(group);
    }
    affected.insert(today_group);

    for task in &expired {
        store.update_task(task)?;
    }

    debug!(
        "event=expiry_roll module=lifecycle status=ok rolled={} first_position={}",
        expired.len(),
        start
    );
    Ok(expired.len())
}
