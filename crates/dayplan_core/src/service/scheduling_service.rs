//! Scheduling use-case service.
//!
//! # Responsibility
//! - Expose create/get/update/delete/complete/commit/reorder/list operations.
//! - Own the transaction boundary: each mutating call is one `Store::atomically`.
//! - Log one metadata-only event per operation.
//!
//! # Invariants
//! - Affected groups are re-read and verified dense before commit.
//! - The touched item satisfies the single-holder rule before commit.
//! - Failed operations leave no partial position state behind.

use crate::clock::{Clock, SystemClock};
use crate::config::{check_horizon, SchedulerConfig};
use crate::error::{ScheduleError, ScheduleResult};
use crate::lifecycle::expiry::roll_expired;
use crate::lifecycle::{transitions, verify_groups, verify_item, AffectedGroups};
use crate::model::item::{Item, ItemId, DEFAULT_CADENCE_DAYS};
use crate::model::item_task::{ItemTask, TaskId};
use crate::model::{EntityRef, Occurrence};
use crate::repo::store::{CommitmentFilter, OccurrenceOrder, OccurrenceQuery, Store};
use chrono::{Days, NaiveDate};
use log::{info, warn};
use std::collections::BTreeMap;
use std::time::Instant;

/// Request model for creating an item together with its first occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOccurrence {
    pub description: String,
    pub recurring: bool,
    pub cadence_days: u32,
    /// Commits the occurrence to this date on creation.
    pub due_date: Option<NaiveDate>,
}

impl NewOccurrence {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            recurring: false,
            cadence_days: DEFAULT_CADENCE_DAYS,
            due_date: None,
        }
    }

    pub fn recurring(mut self, cadence_days: u32) -> Self {
        self.recurring = true;
        self.cadence_days = cadence_days;
        self
    }

    pub fn due_on(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }
}

/// Partial update of an occurrence and its item. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OccurrencePatch {
    pub description: Option<String>,
    pub item_description: Option<String>,
    /// `Some(None)` clears the due date and returns the task to the backlog.
    pub due_date: Option<Option<NaiveDate>>,
    pub recurring: Option<bool>,
    pub cadence_days: Option<u32>,
}

/// Result of completing an occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionOutcome {
    pub completed: Occurrence,
    /// Next occurrence of a recurring item.
    pub successor: Option<ItemTask>,
}

/// Scheduling service facade over a store implementation.
pub struct SchedulingService<S: Store, C: Clock = SystemClock> {
    store: S,
    clock: C,
    config: SchedulerConfig,
}

impl<S: Store> SchedulingService<S, SystemClock> {
    /// Creates a service on wall-clock time.
    pub fn try_new(store: S, config: SchedulerConfig) -> ScheduleResult<Self> {
        Self::try_with_clock(store, config, SystemClock)
    }
}

impl<S: Store, C: Clock> SchedulingService<S, C> {
    /// Creates a service with an explicit time source.
    pub fn try_with_clock(store: S, config: SchedulerConfig, clock: C) -> ScheduleResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Creates an item and its first occurrence.
    ///
    /// # Contract
    /// - With a due date the task is committed to it and takes the next
    ///   position of that day; the item holds no position.
    /// - Without one the task is uncommitted and the item takes the next
    ///   position of its backlog group.
    pub fn create_occurrence(&self, request: NewOccurrence) -> ScheduleResult<Occurrence> {
        let description = normalize_description(request.description)?;
        self.run("occurrence_create", |store| {
            let mut item =
                Item::new(description.as_str(), request.recurring).with_cadence(request.cadence_days);
            let mut task = ItemTask::for_item(&item);
            task.due_date = request.due_date;

            let mut affected = AffectedGroups::default();
            transitions::place_new(store, &mut item, &mut task, &mut affected)?;
            store.insert_item(&item)?;
            store.insert_task(&task)?;

            self.verify(store, &affected, item.id)?;
            Ok(Occurrence { task, item })
        })
    }

    /// Gets one occurrence with its owning item.
    pub fn get_occurrence(&self, task_id: TaskId) -> ScheduleResult<Occurrence> {
        load_occurrence(&self.store, task_id)
    }

    /// Applies `patch`; a due-date change recommits or uncommits the task.
    pub fn update_occurrence(
        &self,
        task_id: TaskId,
        patch: OccurrencePatch,
    ) -> ScheduleResult<Occurrence> {
        let description = patch.description.map(normalize_description).transpose()?;
        let item_description = patch
            .item_description
            .map(normalize_description)
            .transpose()?;

        self.run("occurrence_update", |store| {
            let Occurrence { mut task, mut item } = load_occurrence(store, task_id)?;
            if task.is_completed() {
                return Err(ScheduleError::InvalidState(format!(
                    "item task {task_id} is already completed"
                )));
            }

            let mut affected = AffectedGroups::default();
            if let Some(value) = item_description {
                item.description = value;
            }
            if let Some(cadence_days) = patch.cadence_days {
                item.cadence_days = cadence_days;
            }
            if let Some(recurring) = patch.recurring {
                transitions::change_recurring(store, &mut item, recurring, &mut affected)?;
            }
            if let Some(due_date) = patch.due_date {
                if due_date != task.due_date {
                    transitions::commit_to(store, &mut item, &mut task, due_date, &mut affected)?;
                    task.due_date = due_date;
                }
            }
            if let Some(value) = description {
                task.description = value;
            }

            store.update_item(&item)?;
            store.update_task(&task)?;
            self.verify(store, &affected, item.id)?;
            Ok(Occurrence { task, item })
        })
    }

    /// Deletes an item and all of its occurrences.
    pub fn delete_item_and_occurrences(&self, item_id: ItemId) -> ScheduleResult<()> {
        self.run("item_delete", |store| {
            let item = store
                .get_item(item_id)?
                .ok_or(ScheduleError::NotFound(EntityRef::Item(item_id)))?;
            let tasks = store.list_item_tasks(item_id)?;

            let mut affected = AffectedGroups::default();
            transitions::delete_item(store, &item, &tasks, &mut affected)?;
            verify_groups(store, &affected)
        })
    }

    /// Completes an occurrence.
    ///
    /// # Contract
    /// - One-off items are completed with it and leave their backlog group.
    /// - Recurring items get exactly one successor occurrence.
    pub fn complete_occurrence(&self, task_id: TaskId) -> ScheduleResult<CompletionOutcome> {
        self.run("occurrence_complete", |store| {
            let Occurrence { mut task, mut item } = load_occurrence(store, task_id)?;

            let mut affected = AffectedGroups::default();
            let successor = transitions::complete(
                store,
                &mut item,
                &mut task,
                self.clock.now(),
                self.clock.today(),
                &mut affected,
            )?;
            store.update_item(&item)?;
            if let Some(successor) = &successor {
                store.insert_task(successor)?;
            }

            self.verify(store, &affected, item.id)?;
            Ok(CompletionOutcome {
                completed: Occurrence { task, item },
                successor,
            })
        })
    }

    /// Commits an occurrence to `date`, or returns it to the backlog for `None`.
    pub fn set_committed_date(
        &self,
        task_id: TaskId,
        date: Option<NaiveDate>,
    ) -> ScheduleResult<Occurrence> {
        self.run("occurrence_commit", |store| {
            let Occurrence { mut task, mut item } = load_occurrence(store, task_id)?;

            let mut affected = AffectedGroups::default();
            if transitions::commit_to(store, &mut item, &mut task, date, &mut affected)? {
                store.update_item(&item)?;
                store.update_task(&task)?;
                self.verify(store, &affected, item.id)?;
            }
            Ok(Occurrence { task, item })
        })
    }

    /// Moves an item to `new_position` within its backlog group.
    pub fn reorder_item(&self, item_id: ItemId, new_position: i64) -> ScheduleResult<()> {
        self.run("item_reorder", |store| {
            let mut item = store
                .get_item(item_id)?
                .ok_or(ScheduleError::NotFound(EntityRef::Item(item_id)))?;

            let mut affected = AffectedGroups::default();
            transitions::reorder_item(store, &mut item, new_position, &mut affected)?;
            store.update_item(&item)?;
            verify_groups(store, &affected)
        })
    }

    /// Moves an occurrence to `new_position` within the group of `date`.
    pub fn reorder_occurrence(
        &self,
        task_id: TaskId,
        date: NaiveDate,
        new_position: i64,
    ) -> ScheduleResult<()> {
        self.run("occurrence_reorder", |store| {
            let mut task = store
                .get_task(task_id)?
                .ok_or(ScheduleError::NotFound(EntityRef::Task(task_id)))?;

            let mut affected = AffectedGroups::default();
            transitions::reorder_task(store, &mut task, date, new_position, &mut affected)?;
            store.update_task(&task)?;
            verify_groups(store, &affected)
        })
    }

    /// Lists live occurrences of `recurring` items outside the upcoming window.
    ///
    /// Uncommitted occurrences and those committed on/after
    /// `today + horizon_days`, ordered by due date (undated first), then the
    /// item's backlog position.
    pub fn list_active_occurrences(&self, recurring: bool) -> ScheduleResult<Vec<Occurrence>> {
        let horizon_end = horizon_end(self.clock.today(), self.config.horizon_days)?;
        let query = OccurrenceQuery {
            recurring: Some(recurring),
            commitment: CommitmentFilter::UncommittedOrFrom(horizon_end),
            order: OccurrenceOrder::DueDateThenItemPosition,
            ..OccurrenceQuery::default()
        };
        Ok(self.store.find_occurrences(&query)?)
    }

    /// Rolls expired occurrences onto today, then returns one entry per day in
    /// `today..today + horizon_days`, each ordered by position.
    pub fn list_upcoming_by_date(
        &self,
        horizon_days: u32,
    ) -> ScheduleResult<BTreeMap<NaiveDate, Vec<Occurrence>>> {
        check_horizon(horizon_days).map_err(|err| ScheduleError::InvalidState(err.to_string()))?;
        let today = self.clock.today();
        let until = horizon_end(today, horizon_days)?;

        self.run("upcoming_list", |store| {
            let mut affected = AffectedGroups::default();
            roll_expired(store, today, &mut affected)?;
            verify_groups(store, &affected)?;

            let query = OccurrenceQuery {
                commitment: CommitmentFilter::CommittedBetween { from: today, until },
                order: OccurrenceOrder::CommittedDateThenPosition,
                ..OccurrenceQuery::default()
            };
            let mut by_date: BTreeMap<NaiveDate, Vec<Occurrence>> = today
                .iter_days()
                .take_while(|day| *day < until)
                .map(|day| (day, Vec::new()))
                .collect();
            for occurrence in store.find_occurrences(&query)? {
                if let Some(date) = occurrence.task.committed_date {
                    by_date.entry(date).or_default().push(occurrence);
                }
            }
            Ok(by_date)
        })
    }

    /// Upcoming agenda over the configured horizon.
    pub fn list_upcoming(&self) -> ScheduleResult<BTreeMap<NaiveDate, Vec<Occurrence>>> {
        self.list_upcoming_by_date(self.config.horizon_days)
    }

    /// Recommits every overdue live occurrence to today.
    ///
    /// Returns the number of rolled occurrences; zero means nothing was written.
    pub fn roll_expired_occurrences(&self) -> ScheduleResult<usize> {
        let today = self.clock.today();
        self.run("expiry_roll", |store| {
            let mut affected = AffectedGroups::default();
            let rolled = roll_expired(store, today, &mut affected)?;
            verify_groups(store, &affected)?;
            Ok(rolled)
        })
    }

    fn verify(&self, store: &S, affected: &AffectedGroups, item_id: ItemId) -> ScheduleResult<()> {
        verify_groups(store, affected)?;
        verify_item(store, item_id)
    }

    fn run<T>(
        &self,
        event: &'static str,
        op: impl FnOnce(&S) -> ScheduleResult<T>,
    ) -> ScheduleResult<T> {
        let started_at = Instant::now();
        let result = self.store.atomically(op);
        match &result {
            Ok(_) => info!(
                "event={} module=scheduling status=ok duration_ms={}",
                event,
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event={} module=scheduling status=error duration_ms={} error_code={} retryable={} error={}",
                event,
                started_at.elapsed().as_millis(),
                err.code(),
                err.is_retryable(),
                err
            ),
        }
        result
    }
}

fn load_occurrence<S: Store>(store: &S, task_id: TaskId) -> ScheduleResult<Occurrence> {
    let task = store
        .get_task(task_id)?
        .ok_or(ScheduleError::NotFound(EntityRef::Task(task_id)))?;
    let item = store
        .get_item(task.item_id)?
        .ok_or(ScheduleError::NotFound(EntityRef::Item(task.item_id)))?;
    Ok(Occurrence { task, item })
}

fn normalize_description(value: String) -> ScheduleResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ScheduleError::InvalidState(
            "description must not be blank".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

fn horizon_end(today: NaiveDate, horizon_days: u32) -> ScheduleResult<NaiveDate> {
    today
        .checked_add_days(Days::new(u64::from(horizon_days)))
        .ok_or_else(|| {
            ScheduleError::InvalidState(format!(
                "horizon of {horizon_days} days from {today} is out of range"
            ))
        })
}
