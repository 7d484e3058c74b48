//! SQLite implementation of the `Store` contract.
//!
//! # Responsibility
//! - Map items/tasks between rows and domain structs by hand.
//! - Translate `GroupKey` and `PositionShift` into SQL predicates.
//!
//! # Invariants
//! - Dates persist as `YYYY-MM-DD` text, so day groups compare exactly.
//! - Completion timestamps persist as epoch milliseconds.
//! - Transactions use `BEGIN IMMEDIATE`, serializing writers per database.

use crate::db::migrations::latest_version;
use crate::model::item::{Item, ItemId};
use crate::model::item_task::{ItemTask, TaskId};
use crate::model::{EntityRef, Occurrence};
use crate::ordering::group::GroupKey;
use crate::ordering::position::PositionShift;
use crate::repo::store::{
    CommitmentFilter, OccurrenceOrder, OccurrenceQuery, Store, StoreError, StoreResult,
};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";

const ITEM_SELECT_SQL: &str = "SELECT
    item_uuid,
    description AS item_description,
    recurring AS item_recurring,
    cadence_days AS item_cadence_days,
    completed AS item_completed,
    position AS item_position
FROM items";

const TASK_SELECT_SQL: &str = "SELECT
    task_uuid,
    item_uuid,
    description,
    due_date,
    committed_date,
    completion_date,
    position
FROM item_tasks";

const OCCURRENCE_SELECT_SQL: &str = "SELECT
    t.task_uuid AS task_uuid,
    t.item_uuid AS item_uuid,
    t.description AS description,
    t.due_date AS due_date,
    t.committed_date AS committed_date,
    t.completion_date AS completion_date,
    t.position AS position,
    i.description AS item_description,
    i.recurring AS item_recurring,
    i.cadence_days AS item_cadence_days,
    i.completed AS item_completed,
    i.position AS item_position
FROM item_tasks t
INNER JOIN items i ON i.item_uuid = t.item_uuid";

/// SQLite-backed store borrowing a migrated connection.
pub struct SqliteStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStore<'conn> {
    /// Creates store from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_store_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl Store for SqliteStore<'_> {
    fn atomically<T, E, F>(&self, op: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<StoreError>,
    {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        // Dropping `tx` on the error path rolls everything back.
        let value = op(self)?;
        tx.commit().map_err(StoreError::from)?;
        Ok(value)
    }

    fn get_item(&self, id: ItemId) -> StoreResult<Option<Item>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ITEM_SELECT_SQL} WHERE item_uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_item_row(row)?));
        }
        Ok(None)
    }

    fn get_task(&self, id: TaskId) -> StoreResult<Option<ItemTask>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE task_uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_task_row(row)?));
        }
        Ok(None)
    }

    fn list_item_tasks(&self, item_id: ItemId) -> StoreResult<Vec<ItemTask>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             WHERE item_uuid = ?1
             ORDER BY created_at ASC, task_uuid ASC;"
        ))?;
        let mut rows = stmt.query([item_id.to_string()])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }

    fn find_occurrences(&self, query: &OccurrenceQuery) -> StoreResult<Vec<Occurrence>> {
        let mut sql = format!("{OCCURRENCE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_completed {
            sql.push_str(" AND t.completion_date IS NULL");
        }

        if let Some(recurring) = query.recurring {
            sql.push_str(" AND i.recurring = ?");
            bind_values.push(Value::Integer(bool_to_int(recurring)));
        }

        match query.commitment {
            CommitmentFilter::Any => {}
            CommitmentFilter::CommittedBefore(date) => {
                sql.push_str(" AND t.committed_date IS NOT NULL AND t.committed_date < ?");
                bind_values.push(Value::Text(date_to_db(date)));
            }
            CommitmentFilter::CommittedBetween { from, until } => {
                sql.push_str(" AND t.committed_date >= ? AND t.committed_date < ?");
                bind_values.push(Value::Text(date_to_db(from)));
                bind_values.push(Value::Text(date_to_db(until)));
            }
            CommitmentFilter::UncommittedOrFrom(date) => {
                sql.push_str(" AND (t.committed_date IS NULL OR t.committed_date >= ?)");
                bind_values.push(Value::Text(date_to_db(date)));
            }
        }

        // SQLite sorts NULL first in ascending order.
        match query.order {
            OccurrenceOrder::CommittedDateThenPosition => {
                sql.push_str(" ORDER BY t.committed_date ASC, t.position ASC, t.task_uuid ASC");
            }
            OccurrenceOrder::DueDateThenItemPosition => {
                sql.push_str(" ORDER BY t.due_date ASC, i.position ASC, t.task_uuid ASC");
            }
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut occurrences = Vec::new();
        while let Some(row) = rows.next()? {
            occurrences.push(Occurrence {
                task: parse_task_row(row)?,
                item: parse_item_row(row)?,
            });
        }
        Ok(occurrences)
    }

    fn max_position(&self, group: GroupKey) -> StoreResult<Option<i64>> {
        let (table, filter, key) = group_filter(group);
        let max = self.conn.query_row(
            &format!("SELECT MAX(position) FROM {table} WHERE {filter};"),
            [key],
            |row| row.get::<_, Option<i64>>(0),
        )?;
        Ok(max)
    }

    fn group_positions(&self, group: GroupKey) -> StoreResult<Vec<i64>> {
        let (table, filter, key) = group_filter(group);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT position
             FROM {table}
             WHERE {filter}
               AND position IS NOT NULL
             ORDER BY position ASC;"
        ))?;
        let mut rows = stmt.query([key])?;
        let mut positions = Vec::new();
        while let Some(row) = rows.next()? {
            positions.push(row.get(0)?);
        }
        Ok(positions)
    }

    fn insert_item(&self, item: &Item) -> StoreResult<()> {
        item.validate()?;
        self.conn.execute(
            "INSERT INTO items (
                item_uuid,
                description,
                recurring,
                cadence_days,
                completed,
                position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                item.id.to_string(),
                item.description.as_str(),
                bool_to_int(item.recurring),
                item.cadence_days,
                bool_to_int(item.completed),
                item.position,
            ],
        )?;
        Ok(())
    }

    fn insert_task(&self, task: &ItemTask) -> StoreResult<()> {
        task.validate()?;
        self.conn.execute(
            "INSERT INTO item_tasks (
                task_uuid,
                item_uuid,
                description,
                due_date,
                committed_date,
                completion_date,
                position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                task.id.to_string(),
                task.item_id.to_string(),
                task.description.as_str(),
                task.due_date.map(date_to_db),
                task.committed_date.map(date_to_db),
                task.completion_date.map(|value| value.timestamp_millis()),
                task.position,
            ],
        )?;
        Ok(())
    }

    fn update_item(&self, item: &Item) -> StoreResult<()> {
        item.validate()?;
        let changed = self.conn.execute(
            "UPDATE items
             SET
                description = ?2,
                recurring = ?3,
                cadence_days = ?4,
                completed = ?5,
                position = ?6,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE item_uuid = ?1;",
            params![
                item.id.to_string(),
                item.description.as_str(),
                bool_to_int(item.recurring),
                item.cadence_days,
                bool_to_int(item.completed),
                item.position,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(EntityRef::Item(item.id)));
        }
        Ok(())
    }

    fn update_task(&self, task: &ItemTask) -> StoreResult<()> {
        task.validate()?;
        let changed = self.conn.execute(
            "UPDATE item_tasks
             SET
                description = ?2,
                due_date = ?3,
                committed_date = ?4,
                completion_date = ?5,
                position = ?6,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE task_uuid = ?1;",
            params![
                task.id.to_string(),
                task.description.as_str(),
                task.due_date.map(date_to_db),
                task.committed_date.map(date_to_db),
                task.completion_date.map(|value| value.timestamp_millis()),
                task.position,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(EntityRef::Task(task.id)));
        }
        Ok(())
    }

    fn delete_item(&self, id: ItemId) -> StoreResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM items WHERE item_uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(StoreError::NotFound(EntityRef::Item(id)));
        }
        Ok(())
    }

    fn shift_positions(&self, shift: &PositionShift) -> StoreResult<usize> {
        let (table, filter, key) = group_filter(shift.group);
        let changed = self.conn.execute(
            &format!(
                "UPDATE {table}
                 SET position = position + ?2,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE {filter}
                   AND position IS NOT NULL
                   AND position >= ?3
                   AND (?4 IS NULL OR position <= ?4);"
            ),
            params_from_iter([
                key,
                Value::Integer(shift.delta),
                Value::Integer(shift.lower),
                shift.upper.map_or(Value::Null, Value::Integer),
            ]),
        )?;
        Ok(changed)
    }
}

/// Returns `(table, predicate, ?1 binding)` selecting the live members of a group.
fn group_filter(group: GroupKey) -> (&'static str, &'static str, Value) {
    match group {
        GroupKey::Backlog { recurring } => (
            "items",
            "completed = 0 AND recurring = ?1",
            Value::Integer(bool_to_int(recurring)),
        ),
        GroupKey::Day(date) => (
            "item_tasks",
            "completion_date IS NULL AND committed_date = ?1",
            Value::Text(date_to_db(date)),
        ),
    }
}

fn parse_item_row(row: &Row<'_>) -> StoreResult<Item> {
    let item_uuid_text: String = row.get("item_uuid")?;
    let cadence_days: i64 = row.get("item_cadence_days")?;
    let cadence_days = u32::try_from(cadence_days).map_err(|_| {
        StoreError::InvalidData(format!(
            "invalid cadence `{cadence_days}` in items.cadence_days"
        ))
    })?;

    let item = Item {
        id: parse_uuid(&item_uuid_text, "items.item_uuid")?,
        description: row.get("item_description")?,
        recurring: parse_bool(row.get("item_recurring")?, "items.recurring")?,
        cadence_days,
        completed: parse_bool(row.get("item_completed")?, "items.completed")?,
        position: row.get("item_position")?,
    };
    item.validate()
        .map_err(|err| StoreError::InvalidData(format!("item {}: {err}", item.id)))?;
    Ok(item)
}

fn parse_task_row(row: &Row<'_>) -> StoreResult<ItemTask> {
    let task_uuid_text: String = row.get("task_uuid")?;
    let item_uuid_text: String = row.get("item_uuid")?;

    let completion_date = match row.get::<_, Option<i64>>("completion_date")? {
        Some(millis) => Some(DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
            StoreError::InvalidData(format!(
                "invalid timestamp `{millis}` in item_tasks.completion_date"
            ))
        })?),
        None => None,
    };

    let task = ItemTask {
        id: parse_uuid(&task_uuid_text, "item_tasks.task_uuid")?,
        item_id: parse_uuid(&item_uuid_text, "item_tasks.item_uuid")?,
        description: row.get("description")?,
        due_date: parse_optional_date(row.get("due_date")?, "item_tasks.due_date")?,
        committed_date: parse_optional_date(
            row.get("committed_date")?,
            "item_tasks.committed_date",
        )?,
        completion_date,
        position: row.get("position")?,
    };
    task.validate()
        .map_err(|err| StoreError::InvalidData(format!("item task {}: {err}", task.id)))?;
    Ok(task)
}

fn date_to_db(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_optional_date(value: Option<String>, column: &'static str) -> StoreResult<Option<NaiveDate>> {
    value
        .map(|text| {
            NaiveDate::parse_from_str(&text, DATE_FORMAT).map_err(|_| {
                StoreError::InvalidData(format!("invalid date `{text}` in {column}"))
            })
        })
        .transpose()
}

fn parse_uuid(value: &str, column: &'static str) -> StoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn parse_bool(value: i64, column: &'static str) -> StoreResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(StoreError::InvalidData(format!(
            "invalid boolean `{other}` in {column}"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn ensure_store_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["items", "item_tasks"] {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(StoreError::MissingRequiredTable(table));
        }
    }

    Ok(())
}
