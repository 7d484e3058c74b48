use chrono::{NaiveDate, Utc};
use dayplan_core::db::open_db_in_memory;
use dayplan_core::ordering::position::{close_gap, move_within_group};
use dayplan_core::repo::store::{
    CommitmentFilter, OccurrenceOrder, OccurrenceQuery, Store, StoreError,
};
use dayplan_core::{GroupKey, Item, ItemTask, SqliteStore};
use rusqlite::Connection;

fn day(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

fn insert_backlog(store: &SqliteStore<'_>, description: &str, position: i64) -> (Item, ItemTask) {
    let mut item = Item::new(description, false);
    item.position = Some(position);
    let task = ItemTask::for_item(&item);
    store.insert_item(&item).unwrap();
    store.insert_task(&task).unwrap();
    (item, task)
}

fn insert_committed(
    store: &SqliteStore<'_>,
    description: &str,
    date: &str,
    position: i64,
) -> (Item, ItemTask) {
    let item = Item::new(description, false);
    let mut task = ItemTask::for_item(&item);
    task.committed_date = Some(day(date));
    task.position = Some(position);
    store.insert_item(&item).unwrap();
    store.insert_task(&task).unwrap();
    (item, task)
}

#[test]
fn store_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    match SqliteStore::try_new(&conn) {
        Err(StoreError::UninitializedConnection { actual_version, .. }) => {
            assert_eq!(actual_version, 0);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("unmigrated connection accepted"),
    }
}

#[test]
fn items_and_tasks_round_trip_through_rows() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();

    let mut item = Item::new("water plants", true).with_cadence(3);
    item.position = Some(0);
    let mut task = ItemTask::for_item(&item);
    task.due_date = Some(day("2024-06-10"));
    store.insert_item(&item).unwrap();
    store.insert_task(&task).unwrap();

    assert_eq!(store.get_item(item.id).unwrap(), Some(item.clone()));
    assert_eq!(store.get_task(task.id).unwrap(), Some(task.clone()));

    item.position = None;
    task.committed_date = Some(day("2024-06-10"));
    task.position = Some(0);
    task.completion_date = None;
    store.update_item(&item).unwrap();
    store.update_task(&task).unwrap();
    assert_eq!(store.get_task(task.id).unwrap(), Some(task));
}

#[test]
fn completion_timestamp_keeps_millisecond_precision() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let (_, mut task) = insert_backlog(&store, "x", 0);

    let now = Utc::now();
    task.completion_date = Some(now);
    store.update_task(&task).unwrap();

    let loaded = store.get_task(task.id).unwrap().unwrap();
    assert_eq!(
        loaded.completion_date.map(|value| value.timestamp_millis()),
        Some(now.timestamp_millis())
    );
}

#[test]
fn invalid_rows_are_rejected_before_write() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();

    let item = Item::new("x", false);
    let mut task = ItemTask::for_item(&item);
    task.position = Some(0);
    store.insert_item(&item).unwrap();

    let err = store.insert_task(&task).unwrap_err();
    assert!(matches!(err, StoreError::TaskValidation(_)));
    assert!(store.list_item_tasks(item.id).unwrap().is_empty());
}

#[test]
fn updating_missing_rows_reports_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();

    let item = Item::new("ghost", false);
    assert!(matches!(
        store.update_item(&item).unwrap_err(),
        StoreError::NotFound(_)
    ));
    assert!(matches!(
        store.delete_item(item.id).unwrap_err(),
        StoreError::NotFound(_)
    ));
}

#[test]
fn groups_only_count_live_members() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    insert_committed(&store, "a", "2024-06-10", 0);
    let (_, mut done) = insert_committed(&store, "b", "2024-06-10", 1);
    insert_committed(&store, "other day", "2024-06-11", 0);

    done.position = None;
    done.completion_date = Some(Utc::now());
    store.update_task(&done).unwrap();

    let group = GroupKey::Day(day("2024-06-10"));
    assert_eq!(store.group_positions(group).unwrap(), vec![0]);
    assert_eq!(store.max_position(group).unwrap(), Some(0));
    assert_eq!(
        store
            .max_position(GroupKey::Day(day("2024-06-12")))
            .unwrap(),
        None
    );
    assert_eq!(store.max_position(GroupKey::backlog(false)).unwrap(), None);
}

#[test]
fn shifts_touch_only_the_target_range() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    for (index, description) in ["a", "b", "c", "d"].iter().enumerate() {
        insert_backlog(&store, description, index as i64);
    }
    insert_committed(&store, "unrelated", "2024-06-10", 2);

    let group = GroupKey::backlog(false);
    let shift = move_within_group(group, 0, 2).unwrap();
    assert_eq!(store.shift_positions(&shift).unwrap(), 2);
    assert_eq!(store.group_positions(group).unwrap(), vec![0, 0, 1, 3]);

    let shift = close_gap(group, Some(0)).unwrap();
    assert_eq!(store.shift_positions(&shift).unwrap(), 2);
    assert_eq!(store.group_positions(group).unwrap(), vec![0, 0, 0, 2]);

    assert_eq!(
        store
            .group_positions(GroupKey::Day(day("2024-06-10")))
            .unwrap(),
        vec![2]
    );
}

#[test]
fn occurrence_queries_filter_and_order() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    insert_committed(&store, "late", "2024-06-03", 0);
    insert_committed(&store, "early-1", "2024-06-01", 1);
    insert_committed(&store, "early-0", "2024-06-01", 0);
    insert_backlog(&store, "backlog", 0);

    let before = store
        .find_occurrences(&OccurrenceQuery {
            commitment: CommitmentFilter::CommittedBefore(day("2024-06-03")),
            ..OccurrenceQuery::default()
        })
        .unwrap();
    let descriptions: Vec<&str> = before
        .iter()
        .map(|occurrence| occurrence.task.description.as_str())
        .collect();
    assert_eq!(descriptions, vec!["early-0", "early-1"]);

    let backlog_or_later = store
        .find_occurrences(&OccurrenceQuery {
            recurring: Some(false),
            commitment: CommitmentFilter::UncommittedOrFrom(day("2024-06-02")),
            order: OccurrenceOrder::DueDateThenItemPosition,
            ..OccurrenceQuery::default()
        })
        .unwrap();
    let descriptions: Vec<&str> = backlog_or_later
        .iter()
        .map(|occurrence| occurrence.task.description.as_str())
        .collect();
    assert_eq!(descriptions.len(), 2);
    assert!(descriptions.contains(&"backlog"));
    assert!(descriptions.contains(&"late"));

    let recurring_only = store
        .find_occurrences(&OccurrenceQuery {
            recurring: Some(true),
            ..OccurrenceQuery::default()
        })
        .unwrap();
    assert!(recurring_only.is_empty());
}

#[test]
fn failed_atomic_block_rolls_back() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let (item, _) = insert_backlog(&store, "kept", 0);

    let result: Result<(), StoreError> = store.atomically(|store| {
        store.delete_item(item.id)?;
        Err(StoreError::InvalidData("abort".to_string()))
    });

    assert!(result.is_err());
    assert!(store.get_item(item.id).unwrap().is_some());
}
