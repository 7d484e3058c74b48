//! Domain model for items and their scheduled occurrences.
//!
//! # Responsibility
//! - Define canonical data structures used by the scheduling core.
//! - Keep row-to-struct conversion out of the model (see `repo`).
//!
//! # Invariants
//! - Every entity is identified by a stable UUID.
//! - Position ownership alternates between an item and its live task.

pub mod item;
pub mod item_task;

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use item::{Item, ItemId};
use item_task::{ItemTask, TaskId};

/// Read model pairing one task with its owning item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub task: ItemTask,
    pub item: Item,
}

/// Reference to a persisted entity, used in not-found reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Item(ItemId),
    Task(TaskId),
}

impl Display for EntityRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Item(id) => write!(f, "item {id}"),
            Self::Task(id) => write!(f, "item task {id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EntityRef, Occurrence};
    use crate::model::item::Item;
    use crate::model::item_task::ItemTask;
    use chrono::NaiveDate;

    #[test]
    fn occurrence_serializes_dates_as_iso_days() {
        let item = Item::new("renew passport", false);
        let mut task = ItemTask::for_item(&item);
        task.due_date = NaiveDate::from_ymd_opt(2024, 6, 10);
        task.committed_date = task.due_date;
        task.position = Some(0);

        let occurrence = Occurrence { task, item };
        let json = serde_json::to_value(&occurrence).unwrap();
        assert_eq!(json["task"]["committed_date"], "2024-06-10");
        assert_eq!(json["item"]["position"], serde_json::Value::Null);

        let decoded: Occurrence = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, occurrence);
    }

    #[test]
    fn entity_ref_names_its_kind() {
        let item = Item::new("x", false);
        assert!(EntityRef::Item(item.id).to_string().starts_with("item "));
        assert!(EntityRef::Task(item.id)
            .to_string()
            .starts_with("item task "));
    }
}
