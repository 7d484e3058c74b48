//! Core scheduling logic for Dayplan.
//! This crate is the single source of truth for ordering and lifecycle
//! invariants of items and their dated occurrences.

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod model;
pub mod ordering;
pub mod repo;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, LoggingConfig, SchedulerConfig};
pub use error::{ScheduleError, ScheduleResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::item::{Item, ItemId, ItemValidationError};
pub use model::item_task::{ItemTask, TaskId, TaskState, TaskValidationError};
pub use model::{EntityRef, Occurrence};
pub use ordering::group::GroupKey;
pub use repo::sqlite_store::SqliteStore;
pub use repo::store::{Store, StoreError, StoreResult};
pub use service::scheduling_service::{
    CompletionOutcome, NewOccurrence, OccurrencePatch, SchedulingService,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
