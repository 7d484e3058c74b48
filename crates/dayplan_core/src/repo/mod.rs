//! Store abstraction and persistence implementations.
//!
//! # Responsibility
//! - Define the data access contract the scheduling core runs against.
//! - Isolate SQLite query details from lifecycle/service orchestration.
//!
//! # Invariants
//! - Store writes must enforce `Item::validate()` / `ItemTask::validate()`.
//! - Store APIs return semantic errors (`NotFound`, `Conflict`) in addition
//!   to DB transport errors.

pub mod sqlite_store;
pub mod store;
