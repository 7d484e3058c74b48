//! Schema migrations for the `items` / `item_tasks` store.
//!
//! # Responsibility
//! - List schema steps in version order, each with a short name for logs.
//! - Upgrade a connection from its `PRAGMA user_version` to the latest step
//!   inside one transaction.
//!
//! # Invariants
//! - Step versions start at 1 and increase by exactly one.
//! - `PRAGMA user_version` always equals the last applied step.
//! - A database newer than this binary is rejected, never downgraded.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::{Connection, Transaction};
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "items_and_tasks",
        sql: include_str!("0001_init.sql"),
    },
    SchemaStep {
        version: 2,
        name: "position_group_indexes",
        sql: include_str!("0002_group_indexes.sql"),
    },
];

/// Returns the schema version this binary upgrades databases to.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Upgrades `conn` to `latest_version()`.
///
/// Does nothing for an up-to-date database. All pending steps commit together
/// or not at all.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    debug_assert!(steps_are_contiguous(SCHEMA_STEPS));

    let from_version = current_user_version(conn)?;
    let latest = latest_version();
    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }

    let pending = pending_after(from_version);
    if pending.is_empty() {
        return Ok(());
    }

    let started_at = Instant::now();
    let tx = conn.transaction()?;
    for step in pending {
        apply_step(&tx, step)?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={} steps={} duration_ms={}",
        from_version,
        latest,
        pending.len(),
        started_at.elapsed().as_millis()
    );
    Ok(())
}

fn apply_step(tx: &Transaction<'_>, step: &SchemaStep) -> DbResult<()> {
    tx.execute_batch(step.sql)?;
    tx.pragma_update(None, "user_version", step.version)?;
    debug!(
        "event=db_migrate_step module=db status=ok version={} name={}",
        step.version, step.name
    );
    Ok(())
}

/// Steps newer than `version`, in order.
fn pending_after(version: u32) -> &'static [SchemaStep] {
    let applied = SCHEMA_STEPS.partition_point(|step| step.version <= version);
    &SCHEMA_STEPS[applied..]
}

fn steps_are_contiguous(steps: &[SchemaStep]) -> bool {
    steps
        .iter()
        .zip(1u32..)
        .all(|(step, expected)| step.version == expected)
}

fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
