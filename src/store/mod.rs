//! SQLite-backed tier store.
//!
//! One connection per run. Stages receive `&Connection`; the pipeline
//! wraps the loader and aggregator in a single transaction with
//! [`with_transaction`] so either every tier changes or none does.

pub mod schema;

pub use schema::initialize_schema;

use std::fs;
use std::path::Path;

use rusqlite::{Connection, Transaction};
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::Result;

/// Open (creating if needed) the store at the configured path and make sure
/// the tier tables exist.
pub fn open(config: &StoreConfig) -> Result<Connection> {
    let path = config.database_path.as_path();
    // Create the parent directory on first run
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)?;
    // Wait for a concurrent writer instead of failing straight away
    conn.busy_timeout(config.busy_timeout())?;
    enable_wal(&conn, path);
    // Idempotent, safe on every open
    initialize_schema(&conn)?;

    info!(path = %path.display(), "store opened");
    Ok(conn)
}

/// In-memory store with the schema applied.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    initialize_schema(&conn)?;
    Ok(conn)
}

fn enable_wal(conn: &Connection, path: &Path) {
    // journal_mode returns a row, so pragma_update_and_check reads it back
    match conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
        row.get::<_, String>(0)
    }) {
        Ok(mode) => debug!(path = %path.display(), mode = %mode, "journal mode set"),
        Err(e) => warn!(error = %e, "could not enable WAL journal mode"),
    }
}

/// Run `f` inside one transaction: commit on `Ok`, roll back on `Err`.
pub fn with_transaction<T, F>(conn: &mut Connection, f: F) -> Result<T>
where
    F: FnOnce(&Transaction<'_>) -> Result<T>,
{
    let tx = conn.transaction()?;
    match f(&tx) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(e) => {
            // Report the original error, not the rollback one
            if let Err(rollback_err) = tx.rollback() {
                warn!(error = %rollback_err, "rollback failed");
            }
            Err(e)
        }
    }
}

/// Row count of a tier table. `table` must be one of the tier constants.
pub fn count_rows(conn: &Connection, table: &str) -> Result<u64> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })?;
    Ok(count as u64)
}
