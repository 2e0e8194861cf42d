//! Tier tables. Every statement is idempotent so `initialize_schema` can
//! run at the start of every job.

use rusqlite::Connection;
use tracing::debug;

use crate::error::Result;

pub const CREATE_BRONZE: &str = "
CREATE TABLE IF NOT EXISTS bronze_measurements (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    location    TEXT,
    parameter   TEXT,
    value       REAL,
    unit        TEXT,
    coordinates TEXT,
    date        TEXT,
    payload     TEXT NOT NULL,
    ingested_at TEXT NOT NULL
)";

pub const CREATE_SILVER: &str = "
CREATE TABLE IF NOT EXISTS silver_measurements (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    location    TEXT NOT NULL,
    parameter   TEXT NOT NULL,
    pm25_value  REAL NOT NULL,
    unit        TEXT NOT NULL,
    datetime    TEXT NOT NULL,
    latitude    REAL NOT NULL,
    longitude   REAL NOT NULL
)";

// Dedup and gold recomputation both look rows up by these columns
pub const CREATE_SILVER_KEY_INDEX: &str = "
CREATE INDEX IF NOT EXISTS idx_silver_measurement_key
    ON silver_measurements (location, datetime, pm25_value)";

pub const CREATE_SILVER_DATETIME_INDEX: &str = "
CREATE INDEX IF NOT EXISTS idx_silver_datetime
    ON silver_measurements (datetime)";

// One row per UTC day, keyed by YYYY-MM-DD
pub const CREATE_GOLD: &str = "
CREATE TABLE IF NOT EXISTS gold_daily_summary (
    datetime  TEXT PRIMARY KEY,
    pm25_avg  REAL NOT NULL,
    pm25_max  REAL NOT NULL,
    pm25_min  REAL NOT NULL,
    count     INTEGER NOT NULL
)";

const SCHEMA: [(&str, &str); 5] = [
    // Tables before the indexes on them
    ("bronze_measurements", CREATE_BRONZE),
    ("silver_measurements", CREATE_SILVER),
    ("idx_silver_measurement_key", CREATE_SILVER_KEY_INDEX),
    ("idx_silver_datetime", CREATE_SILVER_DATETIME_INDEX),
    ("gold_daily_summary", CREATE_GOLD),
];

/// Create the bronze, silver and gold tables if they do not exist.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    for (name, sql) in SCHEMA {
        conn.execute_batch(sql)?;
        debug!(object = name, "schema object ready");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<String>, _>>()
            .unwrap()
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        // Second pass must be a no-op, not an error
        initialize_schema(&conn).unwrap();
        initialize_schema(&conn).unwrap();

        assert_eq!(
            table_names(&conn),
            vec![
                "bronze_measurements".to_string(),
                "gold_daily_summary".to_string(),
                "silver_measurements".to_string(),
            ]
        );
    }
}
