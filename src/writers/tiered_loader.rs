use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{CleanMeasurement, RawMeasurement};
use crate::utils::timestamp::format_timestamp;

/// Row counts written by one load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub bronze_rows: usize,
    pub silver_rows: usize,
    pub silver_duplicates_removed: usize,
}

/// Appends a batch to the bronze and silver tiers and deduplicates silver.
pub struct TieredLoader;

impl TieredLoader {
    pub fn new() -> Self {
        Self
    }

    /// Write both tiers through `conn`. Not atomic on its own: the pipeline
    /// runs it inside [`crate::store::with_transaction`] together with the
    /// aggregator.
    pub fn load(
        &self,
        conn: &Connection,
        raw: &[RawMeasurement],
        clean: &[CleanMeasurement],
    ) -> Result<LoadReport> {
        let bronze_rows = Self::append_bronze(conn, raw)?;
        let silver_rows = Self::append_silver(conn, clean)?;
        // the batch is unique already, but it may repeat rows from earlier runs
        let silver_duplicates_removed = Self::deduplicate_silver(conn)?;

        info!(
            bronze_rows,
            silver_rows, silver_duplicates_removed, "bronze and silver tiers loaded"
        );

        Ok(LoadReport {
            bronze_rows,
            silver_rows,
            silver_duplicates_removed,
        })
    }

    fn append_bronze(conn: &Connection, raw: &[RawMeasurement]) -> Result<usize> {
        let ingested_at = format_timestamp(&Utc::now());
        let mut stmt = conn.prepare_cached(
            "INSERT INTO bronze_measurements
                (location, parameter, value, unit, coordinates, date, payload, ingested_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;

        for record in raw {
            // typed columns are best effort, the payload is the record itself
            stmt.execute(params![
                record.text("location"),
                record.text("parameter"),
                record.number("value"),
                record.text("unit"),
                record.json_text("coordinates"),
                record.json_text("date"),
                record.payload().to_string(),
                ingested_at,
            ])?;
        }

        debug!(rows = raw.len(), "bronze rows appended");
        Ok(raw.len())
    }

    fn append_silver(conn: &Connection, clean: &[CleanMeasurement]) -> Result<usize> {
        let mut stmt = conn.prepare_cached(
            "INSERT INTO silver_measurements
                (location, parameter, pm25_value, unit, datetime, latitude, longitude)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;

        for record in clean {
            stmt.execute(params![
                record.location,
                record.parameter,
                record.pm25_value,
                record.unit,
                // fixed width, see utils::timestamp
                format_timestamp(&record.datetime),
                record.latitude,
                record.longitude,
            ])?;
        }

        debug!(rows = clean.len(), "silver rows appended");
        Ok(clean.len())
    }

    /// Keep the lowest-id row of every (location, datetime, pm25_value)
    /// group in silver and delete the rest. Returns the number deleted.
    pub fn deduplicate_silver(conn: &Connection) -> Result<usize> {
        // MIN(id) is the row from the earliest run
        let removed = conn.execute(
            "DELETE FROM silver_measurements
             WHERE id NOT IN (
                 SELECT MIN(id) FROM silver_measurements
                 GROUP BY location, datetime, pm25_value
             )",
            [],
        )?;

        if removed > 0 {
            debug!(removed, "duplicate silver rows removed");
        }
        Ok(removed)
    }
}

impl Default for TieredLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::Transformer;
    use crate::store;
    use crate::utils::constants::{BRONZE_TABLE, SILVER_TABLE};

    fn batch(values: &[(f64, &str)]) -> (Vec<RawMeasurement>, Vec<CleanMeasurement>) {
        let raw: Vec<RawMeasurement> = values
            .iter()
            .map(|(v, t)| RawMeasurement::new("A", "pm25", *v, "µg/m³", 1.0, 2.0, t))
            .collect();
        let clean = Transformer::new().transform(&raw).unwrap().records;
        (raw, clean)
    }

    fn load(conn: &mut Connection, raw: &[RawMeasurement], clean: &[CleanMeasurement]) -> Result<LoadReport> {
        store::with_transaction(conn, |tx| TieredLoader::new().load(tx, raw, clean))
    }

    fn silver_ids(conn: &Connection) -> Vec<i64> {
        let mut stmt = conn
            .prepare("SELECT id FROM silver_measurements ORDER BY id")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<i64>, _>>()
            .unwrap()
    }

    #[test]
    fn test_load_writes_both_tiers() {
        let mut conn = store::open_in_memory().unwrap();
        let (raw, clean) = batch(&[
            (10.0, "2024-01-01T00:00:00Z"),
            (10.0, "2024-01-01T00:00:00Z"),
            (12.0, "2024-01-01T01:00:00Z"),
        ]);
        // the transformer already dropped the repeat, so silver gets two

        let report = load(&mut conn, &raw, &clean).unwrap();

        assert_eq!(report.bronze_rows, 3);
        assert_eq!(report.silver_rows, 2);
        assert_eq!(store::count_rows(&conn, BRONZE_TABLE).unwrap(), 3);
        assert_eq!(store::count_rows(&conn, SILVER_TABLE).unwrap(), 2);
    }

    #[test]
    fn test_bronze_keeps_payload_verbatim() {
        let mut conn = store::open_in_memory().unwrap();
        let body = r#"{"location":"A","parameter":"pm25","value":10,"unit":"µg/m³","coordinates":{"latitude":1,"longitude":2,"accuracy":5},"date":{"utc":"2024-01-01T00:00:00Z","local":"2024-01-01T03:00:00+03:00","tz":"Africa/Nairobi"},"sensorId":99}"#;
        let raw: RawMeasurement = serde_json::from_str(body).unwrap();

        load(&mut conn, &[raw], &[]).unwrap();

        let (payload, value, coordinates): (String, f64, String) = conn
            .query_row(
                "SELECT payload, value, coordinates FROM bronze_measurements",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        // Byte for byte: key order, integers and unknown fields all survive
        assert_eq!(payload, body);
        assert_eq!(value, 10.0);
        assert_eq!(coordinates, r#"{"latitude":1,"longitude":2,"accuracy":5}"#);
    }

    #[test]
    fn test_bronze_accepts_wrongly_typed_records() {
        let mut conn = store::open_in_memory().unwrap();
        let raw: RawMeasurement =
            serde_json::from_str(r#"{"location":"A","value":"n/a","coordinates":"x"}"#).unwrap();

        load(&mut conn, &[raw], &[]).unwrap();

        let (value, coordinates): (Option<f64>, Option<String>) = conn
            .query_row(
                "SELECT value, coordinates FROM bronze_measurements",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        // the typed column is NULL, the raw value is still there
        assert_eq!(value, None);
        assert_eq!(coordinates.as_deref(), Some(r#""x""#));
    }

    #[test]
    fn test_silver_dedup_across_runs_keeps_lowest_id() {
        let mut conn = store::open_in_memory().unwrap();

        let (raw, clean) = batch(&[(10.0, "2024-01-01T00:00:00Z")]);
        load(&mut conn, &raw, &clean).unwrap();
        let first_ids = silver_ids(&conn);

        // Second run repeats the first reading
        let (raw, clean) = batch(&[
            (10.0, "2024-01-01T00:00:00Z"),
            (11.0, "2024-01-01T01:00:00Z"),
        ]);
        let report = load(&mut conn, &raw, &clean).unwrap();

        assert_eq!(report.silver_duplicates_removed, 1);
        let ids = silver_ids(&conn);
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], first_ids[0]);
        assert_eq!(store::count_rows(&conn, BRONZE_TABLE).unwrap(), 3);
    }

    #[test]
    fn test_silver_is_unique_after_dedup() {
        let conn = store::open_in_memory().unwrap();
        for _ in 0..3 {
            conn.execute(
                "INSERT INTO silver_measurements
                    (location, parameter, pm25_value, unit, datetime, latitude, longitude)
                 VALUES ('A', 'pm25', 3.0, 'µg/m³', '2024-01-01T00:00:00.000Z', 1.0, 2.0)",
                [],
            )
            .unwrap();
        }

        assert_eq!(TieredLoader::deduplicate_silver(&conn).unwrap(), 2);

        let groups: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM (
                    SELECT 1 FROM silver_measurements
                    GROUP BY location, datetime, pm25_value HAVING COUNT(*) > 1)",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(groups, 0);
    }

    #[test]
    fn test_failed_load_rolls_back_bronze() {
        let mut conn = store::open_in_memory().unwrap();
        // Bronze insert succeeds, silver insert fails
        conn.execute_batch("DROP TABLE silver_measurements").unwrap();
        let (raw, clean) = batch(&[(10.0, "2024-01-01T00:00:00Z")]);

        let err = load(&mut conn, &raw, &clean).unwrap_err();

        assert_eq!(err.kind(), crate::error::ErrorKind::Load);
        assert_eq!(store::count_rows(&conn, BRONZE_TABLE).unwrap(), 0);
    }
}
