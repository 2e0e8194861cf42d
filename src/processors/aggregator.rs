use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{CleanMeasurement, DailyAccumulator, DailySummary};
use crate::utils::timestamp::{day_bounds, format_day, parse_day};

/// Rolls clean measurements up into per-day gold rows.
///
/// Gold rows are replaced, never appended: every touched day is deleted and
/// reinserted, so recomputing a day any number of times leaves one row.
pub struct Aggregator;

impl Aggregator {
    pub fn new() -> Self {
        Self
    }

    /// Daily statistics over an in-memory batch, ordered by day.
    pub fn summarize(records: &[CleanMeasurement]) -> Vec<DailySummary> {
        let mut by_day: BTreeMap<NaiveDate, DailyAccumulator> = BTreeMap::new();
        for record in records {
            by_day.entry(record.day()).or_default().push(record.pm25_value);
        }

        by_day
            .into_iter()
            .filter_map(|(day, acc)| acc.finish(day))
            .collect()
    }

    /// Distinct UTC days present in a batch.
    pub fn touched_days(records: &[CleanMeasurement]) -> BTreeSet<NaiveDate> {
        records.iter().map(CleanMeasurement::day).collect()
    }

    /// Daily statistics for `days`, computed from every silver row of each
    /// day rather than only the current batch.
    pub fn summarize_from_store(
        &self,
        conn: &Connection,
        days: &BTreeSet<NaiveDate>,
    ) -> Result<Vec<DailySummary>> {
        let mut stmt = conn.prepare_cached(
            "SELECT pm25_value FROM silver_measurements
             WHERE datetime >= ?1 AND datetime < ?2",
        )?;

        let mut summaries = Vec::with_capacity(days.len());
        for day in days {
            // Half-open range [00:00, next 00:00)
            let (start, end) = day_bounds(day);
            let mut acc = DailyAccumulator::new();
            let values = stmt.query_map(params![start, end], |row| row.get::<_, f64>(0))?;
            for value in values {
                acc.push(value?);
            }
            if let Some(summary) = acc.finish(*day) {
                summaries.push(summary);
            }
        }

        Ok(summaries)
    }

    /// Delete the gold rows of every summarised day, then insert the fresh
    /// rows. Callers run this inside a transaction (see
    /// [`crate::store::with_transaction`]) so a failure cannot leave a day deleted
    /// but not reinserted.
    pub fn replace_daily_summaries(
        &self,
        conn: &Connection,
        summaries: &[DailySummary],
    ) -> Result<usize> {
        // Delete first so a rerun never leaves two rows for one day
        let mut delete = conn.prepare_cached("DELETE FROM gold_daily_summary WHERE datetime = ?1")?;
        let mut deleted = 0;
        for summary in summaries {
            deleted += delete.execute(params![format_day(&summary.date)])?;
        }

        let mut insert = conn.prepare_cached(
            "INSERT INTO gold_daily_summary (datetime, pm25_avg, pm25_max, pm25_min, count)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for summary in summaries {
            insert.execute(params![
                format_day(&summary.date),
                summary.pm25_avg,
                summary.pm25_max,
                summary.pm25_min,
                summary.count,
            ])?;
        }

        debug!(
            deleted,
            inserted = summaries.len(),
            "gold rows replaced"
        );
        Ok(summaries.len())
    }

    /// Recompute and replace the gold rows for every day the batch touches.
    pub fn refresh(
        &self,
        conn: &Connection,
        records: &[CleanMeasurement],
    ) -> Result<Vec<DailySummary>> {
        let days = Self::touched_days(records);
        if days.is_empty() {
            return Ok(Vec::new());
        }

        // Silver already holds this batch, so the summaries include it
        let summaries = self.summarize_from_store(conn, &days)?;
        self.replace_daily_summaries(conn, &summaries)?;

        info!(days = summaries.len(), "gold table updated incrementally");
        Ok(summaries)
    }

    /// Gold rows, oldest first. With `latest`, only the most recent `n` days.
    pub fn read_summaries(conn: &Connection, latest: Option<usize>) -> Result<Vec<DailySummary>> {
        // LIMIT -1 is no limit in SQLite
        let limit = latest.map(|n| n as i64).unwrap_or(-1);
        let mut stmt = conn.prepare(
            "SELECT datetime, pm25_avg, pm25_max, pm25_min, count
             FROM gold_daily_summary
             ORDER BY datetime DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, u32>(4)?,
            ))
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            let (day, pm25_avg, pm25_max, pm25_min, count) = row?;
            summaries.push(DailySummary {
                date: parse_day(&day)?,
                pm25_avg,
                pm25_max,
                pm25_min,
                count,
            });
        }
        // newest first from SQL, oldest first for display
        summaries.reverse();
        Ok(summaries)
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn measurement(value: f64, day: u32, hour: u32) -> CleanMeasurement {
        CleanMeasurement::new(
            "A".to_string(),
            "pm25".to_string(),
            value,
            "µg/m³".to_string(),
            Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap(),
            1.0,
            2.0,
        )
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn summary(d: u32, avg: f64, max: f64, min: f64, count: u32) -> DailySummary {
        DailySummary {
            date: day(d),
            pm25_avg: avg,
            pm25_max: max,
            pm25_min: min,
            count,
        }
    }

    fn insert_silver(conn: &Connection, record: &CleanMeasurement) {
        conn.execute(
            "INSERT INTO silver_measurements
                (location, parameter, pm25_value, unit, datetime, latitude, longitude)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.location,
                record.parameter,
                record.pm25_value,
                record.unit,
                crate::utils::format_timestamp(&record.datetime),
                record.latitude,
                record.longitude,
            ],
        )
        .unwrap();
    }

    #[test]
    fn test_summarize_single_day() {
        let records = vec![
            measurement(10.0, 1, 0),
            measurement(20.0, 1, 6),
            measurement(30.0, 1, 12),
        ];

        assert_eq!(
            Aggregator::summarize(&records),
            vec![summary(1, 20.0, 30.0, 10.0, 3)]
        );
    }

    #[test]
    fn test_summarize_groups_by_utc_day() {
        let records = vec![
            // out of order on purpose
            measurement(5.0, 2, 23),
            measurement(10.0, 1, 23),
            measurement(20.0, 2, 0),
        ];

        let summaries = Aggregator::summarize(&records);
        assert_eq!(
            summaries,
            vec![
                summary(1, 10.0, 10.0, 10.0, 1),
                summary(2, 12.5, 20.0, 5.0, 2),
            ]
        );
        assert_eq!(
            Aggregator::touched_days(&records).into_iter().collect::<Vec<_>>(),
            vec![day(1), day(2)]
        );
    }

    #[test]
    fn test_replace_is_idempotent() {
        let mut conn = store::open_in_memory().unwrap();
        let aggregator = Aggregator::new();
        let summaries = Aggregator::summarize(&[measurement(10.0, 1, 0), measurement(30.0, 1, 1)]);

        let replace = |conn: &mut Connection| {
            store::with_transaction(conn, |tx| aggregator.replace_daily_summaries(tx, &summaries))
                .unwrap()
        };

        // Same summaries twice, still one row per day
        replace(&mut conn);
        let once = Aggregator::read_summaries(&conn, None).unwrap();
        replace(&mut conn);
        let twice = Aggregator::read_summaries(&conn, None).unwrap();

        assert_eq!(once, twice);
        assert_eq!(twice, vec![summary(1, 20.0, 30.0, 10.0, 2)]);
    }

    #[test]
    fn test_refresh_recomputes_whole_day_from_silver() {
        let conn = store::open_in_memory().unwrap();
        let aggregator = Aggregator::new();

        let first_batch = vec![
            measurement(10.0, 1, 0),
            measurement(20.0, 1, 1),
            measurement(30.0, 1, 2),
        ];
        for r in &first_batch {
            insert_silver(&conn, r);
        }
        aggregator.refresh(&conn, &first_batch).unwrap();
        assert_eq!(
            Aggregator::read_summaries(&conn, None).unwrap(),
            vec![summary(1, 20.0, 30.0, 10.0, 3)]
        );

        // A later batch only holds the new reading; the day is rebuilt from silver
        let second_batch = vec![measurement(40.0, 1, 3)];
        insert_silver(&conn, &second_batch[0]);
        aggregator.refresh(&conn, &second_batch).unwrap();

        assert_eq!(
            Aggregator::read_summaries(&conn, None).unwrap(),
            vec![summary(1, 25.0, 40.0, 10.0, 4)]
        );
    }

    #[test]
    fn test_refresh_leaves_untouched_days_alone() {
        let conn = store::open_in_memory().unwrap();
        let aggregator = Aggregator::new();

        let day_one = vec![measurement(8.0, 1, 0)];
        insert_silver(&conn, &day_one[0]);
        aggregator.refresh(&conn, &day_one).unwrap();

        // Refreshing day two must not touch day one
        let day_two = vec![measurement(16.0, 2, 0)];
        insert_silver(&conn, &day_two[0]);
        aggregator.refresh(&conn, &day_two).unwrap();

        assert_eq!(
            Aggregator::read_summaries(&conn, None).unwrap(),
            vec![summary(1, 8.0, 8.0, 8.0, 1), summary(2, 16.0, 16.0, 16.0, 1)]
        );
        assert_eq!(
            Aggregator::read_summaries(&conn, Some(1)).unwrap(),
            vec![summary(2, 16.0, 16.0, 16.0, 1)]
        );
    }

    #[test]
    fn test_refresh_with_empty_batch_is_noop() {
        let conn = store::open_in_memory().unwrap();
        assert!(Aggregator::new().refresh(&conn, &[]).unwrap().is_empty());
        assert!(Aggregator::read_summaries(&conn, None).unwrap().is_empty());
    }
}
