use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One gold-tier row: PM2.5 statistics for a UTC calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub pm25_avg: f64,
    pub pm25_max: f64,
    pub pm25_min: f64,
    pub count: u32,
}

impl fmt::Display for DailySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: avg={:.2}, min={:.2}, max={:.2} ({} readings)",
            self.date, self.pm25_avg, self.pm25_min, self.pm25_max, self.count
        )
    }
}

/// Running min/max/sum/count for one day.
#[derive(Debug, Clone, Copy)]
pub struct DailyAccumulator {
    sum: f64,
    min: f64,
    max: f64,
    count: u32,
}

impl Default for DailyAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl DailyAccumulator {
    pub fn new() -> Self {
        Self {
            sum: 0.0,
            // any pushed value replaces these
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            count: 0,
        }
    }

    pub fn push(&mut self, value: f64) {
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.count += 1;
    }

    /// `None` when no values were pushed.
    pub fn finish(&self, date: NaiveDate) -> Option<DailySummary> {
        if self.count == 0 {
            return None;
        }
        Some(DailySummary {
            date,
            pm25_avg: self.sum / self.count as f64,
            pm25_max: self.max,
            pm25_min: self.min,
            count: self.count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut acc = DailyAccumulator::new();
        for v in [10.0, 20.0, 30.0] {
            acc.push(v);
        }

        // Verify each statistic
        let summary = acc.finish(day).unwrap();
        assert_eq!(summary.pm25_avg, 20.0);
        assert_eq!(summary.pm25_min, 10.0);
        assert_eq!(summary.pm25_max, 30.0);
        assert_eq!(summary.count, 3);
    }

    #[test]
    fn test_empty_accumulator_has_no_summary() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(DailyAccumulator::new().finish(day).is_none());
    }

    #[test]
    fn test_display() {
        let summary = DailySummary {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            pm25_avg: 25.0,
            pm25_max: 40.0,
            pm25_min: 10.0,
            count: 4,
        };
        assert_eq!(
            summary.to_string(),
            "2024-01-01: avg=25.00, min=10.00, max=40.00 (4 readings)"
        );
    }
}
