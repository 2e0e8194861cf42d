use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::models::{DailySummary, Watermark};
use crate::writers::LoadReport;

/// What a single run did, tier by tier.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub watermark: Watermark,
    pub extracted: usize,
    pub clean: usize,
    pub skipped: usize,
    pub batch_duplicates: usize,
    pub load: LoadReport,
    pub days: Vec<DailySummary>,
    /// Latest measurement time written to silver by this run.
    pub latest_datetime: Option<DateTime<Utc>>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn new(watermark: Watermark) -> Self {
        Self {
            watermark,
            ..Default::default()
        }
    }

    /// True when nothing was written to any tier.
    pub fn is_noop(&self) -> bool {
        self.load.bronze_rows == 0 && self.load.silver_rows == 0 && self.days.is_empty()
    }

    pub fn summary(&self) -> String {
        let mut lines = vec![
            "ETL Run Summary:".to_string(),
            format!("  Watermark: {}", self.watermark),
            format!("  Extracted records: {}", self.extracted),
            format!(
                "  Clean records: {} ({} malformed skipped, {} duplicates dropped)",
                self.clean, self.skipped, self.batch_duplicates
            ),
            format!("  Bronze rows appended: {}", self.load.bronze_rows),
            format!(
                "  Silver rows appended: {} ({} duplicates removed)",
                self.load.silver_rows, self.load.silver_duplicates_removed
            ),
            format!("  Gold days refreshed: {}", self.days.len()),
        ];

        for day in &self.days {
            lines.push(format!("    {}", day));
        }

        if let Some(latest) = self.latest_datetime {
            lines.push(format!(
                "  Latest datetime loaded: {}",
                latest.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }
        lines.push(format!("  Elapsed: {:.2}s", self.elapsed.as_secs_f64()));

        lines.join("\n")
    }
}
