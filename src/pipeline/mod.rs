//! Linear run: watermark → extract → transform → load → aggregate.
//!
//! Loading and aggregation share one transaction, so a failure at any
//! point leaves bronze, silver and gold as they were and the watermark
//! unchanged; the next scheduled run redoes the work.

pub mod report;

pub use report::RunReport;

use std::time::Instant;

use rusqlite::Connection;
use tracing::{debug, error, info, warn};

use crate::config::{EtlConfig, MalformedPolicy};
use crate::error::Result;
use crate::processors::{Aggregator, Transformer};
use crate::readers::{ApiExtractor, MeasurementSource, WatermarkReader};
use crate::store;
use crate::utils::progress::ProgressReporter;
use crate::writers::TieredLoader;

pub struct EtlPipeline<S: MeasurementSource> {
    source: S,
    watermark_reader: WatermarkReader,
    transformer: Transformer,
    loader: TieredLoader,
    aggregator: Aggregator,
}

impl EtlPipeline<ApiExtractor> {
    /// Pipeline reading from the configured HTTP API.
    pub fn from_config(config: &EtlConfig) -> Result<Self> {
        let extractor = ApiExtractor::new(&config.api)?;
        Ok(Self::new(extractor).with_malformed_policy(config.transform.on_malformed))
    }
}

impl<S: MeasurementSource> EtlPipeline<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            watermark_reader: WatermarkReader::new(),
            transformer: Transformer::new(),
            loader: TieredLoader::new(),
            aggregator: Aggregator::new(),
        }
    }

    pub fn with_malformed_policy(mut self, policy: MalformedPolicy) -> Self {
        self.transformer = Transformer::with_policy(policy);
        self
    }

    /// Execute one incremental run. Start and finish markers are logged
    /// whether the run succeeds or fails.
    pub fn run(
        &self,
        conn: &mut Connection,
        progress: Option<&ProgressReporter>,
    ) -> Result<RunReport> {
        logged_run(|| self.run_stages(conn, progress))
    }

    /// The run's stages without the start and finish markers, for callers
    /// that wrap more setup in [`logged_run`].
    pub fn run_stages(
        &self,
        conn: &mut Connection,
        progress: Option<&ProgressReporter>,
    ) -> Result<RunReport> {
        let started = Instant::now();
        debug!(policy = self.transformer.policy().as_str(), "malformed record policy");

        let set_stage = |message: &str| {
            if let Some(p) = progress {
                p.set_message(message);
            }
        };

        set_stage("Reading watermark...");
        let watermark = self.watermark_reader.read(conn)?;
        let mut report = RunReport::new(watermark);

        // Extract everything at or after the watermark
        set_stage("Extracting measurements...");
        let raw = self.source.fetch(&watermark)?;
        report.extracted = raw.len();

        if raw.is_empty() {
            info!("no new data to transform or load");
            report.elapsed = started.elapsed();
            return Ok(report);
        }

        // Clean and deduplicate
        set_stage("Transforming measurements...");
        let outcome = self.transformer.transform(&raw)?;
        report.clean = outcome.records.len();
        report.skipped = outcome.skipped;
        report.batch_duplicates = outcome.duplicates;

        // Only possible under the skip policy
        if outcome.is_empty() {
            warn!(
                skipped = outcome.skipped,
                "every extracted record was malformed, nothing loaded"
            );
            report.elapsed = started.elapsed();
            return Ok(report);
        }

        // Load and aggregate in one transaction: all tiers or none
        set_stage("Loading bronze, silver and gold tiers...");
        let (load, days) = store::with_transaction(conn, |tx| {
            let load = self.loader.load(tx, &raw, &outcome.records)?;
            let days = self.aggregator.refresh(tx, &outcome.records)?;
            Ok((load, days))
        })?;

        // Fill in the report
        report.load = load;
        report.days = days;
        report.latest_datetime = outcome.records.iter().map(|r| r.datetime).max();
        report.elapsed = started.elapsed();

        if let Some(p) = progress {
            p.finish_with_message(&format!(
                "Loaded {} records into {} day(s)",
                report.clean,
                report.days.len()
            ));
        }

        Ok(report)
    }
}

/// Log a start marker, run `body`, log its outcome and always log a
/// finish marker. Everything that can fail during a run belongs inside
/// `body`, store setup included.
pub fn logged_run<F>(body: F) -> Result<RunReport>
where
    F: FnOnce() -> Result<RunReport>,
{
    info!("==== incremental ETL process started ====");

    let result = body();

    match &result {
        Ok(report) => info!(
            extracted = report.extracted,
            clean = report.clean,
            days = report.days.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "ETL run succeeded"
        ),
        Err(e) => error!(kind = %e.kind(), error = %e, "ETL process failed"),
    }
    info!("==== incremental ETL process finished ====");

    result
}
