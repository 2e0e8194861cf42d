use std::collections::HashSet;

use serde_json::Value;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::config::MalformedPolicy;
use crate::error::{EtlError, Result};
use crate::models::{CleanMeasurement, RawMeasurement};
use crate::utils::timestamp::parse_timestamp;

/// Result of cleaning one extracted batch.
#[derive(Debug, Clone, Default)]
pub struct TransformOutcome {
    pub records: Vec<CleanMeasurement>,
    /// Malformed records dropped under [`MalformedPolicy::Skip`].
    pub skipped: usize,
    /// Exact duplicates removed on (location, datetime, pm25_value).
    pub duplicates: usize,
}

impl TransformOutcome {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub struct Transformer {
    policy: MalformedPolicy,
}

impl Transformer {
    pub fn new() -> Self {
        Self {
            policy: MalformedPolicy::Abort,
        }
    }

    pub fn with_policy(policy: MalformedPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> MalformedPolicy {
        self.policy
    }

    /// Flatten, rename and deduplicate a raw batch.
    pub fn transform(&self, raw: &[RawMeasurement]) -> Result<TransformOutcome> {
        if raw.is_empty() {
            return Ok(TransformOutcome::default());
        }

        let mut cleaned = Vec::with_capacity(raw.len());
        let mut skipped = 0;

        // Clean each record, applying the malformed policy
        for (index, record) in raw.iter().enumerate() {
            match Self::clean_record(index, record) {
                Ok(clean) => cleaned.push(clean),
                Err(e) => match self.policy {
                    MalformedPolicy::Abort => return Err(e),
                    MalformedPolicy::Skip => {
                        warn!(error = %e, "skipping malformed record");
                        skipped += 1;
                    }
                },
            }
        }

        // Then dedup the batch, keeping first occurrences
        let (records, duplicates) = Self::deduplicate(cleaned);
        info!(
            clean = records.len(),
            skipped, duplicates, "data transformation and deduplication complete"
        );

        Ok(TransformOutcome {
            records,
            skipped,
            duplicates,
        })
    }

    /// Project one raw record onto the clean schema. A missing field and a
    /// field of the wrong JSON type are both malformed.
    pub fn clean_record(index: usize, raw: &RawMeasurement) -> Result<CleanMeasurement> {
        let malformed = |message: String| EtlError::MalformedRecord { index, message };

        if !raw.payload().is_object() {
            return Err(malformed(format!(
                "record must be a JSON object, got {}",
                raw.payload()
            )));
        }
        // nested parents first, so "coordinates": "x" is reported as such
        for parent in ["coordinates", "date"] {
            if let Some(value) = raw.field(parent).filter(|v| !v.is_object()) {
                return Err(malformed(format!("{} must be an object, got {}", parent, value)));
            }
        }

        let location = text_field(raw, "location").map_err(malformed)?;
        let parameter = text_field(raw, "parameter").map_err(malformed)?;
        let unit = text_field(raw, "unit").map_err(malformed)?;
        let pm25_value = number_field(raw, "value").map_err(malformed)?;

        // Timestamps must carry an offset; they are normalised to UTC
        let utc = text_field(raw, "date.utc").map_err(malformed)?;
        let datetime = parse_timestamp(&utc).map_err(|e| malformed(e.to_string()))?;

        let latitude = number_field(raw, "coordinates.latitude").map_err(malformed)?;
        let longitude = number_field(raw, "coordinates.longitude").map_err(malformed)?;

        // Field checks: non-empty location and coordinates on the globe
        let clean = CleanMeasurement::new(
            location, parameter, pm25_value, unit, datetime, latitude, longitude,
        );
        clean
            .validate()
            .map_err(|e| malformed(format!("validation failed: {}", e)))?;

        Ok(clean)
    }

    /// Keep the first record of each (location, datetime, pm25_value) key,
    /// preserving input order. Returns the survivors and how many were
    /// dropped.
    pub fn deduplicate(records: Vec<CleanMeasurement>) -> (Vec<CleanMeasurement>, usize) {
        let before = records.len();
        let mut seen = HashSet::with_capacity(before);
        // insert() is false for a key already seen
        let unique: Vec<CleanMeasurement> = records
            .into_iter()
            .filter(|r| seen.insert(r.key()))
            .collect();

        let dropped = before - unique.len();
        if dropped > 0 {
            debug!(dropped, "removed duplicate measurements from batch");
        }
        (unique, dropped)
    }
}

fn text_field(raw: &RawMeasurement, path: &str) -> std::result::Result<String, String> {
    match raw.field(path) {
        None => Err(format!("missing {}", path)),
        Some(Value::String(text)) => Ok(text.clone()),
        Some(other) => Err(format!("{} must be a string, got {}", path, other)),
    }
}

fn number_field(raw: &RawMeasurement, path: &str) -> std::result::Result<f64, String> {
    match raw.field(path) {
        None => Err(format!("missing {}", path)),
        Some(value) => value
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("{} must be a number, got {}", path, value)),
    }
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new()
    }
}
