use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::{EtlError, Result};
use crate::models::Watermark;
use crate::utils::timestamp::parse_timestamp;

pub struct WatermarkReader;

impl WatermarkReader {
    pub fn new() -> Self {
        Self
    }

    /// Latest `datetime` in the silver tier, or an empty watermark when the
    /// tier has no rows.
    pub fn read(&self, conn: &Connection) -> Result<Watermark> {
        // MAX over an empty table is a single NULL row
        let latest: Option<String> = conn
            .query_row(
                "SELECT MAX(datetime) FROM silver_measurements",
                [],
                |row| row.get(0),
            )
            .optional()?
            .flatten();

        let watermark = match latest {
            // Fixed-width text, so MAX is also the latest instant
            Some(value) => {
                let instant = parse_timestamp(&value).map_err(|e| {
                    EtlError::Load(format!("Corrupt datetime in silver tier: {}", e))
                })?;
                Watermark::at(instant)
            }
            None => Watermark::empty(),
        };

        if watermark.is_empty() {
            info!("no previous data found, full extraction will run");
        } else {
            info!(watermark = %watermark, "last datetime in silver tier");
        }

        Ok(watermark)
    }
}

impl Default for WatermarkReader {
    fn default() -> Self {
        Self::new()
    }
}
