use chrono::{Local, NaiveDateTime};
use std::path::{Path, PathBuf};

use crate::utils::constants::LOG_FILE_PREFIX;

/// Generate a per-run log filename with format: pm25-etl-{YYYYMMDD_HHMMSS}.log
pub fn generate_log_filename(log_dir: &Path) -> PathBuf {
    // Local time, to match what an operator sees on the host
    log_filename_at(log_dir, Local::now().naive_local())
}

fn log_filename_at(log_dir: &Path, started: NaiveDateTime) -> PathBuf {
    let filename = format!(
        "{}-{}.log",
        LOG_FILE_PREFIX,
        started.format("%Y%m%d_%H%M%S")
    );
    log_dir.join(filename)
}
