use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use tracing::level_filters::LevelFilter;

use crate::config::LoggingConfig;
use crate::error::{EtlError, Result};
use crate::utils::filename::generate_log_filename;

/// Resolve the configured level, raised to debug when `verbose` is set.
pub fn resolve_level(config: &LoggingConfig, verbose: bool) -> Result<LevelFilter> {
    if verbose {
        return Ok(LevelFilter::DEBUG);
    }
    LevelFilter::from_str(&config.level)
        .map_err(|_| EtlError::Config(format!("Unknown log level: {}", config.level)))
}

/// Pick the log destination: an explicit file wins over a log directory,
/// and with neither, events go to stderr.
pub fn resolve_log_file(config: &LoggingConfig, log_file: Option<&Path>) -> Option<PathBuf> {
    match (log_file, &config.log_dir) {
        (Some(path), _) => Some(path.to_path_buf()),
        (None, Some(dir)) => Some(generate_log_filename(dir)),
        (None, None) => None,
    }
}

/// Install the global tracing subscriber. Returns the log file path when
/// logging to a file.
pub fn init_logging(
    config: &LoggingConfig,
    verbose: bool,
    log_file: Option<&Path>,
) -> Result<Option<PathBuf>> {
    let level = resolve_level(config, verbose)?;
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    // A file sink if one was asked for, stderr otherwise
    match resolve_log_file(config, log_file) {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = File::create(&path)?;
            builder
                // no colour codes in files
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|e| EtlError::Config(format!("Failed to install logger: {}", e)))?;
            Ok(Some(path))
        }
        None => {
            builder
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| EtlError::Config(format!("Failed to install logger: {}", e)))?;
            Ok(None)
        }
    }
}
