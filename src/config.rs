use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::error::{EtlError, Result};
use crate::utils::constants::*;

/// Everything a run needs, read once at startup and passed by reference to
/// each stage.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EtlConfig {
    #[validate(nested)]
    pub api: ApiConfig,

    #[validate(nested)]
    pub store: StoreConfig,

    #[serde(default)]
    pub transform: TransformConfig,

    #[validate(nested)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ApiConfig {
    #[validate(custom(function = "validate_base_url"))]
    pub base_url: String,

    #[validate(length(min = 1, message = "API key is missing (set OPENAQ_API_KEY)"))]
    pub api_key: String,

    #[validate(length(min = 1))]
    pub city: String,

    #[validate(length(min = 1))]
    pub parameter: String,

    #[validate(range(min = 1, max = 1000))]
    pub page_size: u32,

    #[validate(range(min = 1))]
    pub max_pages: u32,

    #[validate(range(min = 1, max = 600))]
    pub timeout_secs: u64,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn measurements_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            MEASUREMENTS_ENDPOINT
        )
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StoreConfig {
    #[validate(custom(function = "validate_database_path"))]
    pub database_path: PathBuf,

    pub busy_timeout_ms: u64,
}

impl StoreConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// What the transformer does with a record it cannot clean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Fail the whole batch.
    #[default]
    Abort,
    /// Log and drop the record.
    Skip,
}

impl MalformedPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MalformedPolicy::Abort => POLICY_ABORT,
            MalformedPolicy::Skip => POLICY_SKIP,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransformConfig {
    #[serde(default)]
    pub on_malformed: MalformedPolicy,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoggingConfig {
    #[validate(length(min = 1))]
    pub level: String,

    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            log_dir: None,
        }
    }
}

fn validate_base_url(url: &str) -> std::result::Result<(), ValidationError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ValidationError::new("base_url_scheme"))
    }
}

fn validate_database_path(path: &PathBuf) -> std::result::Result<(), ValidationError> {
    if path.as_os_str().is_empty() {
        Err(ValidationError::new("database_path_empty"))
    } else {
        Ok(())
    }
}

/// Load configuration from defaults, an optional TOML file and
/// `PM25_ETL_*` environment variables, in increasing priority.
pub fn load_config(path: Option<&Path>) -> Result<EtlConfig> {
    load_config_with_env(path, None)
}

/// As [`load_config`], reading environment variables from `env_vars`
/// instead of the process environment when given.
pub fn load_config_with_env(
    path: Option<&Path>,
    env_vars: Option<HashMap<String, String>>,
) -> Result<EtlConfig> {
    // The API key is read from its own variable, not the prefixed ones
    let api_key = match &env_vars {
        Some(vars) => vars.get(API_KEY_ENV_VAR).cloned(),
        None => env::var(API_KEY_ENV_VAR).ok(),
    }
    .unwrap_or_default();

    let mut builder = Config::builder()
        .set_default("api.base_url", DEFAULT_API_BASE_URL)?
        .set_default("api.api_key", api_key)?
        .set_default("api.city", DEFAULT_CITY)?
        .set_default("api.parameter", DEFAULT_PARAMETER)?
        .set_default("api.page_size", DEFAULT_PAGE_SIZE as i64)?
        .set_default("api.max_pages", DEFAULT_MAX_PAGES as i64)?
        .set_default("api.timeout_secs", DEFAULT_TIMEOUT_SECS as i64)?
        .set_default("store.database_path", DEFAULT_DATABASE_PATH)?
        .set_default("store.busy_timeout_ms", DEFAULT_BUSY_TIMEOUT_MS as i64)?
        .set_default("transform.on_malformed", POLICY_ABORT)?
        .set_default("logging.level", DEFAULT_LOG_LEVEL)?;

    // An explicit path must exist; the default file is optional
    builder = match path {
        Some(path) => builder.add_source(File::from(path).required(true)),
        None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
    };

    // PM25_ETL_API__PAGE_SIZE -> api.page_size
    let environment = Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
        .source(env_vars);

    let config: EtlConfig = builder
        .add_source(environment)
        .build()?
        .try_deserialize()?;

    // Reject bad values before anything touches the network or the store
    config
        .validate()
        .map_err(|e| EtlError::Config(e.to_string()))?;

    Ok(config)
}
